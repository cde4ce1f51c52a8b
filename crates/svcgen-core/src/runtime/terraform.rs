//! Terraform detection and initialisation
//!
//! Projects created with `runTerraform` get a `terraform/` directory that is
//! initialised once the scaffold is written.

use anyhow::{Context, Result};
use colored::Colorize;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tracing::{debug, info};

/// Timeout for `terraform init` (provider downloads included)
const INIT_TIMEOUT: Duration = Duration::from_secs(120);

pub const DOCS_URL: &str = "https://developer.hashicorp.com/terraform/install";

fn version_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"v[0-9]\.[0-9]+\.[0-9]+").ok())
        .as_ref()
}

/// First `vX.Y.Z` in the output of `terraform version`
pub fn parse_version_output(output: &str) -> Option<String> {
    version_pattern()?
        .find(output)
        .map(|m| m.as_str().to_string())
}

/// Handle on the terraform binary
#[derive(Debug, Clone)]
pub struct Terraform {
    binary: String,
    init_timeout: Duration,
}

impl Default for Terraform {
    fn default() -> Self {
        Self {
            binary: "terraform".to_string(),
            init_timeout: INIT_TIMEOUT,
        }
    }
}

impl Terraform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different binary name or path
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_init_timeout(mut self, init_timeout: Duration) -> Self {
        self.init_timeout = init_timeout;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Check if terraform is installed and available in PATH
    pub fn is_installed(&self) -> bool {
        std::process::Command::new("which")
            .arg(&self.binary)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Installed version, e.g. "v1.7.5"
    pub fn version(&self) -> Option<String> {
        std::process::Command::new(&self.binary)
            .arg("version")
            .output()
            .ok()
            .filter(|output| output.status.success())
            .and_then(|output| String::from_utf8(output.stdout).ok())
            .and_then(|stdout| parse_version_output(&stdout))
    }

    /// Run `terraform init` in `dir`, streaming its output
    pub async fn init(&self, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            anyhow::bail!("Terraform directory not found: {}", dir.display());
        }

        info!(dir = %dir.display(), binary = %self.binary, "running terraform init");
        println!();
        println!(
            "{} {} init {}",
            "Running:".dimmed(),
            self.binary.yellow(),
            format!("(in {})", dir.display()).dimmed()
        );
        println!();

        let mut child = TokioCommand::new(&self.binary)
            .arg("init")
            .arg("-input=false")
            .current_dir(dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.binary))?;

        let stdout = child
            .stdout
            .take()
            .context("Failed to capture terraform stdout")?;
        let stderr = child
            .stderr
            .take()
            .context("Failed to capture terraform stderr")?;

        let mut stdout_reader = BufReader::new(stdout).lines();
        let mut stderr_reader = BufReader::new(stderr).lines();
        let mut stderr_open = true;

        let output_task = async {
            loop {
                tokio::select! {
                    line = stdout_reader.next_line() => {
                        match line {
                            Ok(Some(line)) => println!("  {}", line),
                            Ok(None) => break,
                            Err(e) => {
                                debug!(error = %e, "stopped reading terraform stdout");
                                break;
                            }
                        }
                    }
                    line = stderr_reader.next_line(), if stderr_open => {
                        match line {
                            Ok(Some(line)) => eprintln!("  {}", line.yellow()),
                            Ok(None) => stderr_open = false,
                            Err(e) => {
                                debug!(error = %e, "stopped reading terraform stderr");
                                stderr_open = false;
                            }
                        }
                    }
                }
            }
        };

        if timeout(self.init_timeout, output_task).await.is_err() {
            let _ = child.kill().await;
            anyhow::bail!(
                "terraform init timed out after {} seconds.\n\
                 Run it manually: cd {} && {} init",
                self.init_timeout.as_secs(),
                dir.display(),
                self.binary
            );
        }

        match timeout(Duration::from_secs(5), child.wait()).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => anyhow::bail!(
                "terraform init failed with exit code: {}",
                status.code().unwrap_or(-1)
            ),
            Ok(Err(e)) => anyhow::bail!("Failed to wait for terraform: {}", e),
            Err(_) => {
                let _ = child.kill().await;
                anyhow::bail!("terraform init hung after closing its output");
            }
        }
    }
}
