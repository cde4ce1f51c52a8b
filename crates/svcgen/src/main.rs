//! svcgen CLI - generate new service repositories from templates

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use svcgen_core::config::{settings::DEFAULT_TEMPLATE_DIR, EngineSettings, ProjectType};
use svcgen_core::tui::CreateArgs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter
const LOG_ENV: &str = "SVCGEN_LOG";

#[derive(Parser, Debug)]
#[command(name = "svcgen")]
#[command(about = "CLI for generating new service repositories from remote templates")]
#[command(version)]
pub struct Args {
    /// Log engine activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new service project
    Create(CliCreateArgs),
    /// Pack a local template set into a zip bundle (for development use)
    Bundle(BundleArgs),
}

#[derive(Parser, Debug)]
pub struct CliCreateArgs {
    /// Project type
    #[arg(short = 't', long = "project-type", value_enum)]
    pub project_type: Option<ProjectType>,

    /// Project name (at least 5 characters)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Project directory to create
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// The service needs a database
    #[arg(long = "require-db")]
    pub require_db: bool,

    /// Core database object name
    #[arg(long = "db-object")]
    pub db_object: Option<String>,

    /// Provision infrastructure with terraform
    #[arg(long)]
    pub terraform: bool,

    /// YAML file with pre-filled answers
    #[arg(long)]
    pub answers: Option<PathBuf>,

    /// Local directory to use for templates instead of fetching from remote (for development use)
    #[arg(long = "template-dir", conflicts_with = "template_archive")]
    pub template_dir: Option<PathBuf>,

    /// Zip bundle to use for templates instead of fetching from remote
    #[arg(long = "template-archive")]
    pub template_archive: Option<PathBuf>,

    /// Remote template set to fetch, as <host>/<org>/<repo>/<path>[@tags/<version>]
    #[arg(
        long = "template-locator",
        conflicts_with_all = ["template_dir", "template_archive"]
    )]
    pub template_locator: Option<String>,

    /// Pin the template set to the release this build was made against
    #[arg(long = "pin-version")]
    pub pin_version: bool,

    /// YAML file listing template modules and their versions
    #[arg(long = "modules-file", requires = "pin_version")]
    pub modules_file: Option<PathBuf>,

    /// Template path to leave out (repeatable)
    #[arg(long = "skip")]
    pub skip: Vec<String>,

    /// Access token for the template host
    #[arg(long, env = "GITHUB_AUTH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Create a private repository for the project
    #[arg(long = "create-repo")]
    pub create_repo: bool,

    /// Auto-confirm all prompts (non-interactive mode)
    #[arg(short, long)]
    pub yes: bool,
}

impl From<CliCreateArgs> for CreateArgs {
    fn from(args: CliCreateArgs) -> Self {
        CreateArgs {
            project_type: args.project_type,
            name: args.name,
            directory: args.directory,
            require_db: args.require_db.then_some(true),
            db_object: args.db_object,
            terraform: args.terraform.then_some(true),
            answers: args.answers,
            template_dir: args.template_dir,
            template_archive: args.template_archive,
            template_locator: args.template_locator,
            pin_version: args.pin_version,
            modules_file: args.modules_file,
            skip: args.skip,
            token: args.token,
            create_repo: args.create_repo,
            yes: args.yes,
        }
    }
}

#[derive(Parser, Debug)]
pub struct BundleArgs {
    /// Local directory containing the template set
    #[arg(long = "template-dir")]
    pub template_dir: PathBuf,

    /// Zip file to write
    #[arg(short, long)]
    pub output: PathBuf,

    /// Top-level directory inside the bundle
    #[arg(long, default_value = DEFAULT_TEMPLATE_DIR)]
    pub prefix: String,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "svcgen_core=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

async fn create(args: CreateArgs) -> Result<()> {
    let settings = EngineSettings::from_env()?;
    let result = svcgen_core::run(&settings, args).await;

    // Ensure cursor is visible on normal exit
    let _ = console::Term::stderr().show_cursor();

    result
}

#[tokio::main]
async fn main() -> Result<()> {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    // Handle Ctrl+C gracefully
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Some(Command::Create(create_args)) => create(create_args.into()).await,
        Some(Command::Bundle(bundle_args)) => {
            svcgen_core::templates::bundle::build_bundle(
                &bundle_args.template_dir,
                &bundle_args.output,
                &bundle_args.prefix,
            )
            .await?;
            Ok(())
        }
        // No subcommand provided, default to create behavior (interactive mode)
        None => create(CreateArgs::default()).await,
    }
}
