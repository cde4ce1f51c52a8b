//! Charm-style CLI prompts using cliclack

use crate::config::{keys, ConfigModel, EngineSettings, ProjectType};
use crate::hosting;
use crate::runtime::terraform::{self, Terraform};
use crate::scaffold::{RunReport, ScaffoldBuilder, ScaffoldContext};
use crate::templates::locator::TEMPLATE_MODULES_ENV;
use crate::templates::{BuildInfo, SkipList, TemplateSource};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Project names shorter than this are rejected
pub const MIN_NAME_LEN: usize = 5;

/// CLI arguments for the create command
#[derive(Debug, Clone, Default)]
pub struct CreateArgs {
    pub project_type: Option<ProjectType>,

    pub name: Option<String>,

    /// Project directory to create
    pub directory: Option<PathBuf>,

    /// Request a database; prompts when not set
    pub require_db: Option<bool>,

    /// Core database object name
    pub db_object: Option<String>,

    /// Provision infrastructure with terraform; prompts when not set
    pub terraform: Option<bool>,

    /// YAML file with pre-filled answers
    pub answers: Option<PathBuf>,

    /// Local directory to use for templates instead of fetching from remote
    pub template_dir: Option<PathBuf>,

    /// Zip bundle to use for templates instead of fetching from remote
    pub template_archive: Option<PathBuf>,

    /// Remote template set to fetch instead of the one for the project type
    pub template_locator: Option<String>,

    /// Pin the template set to the release this build was made against
    pub pin_version: bool,

    /// YAML file listing template modules and versions
    pub modules_file: Option<PathBuf>,

    /// Template paths to leave out
    pub skip: Vec<String>,

    /// Access token; falls back to GITHUB_AUTH_TOKEN
    pub token: Option<String>,

    /// Create a private repository for the project
    pub create_repo: bool,

    /// Auto-confirm all prompts (non-interactive mode)
    pub yes: bool,
}

/// Reject names shorter than [`MIN_NAME_LEN`] characters
pub fn validate_project_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if len < MIN_NAME_LEN {
        return Err(format!(
            "Project name must be at least {} characters",
            MIN_NAME_LEN
        ));
    }
    Ok(())
}

/// Run the CLI with interactive prompts
pub async fn run(settings: &EngineSettings, args: CreateArgs) -> Result<()> {
    cliclack::intro("svcgen")?;

    // Step 1: Collect answers from the answers file, flags and prompts
    let mut config = load_answers(&args)?;
    let project_type = select_project_type(&mut config, &args)?;
    let name = select_name(&mut config, &args)?;
    let project_dir = select_directory(&args, &name)?;
    config.set(keys::PROJECT_DIR, project_dir.display().to_string());
    select_database(&mut config, &args)?;
    select_terraform(&mut config, &args)?;

    // Step 2: Resolve the template set
    let ctx = build_context(settings, config, &args)?;
    let source = select_source(&ctx, &args)?;
    let token = args.token.clone().or_else(hosting::token_from_env);

    // Step 3: Optionally create the remote repository
    if args.create_repo {
        create_repository(settings, token.as_deref(), &name).await?;
    }

    // Step 4: Generate the scaffold
    let report = create_project(ctx.clone(), &source, token.as_deref()).await?;
    print_report(&report)?;

    // Step 5: Infrastructure
    if ctx.project.options().run_terraform {
        init_terraform(&project_dir).await?;
    }

    // Step 6: Show next steps
    print_next_steps(&ctx, &project_dir, project_type)?;

    Ok(())
}

fn load_answers(args: &CreateArgs) -> Result<ConfigModel> {
    let mut config = match &args.answers {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read answers file {}", path.display()))?;
            let config = ConfigModel::from_yaml(&content)
                .with_context(|| format!("Invalid answers file {}", path.display()))?;
            cliclack::log::info(format!(
                "Loaded {} answer(s) from {}",
                config.len(),
                path.display()
            ))?;
            config
        }
        None => ConfigModel::new(),
    };

    if let Some(project_type) = args.project_type {
        config.set(keys::PROJECT_TYPE, project_type.as_str());
    }
    if let Some(name) = &args.name {
        config.set(keys::PROJECT_NAME, name.as_str());
    }
    if let Some(require_db) = args.require_db {
        config.set(keys::REQUIRE_DB, require_db);
    }
    if let Some(object) = &args.db_object {
        config.set(keys::CORE_DB_OBJECT, object.as_str());
    }
    if let Some(run_terraform) = args.terraform {
        config.set(keys::RUN_TERRAFORM, run_terraform);
    }

    Ok(config)
}

fn select_project_type(config: &mut ConfigModel, args: &CreateArgs) -> Result<ProjectType> {
    if let Some(value) = config.get_string(keys::PROJECT_TYPE) {
        let project_type: ProjectType = value.parse()?;
        cliclack::log::info(format!("Project type: {}", project_type.display_name()))?;
        return Ok(project_type);
    }

    let project_type = if args.yes {
        ProjectType::GoGrpc
    } else {
        let mut select = cliclack::select("Select a project type");
        for project_type in ProjectType::ALL {
            select = select.item(
                project_type,
                project_type.display_name(),
                project_type.description(),
            );
        }
        select.interact()?
    };

    config.set(keys::PROJECT_TYPE, project_type.as_str());
    Ok(project_type)
}

fn select_name(config: &mut ConfigModel, args: &CreateArgs) -> Result<String> {
    if let Some(name) = config.get_string(keys::PROJECT_NAME) {
        validate_project_name(name).map_err(anyhow::Error::msg)?;
        return Ok(name.trim().to_string());
    }

    if args.yes {
        anyhow::bail!("A project name is required in non-interactive mode (--name)");
    }

    let name: String = cliclack::input("Project name")
        .placeholder("svc-orders")
        .validate(|input: &String| validate_project_name(input))
        .interact()?;
    let name = name.trim().to_string();

    config.set(keys::PROJECT_NAME, name.as_str());
    Ok(name)
}

fn select_directory(args: &CreateArgs, name: &str) -> Result<PathBuf> {
    let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let resolve = |p: PathBuf| {
        if p.is_absolute() {
            p
        } else {
            current_dir.join(p)
        }
    };

    // Use --directory flag if provided
    let path = if let Some(dir) = &args.directory {
        let p = resolve(dir.clone());
        cliclack::log::info(format!("Using directory: {}", p.display()))?;
        p
    } else if args.yes {
        resolve(PathBuf::from(name))
    } else {
        let input: String = cliclack::input("Project directory")
            .placeholder(name)
            .default_input(name)
            .interact()?;

        if input.is_empty() || input == "." {
            current_dir.clone()
        } else {
            resolve(PathBuf::from(&input))
        }
    };

    // Validate parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.exists() && parent != Path::new("") {
            anyhow::bail!("Parent directory does not exist: {}", parent.display());
        }
    }

    // Warn if directory exists and has files
    if path.is_dir() {
        if let Ok(entries) = std::fs::read_dir(&path) {
            let count = entries.count();
            if count > 0 {
                cliclack::log::warning(format!(
                    "Directory has {} existing items; existing files are kept",
                    count
                ))?;

                let confirm = if args.yes {
                    true
                } else {
                    cliclack::confirm("Continue anyway?")
                        .initial_value(true)
                        .interact()?
                };

                if !confirm {
                    anyhow::bail!("Setup cancelled.");
                }
            }
        }
    }

    Ok(path)
}

fn select_database(config: &mut ConfigModel, args: &CreateArgs) -> Result<()> {
    let require_db = if config.contains(keys::REQUIRE_DB) {
        config.try_bool(keys::REQUIRE_DB)?
    } else {
        let require_db = if args.yes {
            false
        } else {
            cliclack::confirm("Does the service need a database?")
                .initial_value(false)
                .interact()?
        };
        config.set(keys::REQUIRE_DB, require_db);
        require_db
    };

    if !require_db || config.get_string(keys::CORE_DB_OBJECT).is_some() {
        return Ok(());
    }
    if args.yes {
        anyhow::bail!("A core database object is required when a database is requested (--db-object)");
    }

    let object: String = cliclack::input("Core database object")
        .placeholder("order")
        .validate(|input: &String| {
            if input.trim().is_empty() {
                Err("Enter the name of the main table or model")
            } else {
                Ok(())
            }
        })
        .interact()?;
    config.set(keys::CORE_DB_OBJECT, object.trim());
    Ok(())
}

fn select_terraform(config: &mut ConfigModel, args: &CreateArgs) -> Result<()> {
    if config.contains(keys::RUN_TERRAFORM) {
        return Ok(());
    }

    let run_terraform = if args.yes {
        false
    } else {
        cliclack::confirm("Provision infrastructure with terraform?")
            .initial_value(false)
            .interact()?
    };
    config.set(keys::RUN_TERRAFORM, run_terraform);
    Ok(())
}

fn load_build_info(args: &CreateArgs) -> Result<BuildInfo> {
    if let Some(path) = &args.modules_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read modules file {}", path.display()))?;
        return Ok(BuildInfo::from_yaml(&content)?);
    }

    Ok(match std::env::var(TEMPLATE_MODULES_ENV) {
        Ok(spec) => BuildInfo::parse(&spec),
        Err(_) => BuildInfo::embedded(),
    })
}

fn build_context(
    settings: &EngineSettings,
    config: ConfigModel,
    args: &CreateArgs,
) -> Result<ScaffoldContext> {
    let mut ctx = ScaffoldContext::from_config(settings.clone(), config)?
        .with_skip_list(args.skip.iter().collect::<SkipList>());

    if args.pin_version {
        ctx = ctx.with_pinned_version(load_build_info(args)?);
    }
    if let Some(location) = &args.template_locator {
        ctx = ctx.with_locator(location)?;
    }
    if !ctx.skip.is_empty() {
        cliclack::log::info(format!("Skipping {} template path(s)", ctx.skip.len()))?;
    }

    Ok(ctx)
}

fn select_source(ctx: &ScaffoldContext, args: &CreateArgs) -> Result<TemplateSource> {
    let source = match (&args.template_dir, &args.template_archive) {
        (Some(_), Some(_)) => {
            anyhow::bail!("Use either --template-dir or --template-archive, not both")
        }
        (Some(path), None) => {
            cliclack::log::info(format!("Using local templates from {}", path.display()))?;
            TemplateSource::Local(path.clone())
        }
        (None, Some(path)) => {
            cliclack::log::info(format!("Using template bundle {}", path.display()))?;
            TemplateSource::Archive {
                path: path.clone(),
                prefix: ctx.settings.template_dir.clone(),
            }
        }
        (None, None) => {
            let locator = ctx.locator();
            cliclack::log::info(format!("Using remote templates from {}", locator))?;
            TemplateSource::Remote(locator)
        }
    };

    Ok(source)
}

fn require_token(token: Option<&str>) -> Result<&str> {
    token.ok_or_else(|| {
        anyhow::anyhow!(
            "An access token is required; pass --token or set {}",
            hosting::TOKEN_ENV
        )
    })
}

async fn create_repository(settings: &EngineSettings, token: Option<&str>, name: &str) -> Result<()> {
    let token = require_token(token)?;

    let spinner = cliclack::spinner();
    spinner.start(format!("Creating repository {}...", name));
    match hosting::create_repository(settings, token, name).await {
        Ok(repo) => {
            spinner.stop(format!("Created repository {}", repo.html_url));
            Ok(())
        }
        Err(e) => {
            spinner.stop("Repository creation failed");
            Err(e)
        }
    }
}

async fn create_project(
    ctx: ScaffoldContext,
    source: &TemplateSource,
    token: Option<&str>,
) -> Result<RunReport> {
    let settings = ctx.settings.clone();
    let mut builder = ScaffoldBuilder::new(ctx);

    let spinner = cliclack::spinner();
    spinner.start("Creating project structure...");
    if let Err(e) = builder.build_structure().await {
        spinner.stop("Failed to create project structure");
        return Err(e.into());
    }

    spinner.stop("Project structure created");

    let spinner = cliclack::spinner();
    spinner.start("Rendering templates...");
    let result = match source {
        TemplateSource::Remote(_) => match require_token(token) {
            Ok(token) => builder.build_files(token).await,
            Err(e) => {
                spinner.stop("Missing access token");
                return Err(e);
            }
        },
        local => match local.open(&settings, token.unwrap_or_default()).await {
            Ok(fs) => builder.build_files_from(fs.as_ref()).await,
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(report) => {
            let written = report.written().count();
            spinner.stop(format!(
                "Created {} files in {}",
                written,
                builder.target().display()
            ));
            Ok(report)
        }
        Err(e) => {
            spinner.stop("Failed to render templates");
            Err(e.into())
        }
    }
}

fn print_report(report: &RunReport) -> Result<()> {
    let summary = report.summary();
    if summary.skipped > 0 || report.has_failures() {
        println!();
        println!("{}", report.render_summary());
        println!();
    }
    if report.has_failures() {
        cliclack::log::warning(format!(
            "{} template(s) could not be generated; see above",
            summary.failed
        ))?;
    }
    Ok(())
}

async fn init_terraform(project_dir: &Path) -> Result<()> {
    let tool = Terraform::new();

    if !tool.is_installed() {
        cliclack::log::warning(format!(
            "terraform is not installed; skipping init. See {}",
            terraform::DOCS_URL
        ))?;
        return Ok(());
    }

    let version = tool.version().unwrap_or_else(|| "unknown".to_string());
    cliclack::log::success(format!("terraform installed ({})", version))?;

    match tool.init(&project_dir.join("terraform")).await {
        Ok(()) => cliclack::log::success("terraform initialised")?,
        Err(e) => cliclack::log::error(format!("{}", e))?,
    }
    Ok(())
}

fn print_next_steps(
    ctx: &ScaffoldContext,
    project_dir: &Path,
    project_type: ProjectType,
) -> Result<()> {
    let steps = ctx.project.next_steps(project_dir);

    println!();
    println!("  Next steps ({})", project_type.display_name());
    println!();

    for (i, step) in steps.iter().enumerate() {
        println!("  {}.  {}", i + 1, step);
    }

    cliclack::outro("Happy coding!")?;

    Ok(())
}
