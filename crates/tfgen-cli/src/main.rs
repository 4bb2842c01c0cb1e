use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use tfgen_core::config::{self, CONFIG_FILE_NAME};
use tfgen_core::{ErrorPolicy, Report, load_config, load_document};

#[derive(Parser)]
#[command(
    name = "tfgen",
    about = "Terraform Framework IR generator for OpenAPI 3.x specs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the provider IR from an OpenAPI spec
    Generate {
        /// Path to the OpenAPI spec file (YAML or JSON)
        input: PathBuf,

        /// Path to the generator configuration
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        config: PathBuf,

        /// Write the IR to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report every failing entity instead of stopping at the first
        #[arg(long)]
        collect_errors: bool,
    },

    /// Run the pipeline without writing anything
    Validate {
        /// Path to the OpenAPI spec file
        input: PathBuf,

        /// Path to the generator configuration
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        config: PathBuf,
    },

    /// Initialize a new tfgen configuration
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            input,
            config,
            output,
            collect_errors,
        } => {
            let policy = if collect_errors {
                ErrorPolicy::CollectAll
            } else {
                ErrorPolicy::FailFast
            };
            cmd_generate(&input, &config, output.as_deref(), policy)
        }

        Commands::Validate { input, config } => cmd_validate(&input, &config),

        Commands::Init { force } => cmd_init(Path::new(CONFIG_FILE_NAME), force),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "tfgen", &mut io::stdout());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Load both inputs and run every configured entity.
fn run_pipeline(input: &Path, config_path: &Path) -> Result<Report> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let doc = load_document(input, &content)
        .with_context(|| format!("failed to parse {}", input.display()))?;
    let config = load_config(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    log::debug!(
        "loaded {} with {} paths",
        input.display(),
        doc.spec().paths.len()
    );

    let report = tfgen_core::generate(&doc, &config);
    for warning in &report.warnings {
        eprintln!("{warning}");
    }
    Ok(report)
}

fn cmd_generate(
    input: &Path,
    config_path: &Path,
    output: Option<&Path>,
    policy: ErrorPolicy,
) -> Result<()> {
    let report = run_pipeline(input, config_path)?;
    let specification = report.finish(policy)?;
    let json = tfgen_core::to_json(&specification).context("failed to serialize IR")?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "Wrote {} resources and {} data sources to {}",
                specification.resources.len(),
                specification.data_sources.len(),
                path.display()
            );
        }
        None => print!("{json}"),
    }

    Ok(())
}

fn cmd_validate(input: &Path, config_path: &Path) -> Result<()> {
    let report = run_pipeline(input, config_path)?;
    let warnings = report.warnings.len();
    let specification = report.finish(ErrorPolicy::CollectAll)?;

    eprintln!("Config is valid:");
    eprintln!(
        "  Provider: {}{}",
        specification.provider.name,
        if specification.provider.schema.is_some() {
            " (with schema)"
        } else {
            ""
        }
    );
    eprintln!("  Resources: {}", specification.resources.len());
    eprintln!("  Data sources: {}", specification.data_sources.len());
    eprintln!("  Warnings: {warnings}");

    Ok(())
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        );
    }

    fs::write(path, config::default_config_content())
        .with_context(|| format!("failed to write {}", path.display()))?;
    eprintln!("Created {}", path.display());
    Ok(())
}
