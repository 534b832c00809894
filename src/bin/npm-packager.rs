//! npm-packager CLI
//!
//! Publishes packages defined in the graph data store to npm

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use npm_packager::{
    Capabilities, CommandManifestExporter, ConfigLoadOptions, ConfigLoader, HasuraGraphStore,
    PackageLocation, PackagePublisher, PackagerConfig, PublishError, SafeCommandExecutor,
    SemverCrateComparer, TokioFileSystem, TriggerContext, UuidGenerator, VersionNegotiator,
};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

/// Publishes graph-defined packages to npm
#[derive(Parser)]
#[command(name = "npm-packager")]
#[command(version)]
#[command(about = "Publishes graph-defined packages to npm", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish the package referenced by a trigger
    Publish {
        /// Trigger JSON file, `-` for stdin
        #[arg(short, long, default_value = "-")]
        trigger: String,

        /// Explicit configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Project directory holding .npm-packager.yaml (defaults to current directory)
        #[arg(short, long)]
        project: Option<PathBuf>,
    },

    /// Print the version that would be published
    Negotiate {
        /// Version declared in the data store
        local: String,

        /// Version currently on the registry
        registry: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Publish {
            trigger,
            config,
            project,
        } => {
            let project = project.unwrap_or_else(|| PathBuf::from("."));
            publish_command(&trigger, config, project).await
        }
        Commands::Negotiate { local, registry } => negotiate_command(&local, registry.as_deref()),
    }
}

async fn read_trigger(source: &str) -> Result<TriggerContext> {
    let content = if source == "-" {
        let mut buffer = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buffer)
            .await
            .context("failed to read trigger from stdin")?;
        buffer
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("failed to read trigger file {}", source))?
    };

    serde_json::from_str(&content).context("invalid trigger JSON")
}

fn build_capabilities(config: &PackagerConfig, project: &Path) -> Result<Capabilities> {
    let exporter_command = config
        .exporter
        .command
        .clone()
        .ok_or_else(|| anyhow!("exporter.command is not configured"))?;

    let mut executor = SafeCommandExecutor::new();
    executor.allow(exporter_command.clone());
    if let Some(timeout) = config.command_timeout() {
        executor.set_timeout(timeout);
    }
    let runner = Arc::new(executor);

    let exporter = CommandManifestExporter::new(
        runner.clone(),
        &exporter_command,
        config.exporter.args.clone().unwrap_or_default(),
    )
    .with_cwd(project.to_path_buf());

    Ok(Capabilities {
        fs: Arc::new(TokioFileSystem),
        runner,
        ids: Arc::new(UuidGenerator),
        semver: Arc::new(SemverCrateComparer),
        exporter: Arc::new(exporter),
        graph: Arc::new(HasuraGraphStore::new(&config.graph)?),
    })
}

async fn publish_command(trigger: &str, config: Option<PathBuf>, project: PathBuf) -> Result<i32> {
    println!("\n📦 npm-packager\n");

    let config = ConfigLoader::load(ConfigLoadOptions {
        project_path: project.clone(),
        explicit_path: config,
        env: std::env::vars().collect(),
    })
    .await?;

    let validation = ConfigLoader::validate(&config);
    if !validation.errors.is_empty() || !validation.warnings.is_empty() {
        println!("{}\n", ConfigLoader::format_validation_result(&validation));
    }
    if !validation.valid {
        eprintln!("❌ Invalid configuration");
        return Ok(1);
    }

    let trigger = read_trigger(trigger).await?;
    let publisher = PackagePublisher::new(build_capabilities(&config, &project)?, config);

    println!(
        "🔍 Package {} (publish link {}), workspace root {}",
        trigger.package_id(),
        trigger.new_link.to_id,
        publisher.temp_root().display()
    );

    match publisher.publish(&trigger).await {
        Ok(report) => {
            let location = match report.location {
                PackageLocation::Existing => "existing package",
                PackageLocation::New => "new package",
            };
            println!(
                "\n✅ Published {}@{} ({})",
                report.package_name, report.version, location
            );
            if let Some(previous) = &report.registry_version {
                println!("  Registry version was {}", previous);
            }
            for dependency in &report.dependencies {
                println!("  - {}", dependency);
            }
            println!("  Duration: {}ms", report.duration);
            Ok(0)
        }
        Err(e) => {
            print_failure(&e);
            Ok(1)
        }
    }
}

fn print_failure(error: &PublishError) {
    eprintln!("\n❌ Publishing failed [{}]: {}", error.code(), error);

    let actions = error.suggested_actions();
    if !actions.is_empty() {
        eprintln!("\n💡 Suggested actions:");
        for action in actions {
            eprintln!("  - {}", action);
        }
    }
}

fn negotiate_command(local: &str, registry: Option<&str>) -> Result<i32> {
    let comparer = SemverCrateComparer;
    let version = VersionNegotiator::new(&comparer).negotiate(local, registry)?;
    println!("{}", version);
    Ok(0)
}
