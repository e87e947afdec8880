use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use faceid_core::{EuclideanMatcher, FsIdentityStore, OnnxExtractor, Registry};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod config;
mod output;

use config::Config;

#[derive(Parser)]
#[command(name = "faceid", about = "Face recognition tool — register, identify and compare faces")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new face with a name
    Register {
        /// Identity name (e.g., "John Doe")
        name: String,
        /// Image containing the face
        image: PathBuf,
    },
    /// Identify the face in an image
    Identify {
        image: PathBuf,
    },
    /// Compare the faces in two images
    Compare {
        image1: PathBuf,
        image2: PathBuf,
    },
    /// List all registered faces
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();
    let legend = output::threshold_legend(&config.as_ref().map(|c| c.thresholds).unwrap_or_default());

    let mut cmd = Cli::command().after_help(legend);
    let matches = match cmd.try_get_matches_from_mut(std::env::args_os()) {
        Ok(matches) => matches,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };
    let command = match Cli::from_arg_matches(&matches) {
        Ok(Cli { command: Some(command) }) => command,
        Ok(Cli { command: None }) => {
            let _ = cmd.print_help();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let op = command.label();
    match run(command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{op} failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

impl Commands {
    fn label(&self) -> &'static str {
        match self {
            Commands::Register { .. } => "Registration",
            Commands::Identify { .. } => "Identification",
            Commands::Compare { .. } => "Comparison",
            Commands::List => "List",
        }
    }

    fn needs_models(&self) -> bool {
        !matches!(self, Commands::List)
    }
}

async fn run(command: Commands, config: Config) -> Result<()> {
    tracing::debug!(
        people_dir = %config.people_dir.display(),
        model_dir = %config.model_dir.display(),
        accept = config.thresholds.accept,
        strong = config.thresholds.strong,
        "configuration loaded"
    );

    let registry = Registry::new(
        FsIdentityStore::new(&config.people_dir),
        EuclideanMatcher::new(config.thresholds),
        OnnxExtractor::loader(config.model_dir.clone()),
    );

    // Nothing can be extracted without the models; fail before touching inputs.
    if command.needs_models() {
        println!("Loading face models...");
        registry.ensure_ready().await.context("cannot start without face models")?;
        println!("Models loaded successfully");
    }

    match command {
        Commands::Register { name, image } => {
            println!("Registering face for {name} from {}...", image.display());
            let stored = registry.register(&name, &image).await?;
            println!("{}", output::registration(&stored));
        }
        Commands::Identify { image } => {
            println!("Identifying faces in {}...", image.display());
            let result = registry.identify(&image).await?;
            println!("{}", output::identification(&result));
        }
        Commands::Compare { image1, image2 } => {
            println!("Comparing {} and {}...", image1.display(), image2.display());
            let result = registry.compare(&image1, &image2).await?;
            println!("{}", output::comparison(&result));
        }
        Commands::List => {
            println!("Scanning for registered faces...");
            let faces = registry.list()?;
            println!("{}", output::listing(&faces));
        }
    }

    Ok(())
}
