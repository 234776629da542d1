use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "livepreview")]
#[command(version, about = "Isolated live preview for generated web code")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the preview server and the coordinator update channel
    Serve {
        /// Port to serve on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Coordinator WebSocket URL, e.g. ws://127.0.0.1:4000/ws
        #[arg(long)]
        coordinator: Option<String>,

        /// Project whose update notifications trigger a refresh
        #[arg(long)]
        project: Option<String>,

        /// Initial viewport preset
        #[arg(long)]
        viewport: Option<String>,

        /// Open the preview in a browser once the server starts
        #[arg(long)]
        open: bool,

        /// Enable dev mode (permissive CORS, bind on all interfaces)
        #[arg(long)]
        dev: bool,
    },
    /// Assemble a payload into a standalone document and print it
    Assemble {
        /// JSON payload file, or a directory of generated files
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// List viewport presets and their dimensions
    Viewports,
    /// Show or validate the effective configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.with_target(false).init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Serve {
            port,
            coordinator,
            project,
            viewport,
            open,
            dev,
        } => {
            cmd::cmd_serve(
                &project_dir,
                cmd::ServeArgs {
                    port: *port,
                    coordinator: coordinator.clone(),
                    project: project.clone(),
                    viewport: viewport.clone(),
                    open: *open,
                    dev: *dev,
                },
            )
            .await?;
        }
        Commands::Assemble { path } => cmd::cmd_assemble(path)?,
        Commands::Viewports => cmd::cmd_viewports(),
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
