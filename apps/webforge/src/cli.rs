//! Command line interface definition

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use webforge_types::{AppConfig, ColorChoice};

/// webforge - turn a web archive into a native desktop executable
#[derive(Parser)]
#[command(name = "webforge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Turn a web archive into a native desktop executable")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging (structured JSON on stderr)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH", env = "WEBFORGE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Build a desktop executable from a zip archive of a static site
    #[command(alias = "b")]
    Build {
        /// Zip archive containing index.html and its assets
        archive: PathBuf,

        /// Application icon (png, jpg or ico)
        #[arg(long, value_name = "FILE")]
        icon: Option<PathBuf>,

        /// Copy the finished executable into this directory
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        app: AppArgs,
    },

    /// Delete workspaces and outputs older than the retention window
    Sweep {
        /// Keep sweeping on the configured interval until interrupted
        #[arg(long)]
        watch: bool,
    },

    /// Report service liveness
    Health,

    /// Print the effective configuration
    Config,
}

/// Application settings for a build
#[derive(Args)]
pub struct AppArgs {
    /// Application name (defaults to the archive file name)
    #[arg(long)]
    pub name: Option<String>,

    /// Short description shown in the executable metadata
    #[arg(long, default_value = "")]
    pub description: String,

    /// Application version (semver)
    #[arg(long = "app-version", value_name = "VERSION", default_value = "1.0.0")]
    pub version: String,

    /// Window width in pixels
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 800)]
    pub height: u32,

    /// Publisher name
    #[arg(long, default_value = "")]
    pub company: String,
}

impl AppArgs {
    /// Settings for the pipeline, naming the app after `fallback_name` when unset
    pub fn into_config(self, fallback_name: &str) -> AppConfig {
        AppConfig {
            app_name: self.name.unwrap_or_else(|| fallback_name.to_string()),
            description: self.description,
            version: self.version,
            width: self.width,
            height: self.height,
            company: self.company,
        }
    }
}
