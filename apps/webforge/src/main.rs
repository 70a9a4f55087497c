//! webforge - turn a web archive into a native desktop executable
//!
//! The CLI runs the build service in-process: it submits one archive, follows
//! the pipeline's events until the build reaches a terminal phase, and
//! reports the result.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{AppArgs, Cli, Commands};
use crate::display::{BuildOutcome, CommandResult, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tokio::select;
use tracing::{error, info};
use webforge_builder::IconAsset;
use webforge_config::Config;
use webforge_events::{EventReceiver, EventSender};
use webforge_ops::{BuildService, OpsContextBuilder, RetentionSweeper, SubmitRequest};
use webforge_types::{BuildId, BuildRecord, BuildStatus, OutputFormat, Phase};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    logging::init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting webforge v{}", env!("CARGO_PKG_VERSION"));

    // File (or defaults), then environment, then flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    if let Some(color) = cli.global.color {
        config.general.color = color;
    }
    config.validate()?;

    let json_output = cli.global.json || config.general.default_output == OutputFormat::Json;
    let renderer = OutputRenderer::new(json_output, config.general.color);
    let mut event_handler =
        EventHandler::new(renderer.colors_enabled(), cli.global.debug, json_output);

    let (event_sender, event_receiver) = webforge_events::channel();
    let result = execute_command_with_events(
        cli.command,
        config,
        event_sender,
        event_receiver,
        &mut event_handler,
    )
    .await?;

    renderer.render_result(&result)?;
    info!("Command completed successfully");
    Ok(())
}

/// Execute the command while draining its events
async fn execute_command_with_events(
    command: Commands,
    config: Config,
    event_sender: EventSender,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, config, event_sender));

    loop {
        select! {
            result = &mut command_future => {
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => { /* Channel closed: keep waiting for command to finish */ }
                }
            }
        }
    }
}

async fn execute_command(
    command: Commands,
    config: Config,
    event_sender: EventSender,
) -> Result<CommandResult, CliError> {
    match command {
        Commands::Build {
            archive,
            icon,
            output_dir,
            app,
        } => {
            let outcome =
                build(config, event_sender, &archive, icon.as_deref(), output_dir, app).await?;
            Ok(CommandResult::Build(Box::new(outcome)))
        }

        Commands::Sweep { watch } => {
            let sweeper = RetentionSweeper::new(&config, Some(event_sender));
            if watch {
                let handle = sweeper.spawn();
                tokio::signal::ctrl_c().await?;
                handle.stop().await;
                Ok(CommandResult::Sweep(webforge_types::SweepReport::default()))
            } else {
                Ok(CommandResult::Sweep(sweeper.sweep_once().await))
            }
        }

        Commands::Health => {
            let service = start_service(config, event_sender)?;
            let health = service.health();
            service.shutdown().await;
            Ok(CommandResult::Health(health))
        }

        Commands::Config => Ok(CommandResult::Config(Box::new(config))),
    }
}

fn start_service(config: Config, event_sender: EventSender) -> Result<BuildService, CliError> {
    let ctx = OpsContextBuilder::new()
        .with_config(config)
        .with_event_sender(event_sender)
        .build()?;
    Ok(BuildService::start(ctx))
}

async fn build(
    config: Config,
    event_sender: EventSender,
    archive: &Path,
    icon: Option<&Path>,
    output_dir: Option<PathBuf>,
    app: AppArgs,
) -> Result<BuildOutcome, CliError> {
    let archive_bytes = tokio::fs::read(archive).await?;
    let icon = match icon {
        Some(path) => Some(IconAsset::new(
            path.file_name().map(|name| name.to_string_lossy().into_owned()),
            tokio::fs::read(path).await?,
        )),
        None => None,
    };
    let fallback_name = archive
        .file_stem()
        .map_or_else(|| "app".to_string(), |stem| stem.to_string_lossy().into_owned());

    let service = start_service(config, event_sender)?;
    let id = service.submit(SubmitRequest {
        archive: archive_bytes,
        icon,
        config: app.into_config(&fallback_name),
    })?;

    let record = wait_for_terminal(&service, &id).await;
    let artifact = service.artifact(&id).await?;
    service.shutdown().await;

    if record.phase == Phase::Failed {
        return Err(CliError::BuildFailed {
            message: record
                .error
                .unwrap_or_else(|| "build failed without a message".to_string()),
        });
    }

    let copied_to = match (&artifact, output_dir) {
        (Some(artifact), Some(dir)) => {
            tokio::fs::create_dir_all(&dir).await?;
            let destination = dir.join(&artifact.filename);
            tokio::fs::copy(&artifact.path, &destination).await?;
            Some(destination)
        }
        _ => None,
    };

    Ok(BuildOutcome {
        record,
        artifact,
        copied_to,
    })
}

async fn wait_for_terminal(service: &BuildService, id: &BuildId) -> BuildRecord {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        ticker.tick().await;
        if let BuildStatus::Known(record) = service.status(id) {
            if record.phase.is_terminal() {
                return record;
            }
        }
    }
}
