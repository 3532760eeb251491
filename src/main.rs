use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use emu_farmer::common::{Region, RunState};
use emu_farmer::control::{self, SelectionBoard, TerminalWriter};
use emu_farmer::emulator::{self, AdbClient, DeviceChannel, FrameSource};
use emu_farmer::vision::{Matcher, TemplateStore};
use emu_farmer::{AppError, Configuration, CoordinatorBuilder};

#[derive(Parser)]
#[command(
    name = "emu-farmer",
    version,
    about = "Template-matching automation for an adb-connected emulator"
)]
struct Cli {
    /// TOML configuration file; missing files are ignored
    #[arg(short, long, default_value = "emu-farmer.toml")]
    config: PathBuf,
    /// Workflow to run
    #[arg(short, long)]
    workflow: Option<String>,
    /// Device serial passed to `adb -s`
    #[arg(short, long)]
    serial: Option<String>,
    /// Directory holding the template images
    #[arg(long)]
    assets: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the selected workflow until stopped
    Run,
    /// Save one screenshot, handy for cutting templates and reading coordinates
    Capture { output: PathBuf },
    /// Match a template against the current screen once and print the result
    Locate {
        template: PathBuf,
        /// Restrict the search to x,y,width,height
        #[arg(long)]
        region: Option<Region>,
    },
    /// List available workflows
    Workflows,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(TerminalWriter::stdout)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_logging();
    let cli = Cli::parse();

    let mut configuration = Configuration::load(Some(cli.config.as_path()))?;
    if let Some(workflow) = cli.workflow {
        configuration.workflow = workflow;
    }
    if let Some(serial) = cli.serial {
        configuration.serial = Some(serial);
    }
    if let Some(assets) = cli.assets {
        configuration.assets_dir = assets;
    }

    let channel: Arc<dyn DeviceChannel> = Arc::new(AdbClient::new(
        configuration.adb_path.clone(),
        configuration.serial.clone(),
    ));

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(configuration, channel).await,
        Command::Capture { output } => {
            emulator::connect(channel.as_ref())?;
            let frame = FrameSource::new(channel).capture()?;
            let (width, height) = (frame.width(), frame.height());
            frame.into_image().save(&output)?;
            tracing::info!("Saved {}x{} screenshot to {}", width, height, output.display());
            Ok(())
        }
        Command::Locate { template, region } => {
            emulator::connect(channel.as_ref())?;
            let template = TemplateStore::new(0).load(&template)?;
            let frame = FrameSource::new(channel).capture()?;
            let result =
                Matcher::new(configuration.matching).match_template(&frame, &template, region)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Command::Workflows => {
            for name in configuration.workflow_names() {
                let description = configuration
                    .resolve_workflow(&name)
                    .map(|workflow| workflow.description)
                    .unwrap_or_default();
                println!("{:<12} {}", name, description);
            }
            Ok(())
        }
    }
}

async fn run(
    configuration: Configuration,
    channel: Arc<dyn DeviceChannel>,
) -> Result<(), AppError> {
    let device = emulator::connect(channel.as_ref())?;
    tracing::info!("Connected: {}", device.trim());

    let run_state = RunState::new();
    let selections = SelectionBoard::new();
    let stop_key = configuration.stop_key.clone();
    let mut coordinator = CoordinatorBuilder::new(configuration)
        .channel(channel)
        .run_state(run_state.clone())
        .selections(selections.clone())
        .build()?;

    let listener = control::spawn_listener(run_state.clone(), selections, stop_key)?;
    let worker = tokio::task::spawn_blocking(move || coordinator.run());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl-C received");
            run_state.stop();
        }
        _ = run_state.stopped() => {}
    }

    match worker.await {
        Ok(cycles) => tracing::info!("Finished after {} cycles", cycles),
        Err(e) => tracing::error!("Workflow worker failed: {}", e),
    }
    if let Err(e) = tokio::task::spawn_blocking(move || listener.shutdown()).await {
        tracing::error!("Console listener shutdown failed: {}", e);
    }
    Ok(())
}
