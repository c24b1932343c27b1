mod config;
mod event;
mod logging;
mod mapgen;
mod sink;
mod stream;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use config::{ChannelMap, Cli, Commands, RunArgs};
use sink::ChannelLogSink;
use stream::StreamMonitor;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging() {
        eprintln!("Failed to initialize logging: {:#}", e);
        std::process::exit(1);
    }

    match run_command(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run_command(command: Commands) -> Result<i32> {
    match command {
        Commands::Run(args) => run_monitor(args),
        Commands::GenMap(args) => {
            mapgen::generate_url_map(&args.channels, &args.urls, &args.output)?;
            Ok(0)
        }
        Commands::GenConf(args) => {
            mapgen::generate_conf_files(&args.channels, &args.urls, &args.output_dir)?;
            Ok(0)
        }
    }
}

fn run_monitor(args: RunArgs) -> Result<i32> {
    let map = ChannelMap::load(args.map_file.as_deref())?;
    let stream_url = map.resolve(&args.channel)?.to_string();

    let mut sink = ChannelLogSink::new(&args.channel, &args.log_dir, &args.extension)
        .context("Failed to initialize channel log")?;
    info!("Appending events to {}", sink.path().display());

    let thresholds = args.thresholds();
    let monitor = StreamMonitor::new(args.ffmpeg_path, stream_url, args.channel, thresholds)
        .context("Failed to initialize stream monitor")?;

    monitor.run(&mut sink)
}
