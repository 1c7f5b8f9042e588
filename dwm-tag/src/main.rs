//! dwm-tag: Tag application binary.
//!
//! Supports:
//! - Replaying an event script through the service loop, streaming each
//!   uplink payload to stdout or a file
//! - Encoding a single set of anchor distances
//! - Inspecting a script as JSON events
//! - Showing or initializing the config file

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::{error, info};

use dwm_core::config::{self, Config};
use dwm_core::dispatch::Dispatcher;
use dwm_core::encode::Encoder;
use dwm_core::event::EventMask;
use dwm_core::service::{self, EventSource, ServiceStats};
use dwm_core::types::AnchorDistance;

mod output;
mod script;

use output::StreamUplink;
use script::ScriptSource;

#[derive(Parser)]
#[command(name = "dwm-tag", version, about = "DWM tag ranging uplink")]
struct Cli {
    /// Config file (defaults to ~/.dwm-tag/config.yaml)
    #[arg(long, global = true, env = "DWM_TAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the service loop over an event script
    Replay {
        /// Path to event script (one event per line)
        file: PathBuf,

        /// Write uplink payloads here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Register for every event kind, not just the application's
        #[arg(long)]
        all_events: bool,
    },

    /// Encode one location event given as addr:mm pairs
    Encode {
        #[arg(required = true, value_parser = script::parse_anchor)]
        anchors: Vec<AnchorDistance>,
    },

    /// Print the events of a script as JSON lines
    Inspect {
        /// Path to event script
        file: PathBuf,
    },

    /// Show or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config::config_file);
    let config = config::load_config_from(&config_path);

    if let Err(e) = config.validate() {
        error!("{}: {e}", config_path.display());
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Replay {
            file,
            out,
            all_events,
        } => cmd_replay(&config, &file, out.as_deref(), all_events),
        Commands::Encode { anchors } => cmd_encode(&config, &anchors),
        Commands::Inspect { file } => cmd_inspect(&file),
        Commands::Config { action } => cmd_config(&config, &config_path, action),
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

fn cmd_replay(
    config: &Config,
    file: &Path,
    out: Option<&Path>,
    all_events: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("App: dwm-tag {}", env!("CARGO_PKG_VERSION"));
    info!(
        "update rate {}x100ms, stationary {}x100ms, sensitivity {}",
        config.tag.update_rate,
        config.tag.stationary_rate,
        config.tag.stationary_sensitivity.as_str()
    );

    let mut source = ScriptSource::open(file)?;
    let sink: Box<dyn Write> = match out {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    let mask = if all_events {
        EventMask::all()
    } else {
        EventMask::APP_DEFAULT
    };
    let (stats, uplink) = replay(&mut source, sink, config, mask);

    info!(
        "{} frames, {} bytes uplinked ({} write failures)",
        uplink.frames, uplink.bytes, stats.write_failures
    );
    Ok(())
}

/// Run the service loop over `source`, streaming payloads into `sink`.
fn replay<S: EventSource, W: Write>(
    source: &mut S,
    sink: W,
    config: &Config,
    mask: EventMask,
) -> (ServiceStats, StreamUplink<W>) {
    let uplink = StreamUplink::new(sink, config.uplink.max_frame);
    let mut dispatcher = Dispatcher::new(uplink, config);
    let stats = service::run(source, &mut dispatcher, mask);
    (stats, dispatcher.into_uplink())
}

fn cmd_encode(config: &Config, anchors: &[AnchorDistance]) -> Result<(), Box<dyn std::error::Error>> {
    let payload = Encoder::new(&config.encoder).encode(anchors)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(&payload)?;
    stdout.flush()?;
    Ok(())
}

fn cmd_inspect(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = ScriptSource::open(file)?;
    for (line, parsed) in source.events() {
        match parsed {
            Ok(evt) => println!("{}", serde_json::to_string(&evt)?),
            Err(reason) => error!("line {line}: {reason}"),
        }
    }
    Ok(())
}

fn cmd_config(
    config: &Config,
    path: &Path,
    action: ConfigAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            println!("# {}", path.display());
            print!("{}", config::serialize_config(config));
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                return Err(format!("{} exists (use --force to overwrite)", path.display()).into());
            }
            config::save_config_to(&Config::default(), path)?;
            info!("wrote {}", path.display());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
