//! Fight Pit
//!
//! Chat participants issue social commands against each other and their
//! on-screen actors play the interactions out. Lines are read from stdin:
//! either JSON commands or chat lines such as `alice: !squash @bob`.

use clap::Parser;
use director::{
    CommandQueue, Director, DirectorConfig, DirectorError, FixedRateClock, JsonlSink, Scheduler,
    TickSource,
};
use pit_core::config::DEFAULT_CONFIG_PATH;
use pit_core::{AmbientSettings, AmbientSim, ConfigError, PitConfig, Registry, SkinCatalog};
use pit_events::ParticipantId;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod chat;
mod ledger;

use app::App;

/// Command line arguments for the fight pit
#[derive(Parser, Debug)]
#[command(name = "fight-pit")]
#[command(about = "A command-driven fight pit with directed interactions")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Participants to register at startup (comma separated)
    #[arg(long, value_delimiter = ',')]
    participants: Vec<String>,

    /// Stop after this many seconds instead of waiting for stdin to close
    #[arg(long, value_parser = parse_seconds)]
    duration_secs: Option<Duration>,

    /// Write the director trace as JSON lines
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Seed for wandering and chat rolls
    #[arg(long)]
    seed: Option<u64>,

    /// Print the default configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Debug, Error)]
enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("director error: {0}")]
    Director(#[from] DirectorError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("run time of {0:?} is too long")]
    DurationTooLong(Duration),
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if args.print_config {
        print!("{}", pit_core::default_config_toml());
        return ExitCode::SUCCESS;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{}", error);
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<PitConfig, ConfigError> {
    if args.config.exists() {
        info!("Loading configuration from {}", args.config.display());
        PitConfig::from_file(&args.config)
    } else {
        info!("{} not found, using defaults", args.config.display());
        PitConfig::default().normalized()
    }
}

fn run(args: Args) -> Result<(), AppError> {
    let config = load_config(&args)?;
    let seed = args.seed.or(config.ambient.seed);
    let mut rng = match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };

    info!("Fight Pit");
    info!(
        "Stage {}x{}, floor at {:.0}, {} ticks/s",
        config.stage.screen_width,
        config.stage.screen_height,
        config.floor_elevation(),
        config.timing.framerate
    );

    let registry = Arc::new(Registry::new(config.floor_elevation()));
    let skins = Arc::new(SkinCatalog::standard());

    let mut scheduler = Scheduler::new(
        DirectorConfig::from_pit(&config),
        Arc::clone(&registry),
        skins.clone(),
        CommandQueue::new(),
    );
    if let Some(path) = &args.trace {
        info!("Writing director trace to {}", path.display());
        scheduler = scheduler.with_sink(JsonlSink::create(path)?);
    }
    let mut director = Director::new(scheduler);

    let app_rng = SmallRng::from_rng(&mut rng).unwrap_or_else(|_| SmallRng::from_entropy());
    let mut app = App::new(Arc::clone(&registry), skins, director.sender(), app_rng)
        .with_ignored(config.chat.clone());
    for name in &args.participants {
        let id = ParticipantId::new(name.trim());
        if id.as_str().is_empty() {
            continue;
        }
        if let Err(error) = app.join(&id) {
            warn!("Could not add {}: {}", id, error);
        }
    }

    let mut ambient = AmbientSim::new(AmbientSettings::from_config(&config), seed);
    let lines = spawn_stdin_reader()?;
    director.start()?;

    let deadline = match args.duration_secs {
        Some(duration) => Some(
            Instant::now()
                .checked_add(duration)
                .ok_or(AppError::DurationTooLong(duration))?,
        ),
        None => None,
    };
    let mut clock = FixedRateClock::new(config.timing.framerate);
    let mut input_open = true;
    let mut ticks: u64 = 0;

    loop {
        let dt = clock.tick();
        ticks += 1;

        while input_open {
            match lines.try_recv() {
                Ok(line) => app.handle_line(&line),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("Input closed");
                    input_open = false;
                }
            }
        }

        ambient.step(&registry, dt);

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            info!("Run time elapsed after {} ticks", ticks);
            break;
        }
        if !input_open && deadline.is_none() && director.pending() == 0 && !any_puppeted(&registry)
        {
            info!("All commands handled after {} ticks", ticks);
            break;
        }
    }

    let dropped = director.stop()?;
    info!(
        "Stopped with {} participants, {} commands dropped",
        registry.len(),
        dropped
    );
    info!("Final state: {}", serde_json::to_string(&registry.snapshot())?);
    Ok(())
}

/// Parses a non-negative, finite number of seconds.
fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|error| format!("'{}' is not a number: {}", value, error))?;
    if secs < 0.0 {
        return Err(format!("'{}' is negative", value));
    }
    Duration::try_from_secs_f64(secs).map_err(|error| format!("'{}': {}", value, error))
}

fn any_puppeted(registry: &Registry) -> bool {
    registry.snapshot().iter().any(|view| view.puppet)
}

/// Reads stdin lines on a background thread. The channel disconnects when
/// stdin closes.
fn spawn_stdin_reader() -> io::Result<Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        warn!("Failed to read stdin: {}", error);
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}
