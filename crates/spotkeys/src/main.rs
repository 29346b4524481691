//! Binary entrypoint for spotkeys.
use std::{
    path::{Path, PathBuf},
    process,
    sync::Arc,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::{LoadedConfig, load_from_path, resolve_config_path};
use keycode::Key;
use keylisten::{KeyHandler, Listener};
use player::{ActionTable, KnownActions, Spotify, action_names};
use spotkeys_engine::{Engine, NotificationDispatcher, Notifier, Outcome};
use tokio::{runtime, signal};
use tracing::{debug, error, info};

mod notifier;

use crate::notifier::DesktopNotifier;

#[derive(Parser, Debug)]
#[command(name = "spotkeys", about = "Global hotkeys for Spotify playback", version)]
/// Command-line interface for the `spotkeys` binary.
struct Cli {
    /// Optional subcommand. Without one, listen for hotkeys until Ctrl-C.
    #[command(subcommand)]
    command: Option<Command>,

    /// Logging controls
    #[command(flatten)]
    log: logging::LogArgs,

    /// Path to the settings file (defaults to ~/.spotkeys/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
/// Top-level CLI subcommands.
enum Command {
    /// Load and validate settings and bindings, then exit.
    Check {
        /// List every bindable action name
        #[arg(long)]
        actions: bool,
    },
    /// Run one action immediately, as if its hotkey had been pressed.
    Run {
        /// Action name, e.g. `toggle_play`
        action: String,
    },
}

/// Feeds listener events into the engine.
struct EngineKeys(Engine);

impl KeyHandler for EngineKeys {
    fn on_press(&self, key: Key) {
        self.0.on_key_press(key);
    }

    fn on_release(&self, key: Key) {
        self.0.on_key_release(key);
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log.spec());

    let loaded = match load(cli.config.as_deref()) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("{}", e.pretty());
            process::exit(1);
        }
    };

    let result = match &cli.command {
        Some(Command::Check { actions }) => check(loaded, *actions),
        Some(Command::Run { action }) => run_once(loaded, action),
        None => listen(loaded),
    };
    if let Err(e) = result {
        error!("{e:#}");
        eprintln!("spotkeys: {e:#}");
        process::exit(1);
    }
}

fn load(explicit: Option<&Path>) -> Result<LoadedConfig, config::Error> {
    let path = resolve_config_path(explicit)?;
    debug!(path = %path.display(), "config_resolved");
    load_from_path(&path)
}

/// Validate bindings against the action table without touching the network.
fn check(loaded: LoadedConfig, list: bool) -> anyhow::Result<()> {
    let LoadedConfig { settings, bindings } = loaded;
    let chords = bindings.len();
    let engine = Engine::new(
        bindings,
        &settings.groups,
        Arc::new(KnownActions),
        Arc::new(DesktopNotifier::new(&settings.notify)),
    )?;
    engine.shutdown();
    if list {
        for name in action_names() {
            println!("{name}");
        }
    }
    println!("OK ({chords} chords)");
    Ok(())
}

fn build_engine(loaded: LoadedConfig) -> anyhow::Result<Engine> {
    let LoadedConfig { settings, bindings } = loaded;
    let sink: Arc<dyn Notifier> = Arc::new(DesktopNotifier::new(&settings.notify));
    let spotify = Spotify::from_settings(&settings, NotificationDispatcher::new(sink.clone()))
        .context("failed to initialise the player")?;
    let provider = Arc::new(ActionTable::new(Arc::new(spotify)));
    Ok(Engine::new(bindings, &settings.groups, provider, sink)?)
}

fn run_once(loaded: LoadedConfig, action: &str) -> anyhow::Result<()> {
    let engine = build_engine(loaded)?;
    let outcome = engine.execute_now(action);
    engine.shutdown();
    match outcome {
        Outcome::Ok => Ok(()),
        Outcome::Unknown => anyhow::bail!(
            "unknown action '{action}'; known actions: {}",
            action_names().join(", ")
        ),
        other => anyhow::bail!("action '{action}' did not complete: {other:?}"),
    }
}

fn listen(loaded: LoadedConfig) -> anyhow::Result<()> {
    let engine = build_engine(loaded)?;
    let listener =
        Listener::start(EngineKeys(engine.clone())).context("cannot listen to the keyboard")?;
    info!(chords = engine.bindings().len(), "listening; press Ctrl-C to quit");

    let rt = runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start signal runtime")?;
    rt.block_on(signal::ctrl_c())
        .context("failed to wait for Ctrl-C")?;

    info!("shutting down");
    listener.stop();
    engine.shutdown();
    Ok(())
}
