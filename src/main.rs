use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use inkplay::config::{default_config_path, ConfigStore, InstanceUpdate, PlaylistUpdate};
use inkplay::control::{self, ControlExit};
use inkplay::core::{FrameCache, RefreshScheduler, SystemClock};
use inkplay_core::PluginRegistry;
use inkplay_types::{ActiveWindow, PluginInstance, RefreshPolicy, Settings, TimeOfDay};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "inkplay")]
#[command(author, version, about = "Content rotation for e-paper picture frames", long_about = None)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(short = 'c', long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0", global = true)]
    debug: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the refresh scheduler (default)
    Run {
        /// Do not read control commands from stdin
        #[arg(long)]
        no_control: bool,
    },
    /// Print refresh state and playlist cursors as JSON
    Status,
    /// List registered plugins
    Plugins,
    /// Manage playlists
    #[command(subcommand)]
    Playlist(PlaylistCommand),
    /// Manage plugin instances
    #[command(subcommand)]
    Instance(InstanceCommand),
}

#[derive(Args, Debug)]
struct WindowArgs {
    /// Start of the daily window (HH:MM)
    #[arg(long, value_name = "HH:MM", requires = "end")]
    start: Option<TimeOfDay>,
    /// End of the daily window (HH:MM), exclusive
    #[arg(long, value_name = "HH:MM", requires = "start")]
    end: Option<TimeOfDay>,
}

impl WindowArgs {
    fn window(&self) -> Option<ActiveWindow> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(ActiveWindow::new(start, end)),
            _ => None,
        }
    }
}

#[derive(Args, Debug)]
struct PolicyArgs {
    /// Render again only after this many seconds, reusing the last frame until then
    #[arg(long, value_name = "SECS", conflicts_with_all = ["refresh_at", "refresh_always"])]
    refresh_every: Option<u64>,
    /// Render again once a day at this local time (HH:MM)
    #[arg(long, value_name = "HH:MM", conflicts_with = "refresh_always")]
    refresh_at: Option<TimeOfDay>,
    /// Render on every cycle (default)
    #[arg(long)]
    refresh_always: bool,
}

impl PolicyArgs {
    fn policy(&self) -> Option<RefreshPolicy> {
        if let Some(secs) = self.refresh_every {
            Some(RefreshPolicy::Interval(secs))
        } else if let Some(at) = self.refresh_at {
            Some(RefreshPolicy::Scheduled(at))
        } else if self.refresh_always {
            Some(RefreshPolicy::Always)
        } else {
            None
        }
    }
}

#[derive(Subcommand, Debug)]
enum PlaylistCommand {
    List,
    Add {
        name: String,
        #[command(flatten)]
        window: WindowArgs,
        /// Dwell time for instances in this playlist, in seconds
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
    Remove {
        name: String,
    },
    Update {
        name: String,
        #[arg(long, value_name = "NEW_NAME")]
        rename: Option<String>,
        #[command(flatten)]
        window: WindowArgs,
        /// Drop the window so the playlist is always active
        #[arg(long, conflicts_with_all = ["start", "end"])]
        always: bool,
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum InstanceCommand {
    Add {
        playlist: String,
        name: String,
        plugin: String,
        /// Plugin settings as a JSON object
        #[arg(long, value_name = "JSON")]
        settings: Option<String>,
        /// Dwell time for this instance, in seconds
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
        #[command(flatten)]
        refresh: PolicyArgs,
    },
    Remove {
        playlist: String,
        name: String,
    },
    Update {
        playlist: String,
        name: String,
        #[arg(long, value_name = "JSON")]
        settings: Option<String>,
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
        #[command(flatten)]
        refresh: PolicyArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    // Level 0 (default): warn only
    // Level 1: info
    // Level 2: debug
    // Level 3+: trace
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Allow RUST_LOG to override CLI setting
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        eprintln!("inkplay: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let store = Arc::new(
        ConfigStore::open(&path)
            .with_context(|| format!("Failed to open config {}", path.display()))?,
    );

    match cli.command.unwrap_or(Command::Run { no_control: false }) {
        Command::Run { no_control } => run_scheduler(store, no_control),
        Command::Status => print_status(&store),
        Command::Plugins => {
            for plugin in builtin_registry().list() {
                println!("{:<12} {:<20} {}", plugin.id, plugin.name, plugin.description);
            }
            Ok(())
        }
        Command::Playlist(command) => playlist_command(&store, command),
        Command::Instance(command) => instance_command(&store, command),
    }
}

fn builtin_registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    inkplay_plugins::register_all(&mut registry);
    registry
}

fn run_scheduler(store: Arc<ConfigStore>, no_control: bool) -> Result<()> {
    warn!("Starting inkplay v{}", env!("CARGO_PKG_VERSION"));

    let device = store.device_settings();
    let display = inkplay_display::build_display(&device.display)?;
    info!(
        "Device '{}' on display '{}', timezone {}",
        device.name,
        display.name(),
        device.tz()
    );

    let mut scheduler = RefreshScheduler::new(
        Arc::clone(&store),
        Arc::new(builtin_registry()),
        display,
        Arc::new(SystemClock),
    );
    if let Some(dir) = store.path().and_then(|p| p.parent()) {
        let frames = dir.join("frames");
        info!("Caching rendered frames in {}", frames.display());
        scheduler = scheduler.with_frame_cache(FrameCache::on_disk(frames));
    }
    let handle = scheduler.spawn()?;

    if no_control {
        handle.join()?;
        return Ok(());
    }

    let exit = control::run(
        std::io::stdin().lock(),
        std::io::stdout(),
        &handle.control(),
        &store,
    )?;
    match exit {
        ControlExit::Quit => info!("Quit requested"),
        ControlExit::EndOfInput => info!("Control input closed, shutting down"),
    }
    handle.stop()?;
    Ok(())
}

fn print_status(store: &ConfigStore) -> Result<()> {
    let config = store.snapshot();
    let playlists: Vec<serde_json::Value> = config
        .playlists
        .iter()
        .map(|p| {
            serde_json::json!({
                "name": p.name,
                "window": p.window,
                "instances": p.len(),
                "cursor": p.cursor,
            })
        })
        .collect();
    let status = serde_json::json!({
        "refresh": config.refresh,
        "rotation": config.rotation,
        "playlists": playlists,
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

fn parse_settings(json: Option<&str>) -> Result<Option<Settings>> {
    let Some(json) = json else {
        return Ok(None);
    };
    match serde_json::from_str::<serde_json::Value>(json).context("Invalid --settings JSON")? {
        serde_json::Value::Object(map) => Ok(Some(map)),
        _ => bail!("--settings must be a JSON object"),
    }
}

fn playlist_command(store: &ConfigStore, command: PlaylistCommand) -> Result<()> {
    match command {
        PlaylistCommand::List => {
            for playlist in store.playlists() {
                let window = playlist
                    .window
                    .map_or_else(|| "always".to_string(), |w| w.to_string());
                println!("{} [{}]", playlist.name, window);
                for (i, instance) in playlist.instances.iter().enumerate() {
                    let marker = if i == playlist.cursor { ">" } else { " " };
                    println!(
                        "  {} {} ({}, refresh {})",
                        marker, instance.name, instance.plugin_id, instance.refresh
                    );
                }
            }
        }
        PlaylistCommand::Add {
            name,
            window,
            interval,
        } => {
            store.add_playlist(&name, window.window())?;
            if interval.is_some() {
                store.update_playlist(
                    name.trim(),
                    PlaylistUpdate {
                        cycle_interval_secs: Some(interval),
                        ..PlaylistUpdate::default()
                    },
                )?;
            }
        }
        PlaylistCommand::Remove { name } => {
            store.delete_playlist(&name)?;
        }
        PlaylistCommand::Update {
            name,
            rename,
            window,
            always,
            interval,
        } => {
            let window = if always {
                Some(None)
            } else {
                window.window().map(Some)
            };
            store.update_playlist(
                &name,
                PlaylistUpdate {
                    name: rename,
                    window,
                    cycle_interval_secs: interval.map(Some),
                },
            )?;
        }
    }
    Ok(())
}

fn instance_command(store: &ConfigStore, command: InstanceCommand) -> Result<()> {
    match command {
        InstanceCommand::Add {
            playlist,
            name,
            plugin,
            settings,
            interval,
            refresh,
        } => {
            if !builtin_registry().contains(&plugin) {
                warn!("Plugin '{}' is not built in; the instance will be skipped", plugin);
            }
            let settings = parse_settings(settings.as_deref())?.unwrap_or_default();
            let mut instance = PluginInstance::new(name, plugin, settings)
                .with_refresh_policy(refresh.policy().unwrap_or_default());
            instance.refresh_interval_secs = interval;
            store.add_instance(&playlist, instance)?;
        }
        InstanceCommand::Remove { playlist, name } => {
            store.remove_instance(&playlist, &name)?;
        }
        InstanceCommand::Update {
            playlist,
            name,
            settings,
            interval,
            refresh,
        } => {
            store.update_instance(
                &playlist,
                &name,
                InstanceUpdate {
                    settings: parse_settings(settings.as_deref())?,
                    refresh_interval_secs: interval.map(Some),
                    refresh: refresh.policy(),
                },
            )?;
        }
    }
    Ok(())
}
