//! Crowdwatch CLI
//!
//! Command-line interface for crowd monitoring:
//! - Watch the backend and raise threshold alerts
//! - Report a camera count
//! - Show per-camera status
//! - Manage the saved threshold

use clap::{Parser, Subcommand};
use crowdwatch::config::{generate_default_config, Config, LoadedConfig};
use crowdwatch::monitor::{DashboardView, JsonLinesView, LogView, Threshold, ThresholdMonitor};
use crowdwatch::poller::{fallback, BackendClient, CameraReading, CrowdSample};
use crowdwatch::runtime::{self, Dashboard, DashboardEvent, COMMAND_HELP};
use crowdwatch::settings::{self, FileSettingsStore, MemorySettingsStore, SettingsStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "crowdwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Crowd monitoring with threshold alerts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL (overrides the config file)
    #[arg(long, global = true)]
    pub backend_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll the backend and alert when the crowd exceeds the threshold
    Watch {
        /// Never substitute synthetic counts when the backend is down
        #[arg(long)]
        no_fallback: bool,
        /// Seed for synthetic and simulated counts
        #[arg(long)]
        seed: Option<u64>,
        /// Inject random counts (demo mode)
        #[arg(long)]
        simulate: bool,
        /// Print dashboard updates as JSON lines on stdout
        #[arg(long)]
        json: bool,
        /// Do not load or save the threshold
        #[arg(long)]
        ephemeral: bool,
    },

    /// Report a camera's people count to the backend
    Report {
        /// Camera identifier
        camera_id: String,
        /// People currently in view
        count: u32,
        /// Camera latitude
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Camera longitude
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },

    /// Show the latest count of every camera
    Status,

    /// Show or change the saved alert threshold
    Threshold {
        #[command(subcommand)]
        action: ThresholdAction,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ThresholdAction {
    /// Print the threshold `watch` will start with
    Show,
    /// Save a new threshold (a whole number greater than 0)
    Set {
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => LoadedConfig::from_file(path)?,
        None => Config::load_default(),
    };

    crowdwatch::logging::init(&loaded.config.logging)?;
    loaded.log();

    let mut config = loaded.config;
    if let Some(url) = cli.backend_url {
        config.backend.url = url;
    }

    match cli.command {
        Commands::Watch {
            no_fallback,
            seed,
            simulate,
            json,
            ephemeral,
        } => {
            if no_fallback {
                config.fallback.enabled = false;
            }
            if seed.is_some() {
                config.fallback.seed = seed;
            }
            if simulate {
                config.simulation.enabled = true;
            }

            let settings: Box<dyn SettingsStore> = if ephemeral {
                Box::new(MemorySettingsStore::new())
            } else {
                Box::new(FileSettingsStore::new(config.monitor.settings_file()))
            };

            let view: Box<dyn DashboardView + Send> = if json {
                Box::new(JsonLinesView::new(std::io::stdout()))
            } else {
                Box::new(LogView::new())
            };

            watch(config, settings, view, json).await?;
        }

        Commands::Report {
            camera_id,
            count,
            lat,
            lon,
        } => {
            let client = BackendClient::new(&config.backend)?;
            let reading = CameraReading {
                people_count: count,
                latitude: lat,
                longitude: lon,
            };

            match client.report(&camera_id, &reading).await {
                Ok(()) => println!("Reported {} people from {}", count, camera_id),
                Err(e) => {
                    eprintln!("Failed to report to {}: {}", client.base_url(), e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Status => {
            let client = BackendClient::new(&config.backend)?;

            let snapshot = match client.all_data().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    eprintln!("Cannot reach backend at {}", client.base_url());
                    eprintln!("Error: {}", e);
                    eprintln!();
                    eprintln!("Make sure the backend is running:");
                    eprintln!("  crowdwatch-server");
                    std::process::exit(1);
                }
            };

            if snapshot.is_empty() {
                println!("No cameras have reported yet.");
            } else {
                println!("{:<20} {:>8}   {}", "Camera", "People", "Location");
                println!("{}", "-".repeat(50));

                for (camera_id, reading) in &snapshot {
                    println!(
                        "{:<20} {:>8}   {}",
                        camera_id,
                        reading.people_count,
                        reading.location()
                    );
                }

                let sample = CrowdSample::from_snapshot(&snapshot);
                println!("{}", "-".repeat(50));
                println!("{:<20} {:>8}", "Total", sample.total_count);
            }
        }

        Commands::Threshold { action } => {
            let mut store = FileSettingsStore::new(config.monitor.settings_file());

            match action {
                ThresholdAction::Show => {
                    let default = default_threshold(&config);
                    let threshold = settings::initial_threshold(&store, default);
                    println!("{}", threshold);
                }
                ThresholdAction::Set { value } => {
                    let threshold: Threshold = match value.parse() {
                        Ok(t) => t,
                        Err(e) => {
                            eprintln!("{}", e);
                            std::process::exit(1);
                        }
                    };
                    store.save_threshold(threshold)?;
                    println!(
                        "Threshold set to {} people (saved to {:?})",
                        threshold,
                        store.path()
                    );
                }
            }
        }

        Commands::Config { output } => {
            let content = generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &content)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", content);
                }
            }
        }
    }

    Ok(())
}

async fn watch(
    config: Config,
    settings: Box<dyn SettingsStore>,
    view: Box<dyn DashboardView + Send>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let threshold = settings::initial_threshold(settings.as_ref(), default_threshold(&config));
    let client = Arc::new(BackendClient::new(&config.backend)?);

    tracing::info!("Crowdwatch monitor v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        backend = %client.base_url(),
        threshold = %threshold,
        fallback = config.fallback.enabled,
        "Polling every {} ms",
        config.monitor.poll_interval_ms
    );

    if let Err(e) = client.health_check().await {
        tracing::warn!("Backend not available yet: {}", e);
    }

    let monitor = ThresholdMonitor::new(threshold, view);
    let dashboard = Dashboard::new(monitor, fallback::from_config(&config.fallback), settings);

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    let mut tasks = vec![
        runtime::spawn_clock(tx.clone(), config.monitor.clock_interval()),
        runtime::spawn_poller(tx.clone(), client, config.monitor.poll_interval()),
    ];

    if config.simulation.enabled {
        tracing::info!("Demo simulation enabled");
        tasks.push(runtime::spawn_simulation(
            tx.clone(),
            Duration::from_millis(config.simulation.interval_ms.max(1)),
            config.simulation.max_count,
            config.fallback.seed,
        ));
    }

    eprintln!("{}", COMMAND_HELP);
    runtime::spawn_command_reader(std::io::BufReader::new(std::io::stdin()), tx.clone());

    tokio::spawn(async move {
        crowdwatch::server::shutdown_signal().await;
        let _ = tx.send(DashboardEvent::Shutdown);
    });

    let snapshot = dashboard.run(rx).await;

    for task in tasks {
        task.abort();
    }

    if json {
        println!("{}", serde_json::to_string(&snapshot)?);
    }

    Ok(())
}

fn default_threshold(config: &Config) -> Threshold {
    Threshold::new(config.monitor.default_threshold).unwrap_or_else(|e| {
        tracing::warn!("Ignoring configured default threshold: {}", e);
        Threshold::default()
    })
}
