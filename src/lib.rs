//! # Crowdwatch
//!
//! Crowd monitoring: polls camera people counts from an aggregation
//! backend, raises an alert when the total crosses a threshold, and serves
//! the backend the cameras report to.
//!
//! ## Features
//!
//! - **Polling**: per-camera counts summed every two seconds
//! - **Edge-triggered alerts**: one notification per threshold crossing
//! - **Persistent threshold**: survives restarts
//! - **Degraded mode**: optional synthetic counts while the backend is down
//! - **Backend**: Axum service collecting camera reports
//!
//! ## Modules
//!
//! - [`poller`]: Backend client and poll outcomes
//! - [`monitor`]: Threshold state machine and dashboard views
//! - [`settings`]: Persisted threshold
//! - [`runtime`]: Periodic tasks and the dashboard event loop
//! - [`server`]: Aggregation backend
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crowdwatch::monitor::{LogView, Threshold, ThresholdMonitor};
//!
//! let mut monitor = ThresholdMonitor::new(Threshold::default(), LogView::new());
//!
//! monitor.observe(3);
//! monitor.observe(6); // alert raised, recording started
//! monitor.observe(6); // still alerting, nothing re-fired
//! monitor.observe(2); // alert cleared
//!
//! assert_eq!(monitor.alerts_fired(), 1);
//! ```

pub mod config;
pub mod logging;
pub mod monitor;
pub mod poller;
pub mod runtime;
pub mod server;
pub mod settings;

// Re-export top-level types for convenience
pub use config::{Config, ConfigError, LoadedConfig, LoggingConfig};

pub use monitor::{
    AlertPhase, DashboardView, JsonLinesView, LogView, MonitorSnapshot, SystemStatus, Threshold,
    ThresholdError, ThresholdMonitor, Transition,
};

pub use poller::{
    BackendClient, CameraReading, CameraSnapshot, CrowdSample, CrowdSource, FallbackStrategy,
    Location, NoFallback, PollError, PollOutcome, RandomFallback,
};

pub use runtime::{CommandError, ControlCommand, Dashboard, DashboardEvent};

pub use server::{build_router, serve, ApiError, AppState};

pub use settings::{FileSettingsStore, MemorySettingsStore, SettingsError, SettingsStore};
