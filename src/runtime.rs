//! Dashboard Runtime
//!
//! Wires the periodic tasks to the threshold monitor. Every task only
//! sends [`DashboardEvent`]s; the [`Dashboard`] loop is the single writer
//! of monitor state.
//!
//! - Clock: ticks every second, fires immediately
//! - Poller: one backend request per tick, requests may overlap
//! - Simulation: optional random counts (demo mode)
//! - Commands: operator input, one command per line

use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::BufRead;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::monitor::{DashboardView, MonitorSnapshot, ThresholdMonitor};
use crate::poller::{CameraSnapshot, CrowdSource, FallbackStrategy, PollError, PollOutcome};
use crate::settings::SettingsStore;

pub type EventSender = mpsc::UnboundedSender<DashboardEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<DashboardEvent>;

/// Everything the dashboard loop reacts to
#[derive(Debug)]
pub enum DashboardEvent {
    ClockTick(DateTime<Local>),
    Polled(Result<CameraSnapshot, PollError>),
    Simulated(u32),
    Command(ControlCommand),
    Shutdown,
}

/// Operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Raw input; validated by the monitor
    SetThreshold(String),
    ToggleRecording,
    /// Set the count by hand
    Observe(u32),
    /// Count one above the threshold
    TestAlert,
    /// Count one below the threshold
    TestNormal,
    /// Notify responders, regardless of the alert phase
    SendAlert,
    Status,
}

pub const COMMAND_HELP: &str = "commands: threshold <n> | record | count <n> | test-alert | test-normal | alert | status";

impl FromStr for ControlCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let name = parts.next().ok_or(CommandError::Empty)?;
        let arg = parts.next();

        if parts.next().is_some() {
            return Err(CommandError::TooManyArguments(name.to_string()));
        }

        let command = match (name.to_lowercase().as_str(), arg) {
            ("threshold" | "t", Some(value)) => ControlCommand::SetThreshold(value.to_string()),
            ("record" | "r", None) => ControlCommand::ToggleRecording,
            ("count" | "c", Some(value)) => ControlCommand::Observe(
                value
                    .parse()
                    .map_err(|_| CommandError::InvalidCount(value.to_string()))?,
            ),
            ("test-alert", None) => ControlCommand::TestAlert,
            ("test-normal", None) => ControlCommand::TestNormal,
            ("alert" | "a", None) => ControlCommand::SendAlert,
            ("status" | "s", None) => ControlCommand::Status,
            ("threshold" | "t" | "count" | "c", None) => {
                return Err(CommandError::MissingArgument(name.to_string()))
            }
            (
                "record" | "r" | "test-alert" | "test-normal" | "alert" | "a" | "status" | "s",
                Some(_),
            ) => {
                return Err(CommandError::TooManyArguments(name.to_string()))
            }
            _ => return Err(CommandError::Unknown(name.to_string())),
        };

        Ok(command)
    }
}

/// Rejected operator input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command {0:?}")]
    Unknown(String),

    #[error("{0} needs a value")]
    MissingArgument(String),

    #[error("too many arguments for {0}")]
    TooManyArguments(String),

    #[error("invalid count {0:?}")]
    InvalidCount(String),
}

/// Owns the monitor and everything that mutates it
pub struct Dashboard<V> {
    monitor: ThresholdMonitor<V>,
    fallback: Box<dyn FallbackStrategy>,
    settings: Box<dyn SettingsStore>,
}

impl<V: DashboardView> Dashboard<V> {
    pub fn new(
        monitor: ThresholdMonitor<V>,
        fallback: Box<dyn FallbackStrategy>,
        settings: Box<dyn SettingsStore>,
    ) -> Self {
        Self {
            monitor,
            fallback,
            settings,
        }
    }

    pub fn monitor(&self) -> &ThresholdMonitor<V> {
        &self.monitor
    }

    /// Apply one event; returns false once the loop should stop
    pub fn handle(&mut self, event: DashboardEvent) -> bool {
        match event {
            DashboardEvent::ClockTick(at) => self.monitor.view_mut().set_last_update(at),
            DashboardEvent::Polled(result) => self.apply_poll(result),
            DashboardEvent::Simulated(count) => {
                tracing::debug!(count, "Simulated count");
                self.monitor.observe(count);
            }
            DashboardEvent::Command(command) => self.apply_command(command),
            DashboardEvent::Shutdown => return false,
        }
        true
    }

    /// Drain events until shutdown; returns the final state
    pub async fn run(mut self, mut events: EventReceiver) -> MonitorSnapshot {
        tracing::info!(threshold = %self.monitor.threshold(), "Dashboard started");

        while let Some(event) = events.recv().await {
            if !self.handle(event) {
                break;
            }
        }

        let snapshot = self.monitor.snapshot();
        tracing::info!(
            count = snapshot.count,
            alerts_fired = snapshot.alerts_fired,
            "Dashboard stopped"
        );
        snapshot
    }

    fn apply_poll(&mut self, result: Result<CameraSnapshot, PollError>) {
        let outcome = PollOutcome::resolve(result, self.fallback.as_mut());
        self.monitor.set_network_status(outcome.is_connected());

        if let PollOutcome::Failed { error, .. } = &outcome {
            tracing::error!("Error fetching crowd data: {}", error);
        }

        if let Some(sample) = outcome.sample() {
            if sample.synthetic {
                tracing::debug!(count = sample.total_count, "Using synthetic count");
            }
            self.monitor.apply_sample(sample);
        }
    }

    fn apply_command(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::SetThreshold(input) => match self.monitor.set_threshold(&input) {
                Ok(_) => {
                    if let Err(e) = self.settings.save_threshold(self.monitor.threshold()) {
                        tracing::error!("Failed to save threshold: {}", e);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "{} (keeping threshold {})",
                        e,
                        self.monitor.threshold()
                    );
                }
            },
            ControlCommand::ToggleRecording => {
                self.monitor.toggle_recording();
            }
            ControlCommand::Observe(count) => {
                self.monitor.observe(count);
            }
            ControlCommand::TestAlert => {
                let count = self.monitor.threshold().get().saturating_add(1);
                tracing::info!("Testing alert system...");
                self.monitor.observe(count);
            }
            ControlCommand::TestNormal => {
                let count = self.monitor.threshold().get().saturating_sub(1);
                tracing::info!("Testing normal count...");
                self.monitor.observe(count);
            }
            ControlCommand::SendAlert => {
                tracing::warn!(
                    count = self.monitor.count(),
                    threshold = %self.monitor.threshold(),
                    "Emergency alert sent!"
                );
            }
            ControlCommand::Status => {
                let snapshot = self.monitor.snapshot();
                tracing::info!(
                    count = snapshot.count,
                    threshold = %snapshot.threshold,
                    alert_active = snapshot.alert_active,
                    recording = snapshot.recording,
                    network_connected = snapshot.network_connected,
                    location = ?snapshot.location,
                    "Status"
                );
            }
        }
    }
}

/// Send a clock tick every `period`, starting now
pub fn spawn_clock(events: EventSender, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if events.send(DashboardEvent::ClockTick(Local::now())).is_err() {
                break;
            }
        }
    })
}

/// Poll `source` every `period`, first request after one period
///
/// Each request runs in its own task, so a slow backend can have several
/// requests in flight; results are delivered in completion order.
pub fn spawn_poller(
    events: EventSender,
    source: Arc<dyn CrowdSource>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if events.is_closed() {
                break;
            }

            let source = Arc::clone(&source);
            let events = events.clone();
            tokio::spawn(async move {
                let result = source.fetch().await;
                // Dashboard may be gone by now
                let _ = events.send(DashboardEvent::Polled(result));
            });
        }
    })
}

/// Inject a random count in `[0, max_count]` every `period`
pub fn spawn_simulation(
    events: EventSender,
    period: Duration,
    max_count: u32,
    seed: Option<u64>,
) -> JoinHandle<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let count = rng.random_range(0..=max_count);
            if events.send(DashboardEvent::Simulated(count)).is_err() {
                break;
            }
        }
    })
}

/// Read one command per line until EOF
///
/// Runs on a plain thread: a blocked terminal read must not keep the async
/// runtime from shutting down. Bad lines are reported on stderr and skipped.
pub fn spawn_command_reader<R>(reader: R, events: EventSender) -> std::thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    std::thread::spawn(move || {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("Command input closed: {}", e);
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<ControlCommand>() {
                Ok(command) => {
                    if events.send(DashboardEvent::Command(command)).is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("{} ({})", e, COMMAND_HELP),
            }
        }
    })
}
