//! Threshold Monitoring
//!
//! Compares each people count against a configurable threshold and drives
//! alert and recording state.
//!
//! ## Architecture
//!
//! - **Threshold**: validated, strictly positive limit
//! - **ThresholdMonitor**: edge-triggered `Normal`/`Alerting` state machine
//! - **DashboardView**: display collaborator the monitor reports to

pub mod display;
mod machine;
mod threshold;

pub use display::{DashboardView, JsonLinesView, LogView, SystemStatus, ViewEvent};
pub use machine::{alert_message, AlertPhase, MonitorSnapshot, ThresholdMonitor, Transition};
pub use threshold::{Threshold, ThresholdError};
