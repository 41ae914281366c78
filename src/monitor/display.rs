//! Dashboard views
//!
//! The monitor never renders anything itself. It pushes updates into a
//! [`DashboardView`], which decides how they reach the operator.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::io::Write;

use crate::poller::Location;

/// Overall system status shown next to the count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Normal,
    Warning,
}

/// Display collaborator driven by the threshold monitor
pub trait DashboardView {
    fn set_count(&mut self, count: u32);

    fn set_location(&mut self, location: Location);

    fn set_network_status(&mut self, connected: bool);

    /// `message` is empty when the alert is cleared
    fn set_alert(&mut self, active: bool, message: &str);

    fn set_recording(&mut self, recording: bool);

    fn set_system_status(&mut self, status: SystemStatus);

    fn set_last_update(&mut self, at: DateTime<Local>);
}

impl<V: DashboardView + ?Sized> DashboardView for Box<V> {
    fn set_count(&mut self, count: u32) {
        (**self).set_count(count)
    }

    fn set_location(&mut self, location: Location) {
        (**self).set_location(location)
    }

    fn set_network_status(&mut self, connected: bool) {
        (**self).set_network_status(connected)
    }

    fn set_alert(&mut self, active: bool, message: &str) {
        (**self).set_alert(active, message)
    }

    fn set_recording(&mut self, recording: bool) {
        (**self).set_recording(recording)
    }

    fn set_system_status(&mut self, status: SystemStatus) {
        (**self).set_system_status(status)
    }

    fn set_last_update(&mut self, at: DateTime<Local>) {
        (**self).set_last_update(at)
    }
}

/// A single view update, as emitted by [`JsonLinesView`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewEvent {
    Count { count: u32 },
    Location { latitude: f64, longitude: f64 },
    Network { connected: bool },
    Alert { active: bool, message: String },
    Recording { recording: bool },
    Status { status: SystemStatus },
    Clock { time: String },
}

/// Renders the dashboard as structured log lines
#[derive(Debug, Default)]
pub struct LogView {
    connected: Option<bool>,
}

impl LogView {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DashboardView for LogView {
    fn set_count(&mut self, count: u32) {
        tracing::info!(count, "People count updated");
    }

    fn set_location(&mut self, location: Location) {
        tracing::debug!(location = %location, "Location updated");
    }

    fn set_network_status(&mut self, connected: bool) {
        // Only log changes; this is called on every poll
        if self.connected != Some(connected) {
            if connected {
                tracing::info!("Backend connected");
            } else {
                tracing::warn!("Backend disconnected");
            }
            self.connected = Some(connected);
        }
    }

    fn set_alert(&mut self, active: bool, message: &str) {
        if active {
            tracing::warn!("CROWD ALERT: {}", message);
        } else {
            tracing::info!("Alert cleared - crowd below threshold");
        }
    }

    fn set_recording(&mut self, recording: bool) {
        if recording {
            tracing::info!("Recording started");
        } else {
            tracing::info!("Recording stopped");
        }
    }

    fn set_system_status(&mut self, status: SystemStatus) {
        tracing::debug!(?status, "System status");
    }

    fn set_last_update(&mut self, at: DateTime<Local>) {
        tracing::trace!(time = %format_clock(at), "Tick");
    }
}

/// Writes one JSON object per view update
pub struct JsonLinesView<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, event: ViewEvent) {
        let written = serde_json::to_writer(&mut self.out, &event)
            .map_err(std::io::Error::from)
            .and_then(|_| self.out.write_all(b"\n"))
            .and_then(|_| self.out.flush());

        if let Err(e) = written {
            tracing::error!("Failed to write view event: {}", e);
        }
    }
}

impl<W: Write> DashboardView for JsonLinesView<W> {
    fn set_count(&mut self, count: u32) {
        self.emit(ViewEvent::Count { count });
    }

    fn set_location(&mut self, location: Location) {
        self.emit(ViewEvent::Location {
            latitude: location.latitude,
            longitude: location.longitude,
        });
    }

    fn set_network_status(&mut self, connected: bool) {
        self.emit(ViewEvent::Network { connected });
    }

    fn set_alert(&mut self, active: bool, message: &str) {
        self.emit(ViewEvent::Alert {
            active,
            message: message.to_string(),
        });
    }

    fn set_recording(&mut self, recording: bool) {
        self.emit(ViewEvent::Recording { recording });
    }

    fn set_system_status(&mut self, status: SystemStatus) {
        self.emit(ViewEvent::Status { status });
    }

    fn set_last_update(&mut self, at: DateTime<Local>) {
        self.emit(ViewEvent::Clock {
            time: format_clock(at),
        });
    }
}

/// 12-hour wall clock, e.g. `3:07:09 PM`
pub fn format_clock(at: DateTime<Local>) -> String {
    at.format("%-I:%M:%S %p").to_string()
}

/// Records every update, for assertions in tests
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct CapturingView {
    pub events: Vec<ViewEvent>,
}

#[cfg(test)]
impl CapturingView {
    pub fn alerts(&self) -> Vec<(bool, String)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Alert { active, message } => Some((*active, message.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn last_network(&self) -> Option<bool> {
        self.events.iter().rev().find_map(|e| match e {
            ViewEvent::Network { connected } => Some(*connected),
            _ => None,
        })
    }

    pub fn counts(&self) -> Vec<u32> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Count { count } => Some(*count),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl DashboardView for CapturingView {
    fn set_count(&mut self, count: u32) {
        self.events.push(ViewEvent::Count { count });
    }

    fn set_location(&mut self, location: Location) {
        self.events.push(ViewEvent::Location {
            latitude: location.latitude,
            longitude: location.longitude,
        });
    }

    fn set_network_status(&mut self, connected: bool) {
        self.events.push(ViewEvent::Network { connected });
    }

    fn set_alert(&mut self, active: bool, message: &str) {
        self.events.push(ViewEvent::Alert {
            active,
            message: message.to_string(),
        });
    }

    fn set_recording(&mut self, recording: bool) {
        self.events.push(ViewEvent::Recording { recording });
    }

    fn set_system_status(&mut self, status: SystemStatus) {
        self.events.push(ViewEvent::Status { status });
    }

    fn set_last_update(&mut self, at: DateTime<Local>) {
        self.events.push(ViewEvent::Clock {
            time: format_clock(at),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_json_lines_output() {
        let mut view = JsonLinesView::new(Vec::new());
        view.set_count(7);
        view.set_alert(true, "7 people detected.");
        view.set_system_status(SystemStatus::Warning);

        let out = String::from_utf8(view.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], r#"{"type":"count","count":7}"#);
        assert_eq!(
            lines[1],
            r#"{"type":"alert","active":true,"message":"7 people detected."}"#
        );
        assert_eq!(lines[2], r#"{"type":"status","status":"warning"}"#);
    }

    #[test]
    fn test_format_clock() {
        let at = Local.with_ymd_and_hms(2024, 3, 1, 15, 7, 9).unwrap();
        assert_eq!(format_clock(at), "3:07:09 PM");

        let morning = Local.with_ymd_and_hms(2024, 3, 1, 0, 30, 0).unwrap();
        assert_eq!(format_clock(morning), "12:30:00 AM");
    }

    #[test]
    fn test_boxed_view_forwards() {
        let mut view: Box<CapturingView> = Box::default();
        DashboardView::set_recording(&mut view, true);
        assert_eq!(view.events, vec![ViewEvent::Recording { recording: true }]);
    }
}
