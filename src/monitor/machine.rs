//! Threshold state machine
//!
//! Two phases, `Normal` and `Alerting`. Only a phase change notifies the
//! view of an alert; repeated samples on the same side of the threshold
//! just update the count.

use serde::Serialize;

use super::display::{DashboardView, SystemStatus};
use super::threshold::{Threshold, ThresholdError};
use crate::poller::{CrowdSample, Location};

/// Current alert phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPhase {
    #[default]
    Normal,
    Alerting,
}

/// Result of evaluating the latest count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Normal -> Alerting
    Raised,
    /// Alerting -> Normal
    Cleared,
    Unchanged,
}

/// Read-only copy of the monitor state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorSnapshot {
    pub count: u32,
    pub threshold: Threshold,
    pub phase: AlertPhase,
    pub alert_active: bool,
    pub recording: bool,
    pub network_connected: bool,
    pub location: Option<Location>,
    pub alerts_fired: u64,
}

#[derive(Debug, Clone)]
struct MonitorState {
    threshold: Threshold,
    count: u32,
    phase: AlertPhase,
    recording: bool,
    network_connected: bool,
    location: Option<Location>,
}

/// Drives alert and recording state from incoming people counts
pub struct ThresholdMonitor<V> {
    state: MonitorState,
    view: V,
    alerts_fired: u64,
}

impl<V: DashboardView> ThresholdMonitor<V> {
    pub fn new(threshold: Threshold, view: V) -> Self {
        Self {
            state: MonitorState {
                threshold,
                count: 0,
                phase: AlertPhase::Normal,
                recording: false,
                network_connected: false,
                location: None,
            },
            view,
            alerts_fired: 0,
        }
    }

    pub fn threshold(&self) -> Threshold {
        self.state.threshold
    }

    pub fn count(&self) -> u32 {
        self.state.count
    }

    pub fn phase(&self) -> AlertPhase {
        self.state.phase
    }

    pub fn is_alert_active(&self) -> bool {
        self.state.phase == AlertPhase::Alerting
    }

    pub fn is_recording(&self) -> bool {
        self.state.recording
    }

    /// Number of Normal -> Alerting transitions so far
    pub fn alerts_fired(&self) -> u64 {
        self.alerts_fired
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            count: self.state.count,
            threshold: self.state.threshold,
            phase: self.state.phase,
            alert_active: self.is_alert_active(),
            recording: self.state.recording,
            network_connected: self.state.network_connected,
            location: self.state.location,
            alerts_fired: self.alerts_fired,
        }
    }

    /// Record a new people count and evaluate the threshold
    pub fn observe(&mut self, count: u32) -> Transition {
        self.state.count = count;
        self.view.set_count(count);
        tracing::debug!(count, threshold = %self.state.threshold, "People count updated");

        self.evaluate()
    }

    /// Apply one polling sample (location first, then the count)
    pub fn apply_sample(&mut self, sample: &CrowdSample) -> Transition {
        if let Some(location) = sample.location {
            self.state.location = Some(location);
            self.view.set_location(location);
        }
        self.observe(sample.total_count)
    }

    pub fn set_network_status(&mut self, connected: bool) {
        self.state.network_connected = connected;
        self.view.set_network_status(connected);
    }

    /// Replace the threshold from user input
    ///
    /// Invalid input leaves the current threshold in place and the
    /// machine untouched.
    pub fn set_threshold(&mut self, input: &str) -> Result<Transition, ThresholdError> {
        let threshold: Threshold = input.parse()?;
        Ok(self.replace_threshold(threshold))
    }

    /// Replace the threshold and re-evaluate against the last count
    pub fn replace_threshold(&mut self, threshold: Threshold) -> Transition {
        self.state.threshold = threshold;
        tracing::info!("Threshold updated to: {} people", threshold);
        self.evaluate()
    }

    pub fn start_recording(&mut self) {
        if !self.state.recording {
            self.state.recording = true;
            self.view.set_recording(true);
        }
    }

    pub fn stop_recording(&mut self) {
        if self.state.recording {
            self.state.recording = false;
            self.view.set_recording(false);
        }
    }

    /// Flip recording; returns the new state
    pub fn toggle_recording(&mut self) -> bool {
        if self.state.recording {
            self.stop_recording();
        } else {
            self.start_recording();
        }
        self.state.recording
    }

    fn evaluate(&mut self) -> Transition {
        let exceeded = self.state.threshold.is_exceeded_by(self.state.count);

        match (self.state.phase, exceeded) {
            (AlertPhase::Normal, true) => {
                self.raise();
                Transition::Raised
            }
            (AlertPhase::Alerting, false) => {
                self.clear();
                Transition::Cleared
            }
            _ => Transition::Unchanged,
        }
    }

    fn raise(&mut self) {
        self.state.phase = AlertPhase::Alerting;
        self.alerts_fired += 1;

        let message = alert_message(self.state.count);
        tracing::warn!(
            count = self.state.count,
            threshold = %self.state.threshold,
            "Crowd threshold exceeded"
        );

        self.view.set_alert(true, &message);
        self.view.set_system_status(SystemStatus::Warning);

        // Auto-start recording if not already recording
        self.start_recording();
    }

    fn clear(&mut self) {
        self.state.phase = AlertPhase::Normal;
        tracing::info!(count = self.state.count, "Alert cleared - crowd below threshold");

        self.view.set_alert(false, "");
        self.view.set_system_status(SystemStatus::Normal);
    }
}

/// Operator-facing alert text
pub fn alert_message(count: u32) -> String {
    format!(
        "{} people detected. Consider crowd management measures.",
        count
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::display::{CapturingView, ViewEvent};

    fn monitor(threshold: u32) -> ThresholdMonitor<CapturingView> {
        ThresholdMonitor::new(Threshold::new(threshold).unwrap(), CapturingView::default())
    }

    #[test]
    fn test_scenario_edge_triggered() {
        let mut m = monitor(5);

        let phases: Vec<AlertPhase> = [3, 6, 6, 2]
            .into_iter()
            .map(|c| {
                m.observe(c);
                m.phase()
            })
            .collect();

        assert_eq!(
            phases,
            vec![
                AlertPhase::Normal,
                AlertPhase::Alerting,
                AlertPhase::Alerting,
                AlertPhase::Normal
            ]
        );
        assert_eq!(m.alerts_fired(), 1);
        assert_eq!(
            m.view().alerts(),
            vec![
                (true, alert_message(6)),
                (false, String::new())
            ]
        );
        assert_eq!(m.view().counts(), vec![3, 6, 6, 2]);
    }

    #[test]
    fn test_alert_state_matches_comparison() {
        for threshold in 1..=8 {
            let mut m = monitor(threshold);
            for count in [0, 1, 3, 7, 8, 9, 2, 12, 12, 0] {
                m.observe(count);
                assert_eq!(
                    m.is_alert_active(),
                    count > threshold,
                    "count {} threshold {}",
                    count,
                    threshold
                );
            }
        }
    }

    #[test]
    fn test_fires_once_per_crossing() {
        let mut m = monitor(5);
        let transitions: Vec<Transition> =
            [6, 7, 8, 5, 9, 9].into_iter().map(|c| m.observe(c)).collect();

        assert_eq!(
            transitions,
            vec![
                Transition::Raised,
                Transition::Unchanged,
                Transition::Unchanged,
                Transition::Cleared,
                Transition::Raised,
                Transition::Unchanged
            ]
        );
        assert_eq!(m.alerts_fired(), 2);
    }

    #[test]
    fn test_equal_to_threshold_is_normal() {
        let mut m = monitor(5);
        assert_eq!(m.observe(5), Transition::Unchanged);
        assert!(!m.is_alert_active());
    }

    #[test]
    fn test_alert_starts_recording_once() {
        let mut m = monitor(2);
        m.observe(3);
        m.observe(1);
        m.observe(4);

        assert!(m.is_recording());
        let recordings = m
            .view()
            .events
            .iter()
            .filter(|e| matches!(e, ViewEvent::Recording { .. }))
            .count();
        assert_eq!(recordings, 1);
    }

    #[test]
    fn test_alert_keeps_manual_recording() {
        let mut m = monitor(2);
        m.start_recording();
        m.observe(10);

        assert!(m.is_recording());
        assert_eq!(
            m.view()
                .events
                .iter()
                .filter(|e| matches!(e, ViewEvent::Recording { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_clearing_alert_does_not_stop_recording() {
        let mut m = monitor(2);
        m.observe(3);
        m.observe(0);
        assert!(m.is_recording());
    }

    #[test]
    fn test_toggle_recording() {
        let mut m = monitor(5);
        assert!(m.toggle_recording());
        assert!(!m.toggle_recording());
        assert_eq!(
            m.view().events,
            vec![
                ViewEvent::Recording { recording: true },
                ViewEvent::Recording { recording: false }
            ]
        );
    }

    #[test]
    fn test_lowering_threshold_raises_immediately() {
        let mut m = monitor(10);
        m.observe(7);
        assert!(!m.is_alert_active());

        assert_eq!(m.set_threshold("6"), Ok(Transition::Raised));
        assert!(m.is_alert_active());
        assert_eq!(m.view().alerts(), vec![(true, alert_message(7))]);
    }

    #[test]
    fn test_raising_threshold_clears_immediately() {
        let mut m = monitor(3);
        m.observe(7);
        assert_eq!(m.set_threshold("20"), Ok(Transition::Cleared));
        assert!(!m.is_alert_active());
    }

    #[test]
    fn test_invalid_threshold_keeps_previous() {
        let mut m = monitor(5);
        m.observe(6);

        for bad in ["0", "-1", "abc", ""] {
            assert!(m.set_threshold(bad).is_err());
            assert_eq!(m.threshold().get(), 5);
            assert!(m.is_alert_active());
        }
        assert_eq!(m.alerts_fired(), 1);
    }

    #[test]
    fn test_apply_sample_updates_location() {
        let mut m = monitor(5);
        let location = Location {
            latitude: 1.5,
            longitude: 2.5,
        };

        m.apply_sample(&CrowdSample {
            total_count: 13,
            location: Some(location),
            synthetic: false,
        });
        // Synthetic samples carry no location; the last one is kept
        m.apply_sample(&CrowdSample::synthetic(4));

        let snapshot = m.snapshot();
        assert_eq!(snapshot.count, 4);
        assert_eq!(snapshot.location, Some(location));
        assert_eq!(m.view().counts(), vec![13, 4]);
        assert_eq!(
            m.view().events[0],
            ViewEvent::Location {
                latitude: 1.5,
                longitude: 2.5
            }
        );
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut m = monitor(5);
        m.set_network_status(true);
        m.observe(9);

        let json = serde_json::to_value(m.snapshot()).unwrap();
        assert_eq!(json["count"], 9);
        assert_eq!(json["threshold"], 5);
        assert_eq!(json["phase"], "alerting");
        assert_eq!(json["alert_active"], true);
        assert_eq!(json["recording"], true);
        assert_eq!(json["network_connected"], true);
    }
}
