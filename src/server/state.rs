//! Application State
//!
//! Latest reading per camera, shared by all handlers.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::poller::CameraReading;

/// Latest reading per camera, in first-report order
#[derive(Debug, Default)]
pub struct CameraRegistry {
    index: HashMap<String, usize>,
    entries: Vec<(String, CameraReading)>,
}

impl CameraRegistry {
    /// Store a reading; an existing camera keeps its position
    pub fn upsert(&mut self, camera_id: &str, reading: CameraReading) {
        match self.index.get(camera_id) {
            Some(&slot) => self.entries[slot].1 = reading,
            None => {
                self.index.insert(camera_id.to_string(), self.entries.len());
                self.entries.push((camera_id.to_string(), reading));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON object keyed by camera id
    pub fn to_json(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|(id, reading)| {
                let value = serde_json::json!({
                    "latitude": reading.latitude,
                    "longitude": reading.longitude,
                    "people_count": reading.people_count,
                });
                (id.clone(), value)
            })
            .collect()
    }
}

/// Shared application state for all handlers
pub struct AppState {
    pub cameras: RwLock<CameraRegistry>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            cameras: RwLock::new(CameraRegistry::default()),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
