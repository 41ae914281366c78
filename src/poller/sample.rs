//! Crowd samples
//!
//! Per-camera readings as the backend reports them, and the aggregate
//! sample the monitor consumes.

use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Latest reading from a single camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraReading {
    #[serde(deserialize_with = "whole_count")]
    pub people_count: u32,
    pub latitude: f64,
    pub longitude: f64,
}

impl CameraReading {
    pub fn location(&self) -> Location {
        Location {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Accept any JSON number holding a whole, non-negative count (`4` or `4.0`)
fn whole_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;

    if value.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&value) {
        Ok(value as u32)
    } else {
        Err(de::Error::custom(format!(
            "people_count must be a whole number of people, got {}",
            value
        )))
    }
}

/// All camera readings from one poll, in the order the backend listed them
pub type CameraSnapshot = Vec<(String, CameraReading)>;

/// Reference location of the monitored area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// One polling result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrowdSample {
    pub total_count: u32,
    pub location: Option<Location>,
    /// Produced by a fallback strategy instead of the backend
    pub synthetic: bool,
}

impl CrowdSample {
    /// Sum all camera counts; the first camera provides the location
    pub fn from_readings<'a, I>(readings: I) -> Self
    where
        I: IntoIterator<Item = &'a CameraReading>,
    {
        let mut total_count: u32 = 0;
        let mut location = None;

        for reading in readings {
            total_count = total_count.saturating_add(reading.people_count);
            if location.is_none() {
                location = Some(reading.location());
            }
        }

        Self {
            total_count,
            location,
            synthetic: false,
        }
    }

    pub fn from_snapshot(snapshot: &CameraSnapshot) -> Self {
        Self::from_readings(snapshot.iter().map(|(_, reading)| reading))
    }

    pub fn synthetic(total_count: u32) -> Self {
        Self {
            total_count,
            location: None,
            synthetic: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(people_count: u32, latitude: f64, longitude: f64) -> CameraReading {
        CameraReading {
            people_count,
            latitude,
            longitude,
        }
    }

    #[test]
    fn test_sums_all_cameras() {
        let snapshot: CameraSnapshot = vec![
            ("camA".to_string(), reading(4, 12.9716, 77.5946)),
            ("camB".to_string(), reading(9, 13.0827, 80.2707)),
        ];

        let sample = CrowdSample::from_snapshot(&snapshot);
        assert_eq!(sample.total_count, 13);
        assert!(!sample.synthetic);
    }

    #[test]
    fn test_first_camera_location() {
        let snapshot: CameraSnapshot = vec![
            ("zeta".to_string(), reading(1, 1.0, 2.0)),
            ("alpha".to_string(), reading(1, 3.0, 4.0)),
        ];

        let sample = CrowdSample::from_snapshot(&snapshot);
        assert_eq!(
            sample.location,
            Some(Location {
                latitude: 1.0,
                longitude: 2.0
            })
        );
    }

    #[test]
    fn test_empty_snapshot() {
        let sample = CrowdSample::from_snapshot(&Vec::new());
        assert_eq!(sample.total_count, 0);
        assert_eq!(sample.location, None);
    }

    #[test]
    fn test_sum_saturates() {
        let readings = [reading(u32::MAX, 0.0, 0.0), reading(10, 0.0, 0.0)];
        assert_eq!(CrowdSample::from_readings(&readings).total_count, u32::MAX);
    }

    #[test]
    fn test_count_accepts_whole_numbers() {
        let parse = |count: &str| {
            serde_json::from_str::<CameraReading>(&format!(
                r#"{{"people_count": {}, "latitude": 1.5, "longitude": 2.5}}"#,
                count
            ))
        };

        assert_eq!(parse("4").unwrap().people_count, 4);
        assert_eq!(parse("4.0").unwrap().people_count, 4);
        assert_eq!(parse("0").unwrap().people_count, 0);

        assert!(parse("4.5").is_err());
        assert!(parse("-1").is_err());
        assert!(parse("1e12").is_err());
        assert!(parse("\"4\"").is_err());
    }

    #[test]
    fn test_location_display() {
        let location = Location {
            latitude: 12.971598,
            longitude: -77.594562,
        };
        assert_eq!(location.to_string(), "12.9716, -77.5946");
    }
}
