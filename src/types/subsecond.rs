//! Unit of the sub-second timestamp component

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unit of [`GazeRecord::capture_time_subsecond`](super::GazeRecord::capture_time_subsecond).
///
/// The wire carries the raw value. Producers and consumers in one deployment must
/// agree on the unit; observed deployments used both, so it is configuration and
/// nothing here converts between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubsecondUnit {
    /// Milliseconds, 0..1_000
    #[default]
    Millis,

    /// Nanoseconds, 0..1_000_000_000
    Nanos,
}

impl SubsecondUnit {
    /// Split a duration since the epoch into whole seconds and the sub-second part
    pub fn split(self, since_epoch: Duration) -> (u64, u32) {
        let subsecond = match self {
            SubsecondUnit::Millis => since_epoch.subsec_millis(),
            SubsecondUnit::Nanos => since_epoch.subsec_nanos(),
        };
        (since_epoch.as_secs(), subsecond)
    }

    /// Column label used by sinks
    pub fn label(self) -> &'static str {
        match self {
            SubsecondUnit::Millis => "Milliseconds",
            SubsecondUnit::Nanos => "Nanoseconds",
        }
    }
}
