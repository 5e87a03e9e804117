//! Core types for gaze telemetry.
//!
//! - [`GazeRecord`] is one telemetry sample
//! - [`Batch`] is the ordered group of records carried by one frame
//! - [`SubsecondUnit`] names how a deployment interprets the sub-second timestamp
//!
//! ## Usage Example
//!
//! ```rust
//! use gazestream::types::{Batch, GazeRecord};
//!
//! let batch = Batch::single(GazeRecord {
//!     capture_time_seconds: 1000,
//!     capture_time_subsecond: 500,
//!     eye_id: true,
//!     confidence: 1.0,
//!     gaze_x: 0.25,
//!     gaze_y: 0.75,
//!     pupil_diameter: 42,
//!     ..Default::default()
//! });
//! assert_eq!(batch.len(), 1);
//! ```

mod batch;
mod record;
mod subsecond;

pub use batch::Batch;
pub use record::GazeRecord;
pub use subsecond::SubsecondUnit;
