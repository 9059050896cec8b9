//! Common utilities and types shared across minicoord

pub mod config;
pub mod error;
pub mod segment;
pub mod telemetry;
pub mod utils;

pub use config::CoordinatorConfig;
pub use error::{Error, Result};
pub use segment::{Segment, SegmentInterval};
pub use telemetry::init_tracing;
pub use utils::parse_duration;
