//! Pure data transformations behind the dashboard.
//!
//! Nothing in here performs I/O; every function takes plain values and
//! returns plain values so the HTTP layer stays a thin wrapper.

pub mod cluster;
pub mod display;
pub mod format;
pub mod health;
pub mod series;
pub mod stats;

pub use cluster::{ClusterColor, SizeBucket, map_cluster_color};
pub use display::format_display_name;
pub use health::{HealthStatus, SensorHealth, compute_health, most_recent};
pub use series::{GapConfig, GapPolicy, Observation, SeriesPoint, build_series};
pub use stats::{AxisRange, SeriesStats, StatsDisplay, chart_range, compute_stats};
