//! Marker-cluster color and size mapping.
//!
//! Cluster colors run from red (few members) to green (many members) on a
//! logarithmic scale normalized against the largest cluster seen so far in
//! the session, so colors stay comparable across clusters rendered at
//! different times.

use serde::Serialize;
use utoipa::ToSchema;

/// Color of a cluster with a single member.
pub const FEW_COLOR: [u8; 3] = [239, 68, 68];

/// Color of a cluster at or above the normalization maximum.
pub const MANY_COLOR: [u8; 3] = [34, 197, 94];

/// Lower bound for the normalization denominator.
pub const MIN_DENOMINATOR: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SizeBucket {
    Small,
    Medium,
    Large,
}

impl SizeBucket {
    #[must_use]
    pub fn for_count(count: usize) -> Self {
        if count > 100 {
            Self::Large
        } else if count > 10 {
            Self::Medium
        } else {
            Self::Small
        }
    }

    /// Icon edge length in pixels.
    #[must_use]
    pub fn icon_px(self) -> u32 {
        match self {
            Self::Small => 40,
            Self::Medium => 50,
            Self::Large => 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterColor {
    pub rgb: [u8; 3],
    pub bucket: SizeBucket,
    pub new_running_max: usize,
}

/// Log-scaled position of `count` between one member and `denominator`.
fn normalize(count: usize, denominator: usize) -> f64 {
    if count <= 1 {
        return 0.0;
    }
    ((count as f64).ln() / (denominator as f64).ln()).clamp(0.0, 1.0)
}

fn blend(few: u8, many: u8, t: f64) -> u8 {
    let few = f64::from(few);
    let many = f64::from(many);
    (few + (many - few) * t).round().clamp(0.0, 255.0) as u8
}

/// Map a cluster's member count to its color and size bucket.
///
/// The running maximum is raised to `count` first; the denominator never
/// drops below [`MIN_DENOMINATOR`] so small datasets do not saturate.
#[must_use]
pub fn map_cluster_color(count: usize, running_max: usize) -> ClusterColor {
    let new_running_max = running_max.max(count).max(1);
    let denominator = new_running_max.max(MIN_DENOMINATOR);
    let t = normalize(count, denominator);

    let rgb = [
        blend(FEW_COLOR[0], MANY_COLOR[0], t),
        blend(FEW_COLOR[1], MANY_COLOR[1], t),
        blend(FEW_COLOR[2], MANY_COLOR[2], t),
    ];

    ClusterColor {
        rgb,
        bucket: SizeBucket::for_count(count),
        new_running_max,
    }
}

/// CSS hex form of a color, e.g. `#ef4444`.
#[must_use]
pub fn hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}
