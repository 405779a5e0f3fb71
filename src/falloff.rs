//! Distance-to-influence laws for circular brushes.
//!
//! All laws return exactly 1 inside the inner radius, exactly 0 at and beyond
//! `radius + falloff`, and are non-increasing in between.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FalloffLaw {
    Linear,
    #[default]
    Smooth,
    Spherical,
    /// Inverse spherical: convex shoulder, sharp tip.
    Tip,
}

impl FalloffLaw {
    pub fn evaluate(self, distance: f32, radius: f32, falloff: f32) -> f32 {
        match self {
            FalloffLaw::Linear => linear(distance, radius, falloff),
            FalloffLaw::Smooth => smoothstep(linear(distance, radius, falloff)),
            FalloffLaw::Spherical => spherical(distance, radius, falloff),
            FalloffLaw::Tip => tip(distance, radius, falloff),
        }
    }
}

/// `y^2 (3 - 2y)`
#[inline]
pub fn smoothstep(y: f32) -> f32 {
    y * y * (3.0 - 2.0 * y)
}

fn linear(d: f32, r: f32, f: f32) -> f32 {
    if d <= r {
        1.0
    } else if f > 0.0 {
        (1.0 - (d - r) / f).max(0.0)
    } else {
        0.0
    }
}

fn spherical(d: f32, r: f32, f: f32) -> f32 {
    if d <= r {
        return 1.0;
    }
    if d > r + f || f <= 0.0 {
        return 0.0;
    }
    let y = (d - r) / f;
    (1.0 - y * y).max(0.0).sqrt()
}

fn tip(d: f32, r: f32, f: f32) -> f32 {
    if d <= r {
        return 1.0;
    }
    if d > r + f || f <= 0.0 {
        return 0.0;
    }
    let y = (f + r - d) / f;
    1.0 - (1.0 - y * y).max(0.0).sqrt()
}
