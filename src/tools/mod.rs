//! Per-tool transforms. Each tool owns the edit caches of one stroke and
//! turns a brush influence map into writes through them.

pub mod copy_paste;
pub mod erosion;
pub mod flatten;
pub mod hydraulic;
pub mod noise;
pub mod paint;
pub mod select;
pub mod smooth;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::brush::BrushInfluence;
use crate::field::FieldRect;
use crate::settings::ToolSettings;

pub use copy_paste::{CopyTool, PasteTool};
pub use erosion::ErosionTool;
pub use flatten::FlattenTool;
pub use hydraulic::HydraulicTool;
pub use noise::NoiseTool;
pub use paint::PaintTool;
pub use select::{SelectTool, VisibilityTool};
pub use smooth::SmoothTool;

/// Tool variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ToolKind {
    #[default]
    Paint,
    Smooth,
    Flatten,
    Noise,
    Erosion,
    HydraulicErosion,
    Select,
    Mask,
    Visibility,
    Copy,
    Paste,
}

impl ToolKind {
    pub const ALL: [ToolKind; 11] = [
        ToolKind::Paint,
        ToolKind::Smooth,
        ToolKind::Flatten,
        ToolKind::Noise,
        ToolKind::Erosion,
        ToolKind::HydraulicErosion,
        ToolKind::Select,
        ToolKind::Mask,
        ToolKind::Visibility,
        ToolKind::Copy,
        ToolKind::Paste,
    ];

    /// Transaction name for a stroke of this tool.
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Paint => "Paint",
            ToolKind::Smooth => "Smooth",
            ToolKind::Flatten => "Flatten",
            ToolKind::Noise => "Noise",
            ToolKind::Erosion => "Erosion",
            ToolKind::HydraulicErosion => "Hydraulic Erosion",
            ToolKind::Select => "Select",
            ToolKind::Mask => "Mask",
            ToolKind::Visibility => "Visibility",
            ToolKind::Copy => "Copy",
            ToolKind::Paste => "Paste",
        }
    }

    /// Selection tools edit the mask, so the mask never limits them.
    pub fn is_selection(self) -> bool {
        matches!(self, ToolKind::Select | ToolKind::Mask)
    }

    /// Tools that only touch the selection or visibility planes and so work
    /// on any target, including a weight layer the field lacks.
    pub fn edits_masks_only(self) -> bool {
        matches!(self, ToolKind::Select | ToolKind::Mask | ToolKind::Visibility)
    }

    pub fn is_gizmo_tool(self) -> bool {
        matches!(self, ToolKind::Copy | ToolKind::Paste)
    }
}

/// Inputs of one apply, shared by every tool.
pub struct ApplyParams<'a> {
    pub settings: &'a ToolSettings,
    pub influence: &'a BrushInfluence,
    /// Tablet pressure in [0, 1].
    pub pressure: f32,
    /// Shift held: lower instead of raise, deselect instead of select.
    pub invert: bool,
    /// Current brush position in cells.
    pub position: Vec2,
}

impl ApplyParams<'_> {
    /// Brush rectangle grown by one cell so neighbour reads stay inside the window.
    pub fn window(&self) -> FieldRect {
        self.influence.rect().expand(1)
    }

    pub fn strength(&self) -> f32 {
        self.settings.tool_strength * self.pressure
    }

    /// Scales noise amplitude down for brushes smaller than the full-value radius.
    pub fn brush_size_adjust(&self) -> f32 {
        let max_radius = self.settings.maximum_value_radius;
        if max_radius > 0.0 && self.settings.brush_radius < max_radius {
            self.settings.brush_radius / max_radius
        } else {
            1.0
        }
    }
}
