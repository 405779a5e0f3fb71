//! Named tool parameters and their key/value persistence.

use std::collections::BTreeMap;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::brush::{BrushKind, BrushParams};
use crate::debug_log::debug_log;
use crate::noise_field::NoiseMode;
use crate::tools::ToolKind;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings JSON invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("settings must be a JSON object")]
    NotAnObject,
}

/// Which side of the reference Flatten may move cells toward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlattenMode {
    #[default]
    Both,
    /// Only raise cells below the reference.
    Raise,
    /// Only lower cells above the reference.
    Lower,
}

/// Which direction a gizmo paste may move cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PasteMode {
    #[default]
    Both,
    Add,
    Sub,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub tool_kind: ToolKind,
    pub brush_kind: BrushKind,

    /// Outer brush radius in world units.
    pub brush_radius: f32,
    /// Falloff share of the radius, 0..1.
    pub brush_falloff: f32,
    pub tool_strength: f32,
    pub brush_component_size: i32,

    pub alpha_brush_scale: f32,
    pub alpha_brush_rotation: f32,
    pub alpha_brush_pan_u: f32,
    pub alpha_brush_pan_v: f32,

    // Paint
    pub weight_target_value: f32,
    pub use_weight_target_value: bool,
    pub use_clay_brush: bool,
    /// How fast a repainted weight's source drifts toward the live value.
    pub weight_relax_rate: f32,

    // Smooth
    pub detail_smooth: bool,
    pub detail_scale: f32,

    // Flatten
    pub flatten_mode: FlattenMode,
    pub use_slope_flatten: bool,
    pub pick_value_per_apply: bool,

    // Noise
    pub noise_mode: NoiseMode,
    pub noise_scale: f32,
    pub noise_seed: u32,
    /// Radius at which noise reaches full amplitude; smaller brushes are scaled down.
    pub maximum_value_radius: f32,

    // Erosion
    pub erode_thresh: i32,
    pub erode_iteration_num: i32,
    pub erode_surface_thickness: i32,
    pub erosion_noise_mode: NoiseMode,
    pub erosion_noise_scale: f32,

    // Hydraulic erosion
    pub rain_amount: i32,
    pub sediment_capacity: f32,
    pub h_erode_iteration_num: i32,
    pub rain_dist_mode: NoiseMode,
    pub rain_dist_scale: f32,
    pub h_erosion_detail_scale: f32,
    pub hydraulic_damping: f32,

    // Masking and gizmo
    pub use_selected_region: bool,
    pub use_negative_mask: bool,
    pub apply_to_all_targets: bool,
    pub paste_mode: PasteMode,
    pub paste_gizmo_region: bool,
    pub smooth_gizmo_brush: bool,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tool_kind: ToolKind::Paint,
            brush_kind: BrushKind::Smooth,
            brush_radius: 8.0,
            brush_falloff: 0.5,
            tool_strength: 0.3,
            brush_component_size: 1,
            alpha_brush_scale: 0.5,
            alpha_brush_rotation: 0.0,
            alpha_brush_pan_u: 0.0,
            alpha_brush_pan_v: 0.0,
            weight_target_value: 1.0,
            use_weight_target_value: false,
            use_clay_brush: false,
            weight_relax_rate: 0.05,
            detail_smooth: false,
            detail_scale: 0.3,
            flatten_mode: FlattenMode::Both,
            use_slope_flatten: false,
            pick_value_per_apply: false,
            noise_mode: NoiseMode::Both,
            noise_scale: 128.0,
            noise_seed: 0,
            maximum_value_radius: 10000.0,
            erode_thresh: 64,
            erode_iteration_num: 28,
            erode_surface_thickness: 256,
            erosion_noise_mode: NoiseMode::Sub,
            erosion_noise_scale: 60.0,
            rain_amount: 128,
            sediment_capacity: 0.3,
            h_erode_iteration_num: 75,
            rain_dist_mode: NoiseMode::Both,
            rain_dist_scale: 60.0,
            h_erosion_detail_scale: 0.01,
            hydraulic_damping: 0.1,
            use_selected_region: true,
            use_negative_mask: false,
            apply_to_all_targets: true,
            paste_mode: PasteMode::Both,
            paste_gizmo_region: false,
            smooth_gizmo_brush: false,
        }
    }
}

impl ToolSettings {
    /// Brush parameters for a field with `scale_xy` world units per cell.
    pub fn brush_params(&self, scale_xy: f32) -> BrushParams {
        BrushParams {
            radius: self.brush_radius.max(0.0),
            falloff: self.brush_falloff.clamp(0.0, 1.0),
            scale_xy: if scale_xy > 0.0 { scale_xy } else { 1.0 },
            alpha_scale: self.alpha_brush_scale,
            alpha_rotation: self.alpha_brush_rotation,
            alpha_pan: Vec2::new(self.alpha_brush_pan_u, self.alpha_brush_pan_v),
            component_size: self.brush_component_size.max(1),
            smooth_gizmo: self.smooth_gizmo_brush,
        }
    }

    /// Flat key/value view for a host configuration store.
    pub fn to_key_values(&self) -> BTreeMap<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        }
    }

    /// Rebuild from stored pairs; unknown keys are ignored, missing keys defaulted.
    pub fn from_key_values(pairs: &BTreeMap<String, Value>) -> Result<Self, SettingsError> {
        let Value::Object(mut merged) = serde_json::to_value(Self::default())? else {
            return Err(SettingsError::NotAnObject);
        };
        for (key, value) in pairs {
            if merged.contains_key(key) {
                merged.insert(key.clone(), value.clone());
            }
        }
        Ok(serde_json::from_value(Value::Object(merged))?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        let Value::Object(map) = value else {
            return Err(SettingsError::NotAnObject);
        };
        Self::from_key_values(&map.into_iter().collect())
    }

    /// Load, falling back to defaults when the file is missing or invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                debug_log(&format!(
                    "[settings] could not load {}: {}; using defaults",
                    path.display(),
                    e
                ));
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        debug_log(&format!("[settings] saved to {}", path.display()));
        Ok(())
    }
}
