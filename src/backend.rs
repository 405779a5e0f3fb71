//! Host-side storage interface consumed by the field accessors.
//!
//! Reads are sparse: a cell that the host does not store yields `None`.
//! Writes to cells the host does not store are ignored.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::field::{FieldCoord, FieldRect};

/// Integer coordinate of one fixed-size tile (component) of the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile containing `cell` for tiles of `tile_size` cells per side.
    pub fn containing(cell: FieldCoord, tile_size: i32) -> Self {
        Self::new(cell.x.div_euclid(tile_size), cell.y.div_euclid(tile_size))
    }

    /// Cells covered by this tile.
    pub fn cell_rect(&self, tile_size: i32) -> FieldRect {
        FieldRect::new(
            self.x * tile_size,
            self.y * tile_size,
            self.x * tile_size + tile_size - 1,
            self.y * tile_size + tile_size - 1,
        )
    }
}

/// World units per cell horizontally and the vertical draw scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainScale {
    pub xy: f32,
    pub z: f32,
}

impl Default for TerrainScale {
    fn default() -> Self {
        Self { xy: 1.0, z: 1.0 }
    }
}

/// Description of one material weight layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub name: String,
    /// Erosion resistance in [0, 1].
    pub hardness: f32,
    /// Excluded from the per-cell sum-to-255 normalisation.
    pub no_weight_blend: bool,
}

impl LayerInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hardness: 0.5,
            no_weight_blend: false,
        }
    }

    pub fn with_hardness(mut self, hardness: f32) -> Self {
        self.hardness = hardness.clamp(0.0, 1.0);
        self
    }

    pub fn without_blend(mut self) -> Self {
        self.no_weight_blend = true;
        self
    }
}

/// Which stored plane a write touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldPlane {
    Height,
    Weight,
    Selection,
    Visibility,
}

/// Storage behind a sculptable field.
pub trait TerrainBackend {
    fn scale(&self) -> TerrainScale;

    /// Cells per tile side.
    fn tile_size(&self) -> i32;

    /// Weight layers, in packed-weight order.
    fn layers(&self) -> Vec<LayerInfo>;

    fn layer_index(&self, name: &str) -> Option<usize> {
        self.layers().iter().position(|layer| layer.name == name)
    }

    fn has_cell(&self, coord: FieldCoord) -> bool;

    fn height(&self, coord: FieldCoord) -> Option<u16>;
    fn set_height(&mut self, coord: FieldCoord, value: u16);

    fn weight(&self, layer: usize, coord: FieldCoord) -> Option<u8>;
    /// Write one layer; `blend` renormalises the other blended layers.
    fn set_weight(&mut self, layer: usize, coord: FieldCoord, value: u8, blend: bool);

    /// All layer weights at a cell, in [`TerrainBackend::layers`] order.
    fn weights(&self, coord: FieldCoord) -> Option<Vec<u8>>;
    fn set_weights(&mut self, coord: FieldCoord, values: &[u8]);

    fn selection_mask(&self, coord: FieldCoord) -> Option<u8>;
    fn set_selection_mask(&mut self, coord: FieldCoord, value: u8);

    fn visibility(&self, coord: FieldCoord) -> Option<u8>;
    fn set_visibility(&mut self, coord: FieldCoord, value: u8);

    /// Tiles present in storage that overlap `rect`.
    fn tiles_in_rect(&self, rect: FieldRect) -> Vec<TileCoord>;

    /// Called once after each rectangular store.
    fn notify_changed(&mut self, rect: FieldRect, plane: FieldPlane);
}

/// A backend shared between the engine and the accessors of one stroke.
pub type SharedBackend = Rc<RefCell<dyn TerrainBackend>>;
