//! Persistent selection of a field: a continuous 0..1 strength per cell and a
//! set of whole selected tiles. Survives across strokes.

use std::collections::{BTreeSet, HashMap};

use crate::backend::TileCoord;
use crate::field::FieldCoord;

#[derive(Clone, Debug, Default)]
pub struct SelectionState {
    region: HashMap<FieldCoord, f32>,
    tiles: BTreeSet<TileCoord>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection strength at a cell, `None` when unselected.
    pub fn region_value(&self, coord: FieldCoord) -> Option<f32> {
        self.region.get(&coord).copied()
    }

    /// Store a strength; values at or below zero remove the cell.
    pub fn set_region_value(&mut self, coord: FieldCoord, value: f32) {
        if value > 0.0 {
            self.region.insert(coord, value.min(1.0));
        } else {
            self.region.remove(&coord);
        }
    }

    pub fn has_region(&self) -> bool {
        !self.region.is_empty()
    }

    pub fn region_len(&self) -> usize {
        self.region.len()
    }

    /// Mask factor for brush influence.
    pub fn mask_factor(&self, coord: FieldCoord, negative: bool) -> f32 {
        let value = self.region_value(coord).unwrap_or(0.0);
        if negative {
            1.0 - value
        } else {
            value
        }
    }

    pub fn clear_region(&mut self) {
        self.region.clear();
    }

    pub fn selected_tiles(&self) -> impl Iterator<Item = &TileCoord> {
        self.tiles.iter()
    }

    pub fn is_tile_selected(&self, tile: TileCoord) -> bool {
        self.tiles.contains(&tile)
    }

    pub fn select_tiles(&mut self, tiles: impl IntoIterator<Item = TileCoord>) {
        self.tiles.extend(tiles);
    }

    pub fn deselect_tiles(&mut self, tiles: impl IntoIterator<Item = TileCoord>) {
        for tile in tiles {
            self.tiles.remove(&tile);
        }
    }

    pub fn clear_tiles(&mut self) {
        self.tiles.clear();
    }
}
