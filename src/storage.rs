//! In-memory sparse terrain store.
//!
//! Cells live in square tiles that are allocated independently, so the field
//! can have holes and ragged edges. Each tile carries the height plane, one
//! plane per weight layer, and the selection and visibility masks. Writes
//! record the touched tiles per plane so a host can rebuild derived data.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use crate::backend::{FieldPlane, LayerInfo, TerrainBackend, TerrainScale, TileCoord};
use crate::field::{FieldCoord, FieldRect, HEIGHT_NEUTRAL};

/// Dense storage for one tile.
#[derive(Clone, Debug)]
struct Tile {
    heights: Vec<u16>,
    /// One plane per layer, same order as `TerrainStore::layers`.
    weights: Vec<Vec<u8>>,
    selection: Vec<u8>,
    visibility: Vec<u8>,
}

impl Tile {
    fn new(cells: usize, layer_count: usize, height: u16) -> Self {
        Self {
            heights: vec![height; cells],
            weights: vec![vec![0; cells]; layer_count],
            selection: vec![0; cells],
            visibility: vec![0; cells],
        }
    }
}

/// Sparse tiled terrain storage implementing [`TerrainBackend`].
#[derive(Clone, Debug)]
pub struct TerrainStore {
    tile_size: i32,
    scale: TerrainScale,
    layers: Vec<LayerInfo>,
    tiles: HashMap<TileCoord, Tile>,
    dirty: HashMap<FieldPlane, BTreeSet<TileCoord>>,
}

impl TerrainStore {
    pub fn new(tile_size: i32, scale: TerrainScale) -> Self {
        Self {
            tile_size: tile_size.max(1),
            scale,
            layers: Vec::new(),
            tiles: HashMap::new(),
            dirty: HashMap::new(),
        }
    }

    /// A `tiles_x` by `tiles_y` block of tiles starting at the origin, all at `height`.
    pub fn flat(tile_size: i32, tiles_x: i32, tiles_y: i32, height: u16) -> Self {
        let mut store = Self::new(tile_size, TerrainScale::default());
        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                store.add_tile(TileCoord::new(tx, ty), height);
            }
        }
        store
    }

    pub fn with_scale(mut self, scale: TerrainScale) -> Self {
        self.scale = scale;
        self
    }

    /// Wrap for sharing with an engine while keeping typed access.
    pub fn into_shared(self) -> Rc<RefCell<TerrainStore>> {
        Rc::new(RefCell::new(self))
    }

    pub fn add_tile(&mut self, coord: TileCoord, height: u16) {
        let cells = (self.tile_size * self.tile_size) as usize;
        let layer_count = self.layers.len();
        self.tiles
            .entry(coord)
            .or_insert_with(|| Tile::new(cells, layer_count, height));
    }

    pub fn remove_tile(&mut self, coord: TileCoord) -> bool {
        self.tiles.remove(&coord).is_some()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Register a weight layer; returns its index. Existing names are reused.
    pub fn add_layer(&mut self, info: LayerInfo) -> usize {
        if let Some(index) = self.layers.iter().position(|l| l.name == info.name) {
            self.layers[index] = info;
            return index;
        }
        let cells = (self.tile_size * self.tile_size) as usize;
        for tile in self.tiles.values_mut() {
            tile.weights.push(vec![0; cells]);
        }
        self.layers.push(info);
        self.layers.len() - 1
    }

    /// Set every stored height from a function of the cell.
    pub fn fill_heights(&mut self, mut f: impl FnMut(FieldCoord) -> u16) {
        let size = self.tile_size;
        for (coord, tile) in self.tiles.iter_mut() {
            for (i, cell) in coord.cell_rect(size).iter().enumerate() {
                tile.heights[i] = f(cell);
            }
        }
    }

    /// Tiles touched on `plane` since the last call, in coordinate order.
    pub fn take_dirty(&mut self, plane: FieldPlane) -> Vec<TileCoord> {
        self.dirty
            .remove(&plane)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default()
    }

    fn locate(&self, coord: FieldCoord) -> Option<(&Tile, usize)> {
        let tile_coord = TileCoord::containing(coord, self.tile_size);
        let tile = self.tiles.get(&tile_coord)?;
        Some((tile, self.local_index(coord)))
    }

    fn locate_mut(&mut self, coord: FieldCoord) -> Option<(&mut Tile, usize)> {
        let index = self.local_index(coord);
        let tile_coord = TileCoord::containing(coord, self.tile_size);
        let tile = self.tiles.get_mut(&tile_coord)?;
        Some((tile, index))
    }

    fn local_index(&self, coord: FieldCoord) -> usize {
        let lx = coord.x.rem_euclid(self.tile_size);
        let ly = coord.y.rem_euclid(self.tile_size);
        (ly * self.tile_size + lx) as usize
    }
}

impl TerrainBackend for TerrainStore {
    fn scale(&self) -> TerrainScale {
        self.scale
    }

    fn tile_size(&self) -> i32 {
        self.tile_size
    }

    fn layers(&self) -> Vec<LayerInfo> {
        self.layers.clone()
    }

    fn layer_index(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|layer| layer.name == name)
    }

    fn has_cell(&self, coord: FieldCoord) -> bool {
        self.locate(coord).is_some()
    }

    fn height(&self, coord: FieldCoord) -> Option<u16> {
        self.locate(coord).map(|(tile, i)| tile.heights[i])
    }

    fn set_height(&mut self, coord: FieldCoord, value: u16) {
        if let Some((tile, i)) = self.locate_mut(coord) {
            tile.heights[i] = value;
        }
    }

    fn weight(&self, layer: usize, coord: FieldCoord) -> Option<u8> {
        let (tile, i) = self.locate(coord)?;
        tile.weights.get(layer).map(|plane| plane[i])
    }

    fn set_weight(&mut self, layer: usize, coord: FieldCoord, value: u8, blend: bool) {
        if layer >= self.layers.len() {
            return;
        }
        let blended: Vec<bool> = self.layers.iter().map(|l| !l.no_weight_blend).collect();
        let Some((tile, i)) = self.locate_mut(coord) else {
            return;
        };
        tile.weights[layer][i] = value;
        if !blend || !blended[layer] {
            return;
        }

        // Rescale the other blended layers so the cell sums to 255.
        let others: Vec<usize> = (0..blended.len())
            .filter(|&l| l != layer && blended[l] && tile.weights[l][i] > 0)
            .collect();
        let other_sum: u32 = others.iter().map(|&l| tile.weights[l][i] as u32).sum();
        if other_sum == 0 {
            return;
        }
        let remaining = 255 - value as u32;
        let mut assigned = 0u32;
        for (n, &l) in others.iter().enumerate() {
            let scaled = if n + 1 == others.len() {
                remaining.saturating_sub(assigned)
            } else {
                let share = tile.weights[l][i] as u32 * remaining;
                ((share + other_sum / 2) / other_sum).min(remaining - assigned)
            };
            assigned += scaled;
            tile.weights[l][i] = scaled as u8;
        }
    }

    fn weights(&self, coord: FieldCoord) -> Option<Vec<u8>> {
        let (tile, i) = self.locate(coord)?;
        Some(tile.weights.iter().map(|plane| plane[i]).collect())
    }

    fn set_weights(&mut self, coord: FieldCoord, values: &[u8]) {
        if let Some((tile, i)) = self.locate_mut(coord) {
            for (plane, &value) in tile.weights.iter_mut().zip(values) {
                plane[i] = value;
            }
        }
    }

    fn selection_mask(&self, coord: FieldCoord) -> Option<u8> {
        self.locate(coord).map(|(tile, i)| tile.selection[i])
    }

    fn set_selection_mask(&mut self, coord: FieldCoord, value: u8) {
        if let Some((tile, i)) = self.locate_mut(coord) {
            tile.selection[i] = value;
        }
    }

    fn visibility(&self, coord: FieldCoord) -> Option<u8> {
        self.locate(coord).map(|(tile, i)| tile.visibility[i])
    }

    fn set_visibility(&mut self, coord: FieldCoord, value: u8) {
        if let Some((tile, i)) = self.locate_mut(coord) {
            tile.visibility[i] = value;
        }
    }

    fn tiles_in_rect(&self, rect: FieldRect) -> Vec<TileCoord> {
        if rect.is_empty() {
            return Vec::new();
        }
        let min = TileCoord::containing(FieldCoord::new(rect.x1, rect.y1), self.tile_size);
        let max = TileCoord::containing(FieldCoord::new(rect.x2, rect.y2), self.tile_size);
        let mut found = Vec::new();
        for ty in min.y..=max.y {
            for tx in min.x..=max.x {
                let coord = TileCoord::new(tx, ty);
                if self.tiles.contains_key(&coord) {
                    found.push(coord);
                }
            }
        }
        found
    }

    fn notify_changed(&mut self, rect: FieldRect, plane: FieldPlane) {
        let touched = self.tiles_in_rect(rect);
        self.dirty.entry(plane).or_default().extend(touched);
    }
}

impl Default for TerrainStore {
    fn default() -> Self {
        Self::flat(64, 1, 1, HEIGHT_NEUTRAL)
    }
}
