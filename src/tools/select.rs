//! Region selection (Select and Mask share one transform) and visibility painting.

use crate::accessor::{SelectionMaskAccessor, VisibilityAccessor};
use crate::backend::{SharedBackend, TileCoord};
use crate::edit_cache::EditCache;
use crate::selection::SelectionState;

use super::ApplyParams;

/// Visibility value of a hidden cell.
pub const HIDDEN: u8 = 255;

pub struct SelectTool {
    mask: EditCache<SelectionMaskAccessor>,
}

impl SelectTool {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            mask: EditCache::new(SelectionMaskAccessor::new(backend)),
        }
    }

    /// Grow or shrink the soft region, or with `component_tiles` the tile
    /// selection. Returns whether a soft region remains.
    pub fn apply(
        &mut self,
        p: &ApplyParams,
        selection: &mut SelectionState,
        component_tiles: Option<Vec<TileCoord>>,
    ) -> bool {
        if let Some(tiles) = component_tiles {
            if p.invert {
                selection.deselect_tiles(tiles);
            } else {
                selection.select_tiles(tiles);
            }
            return selection.has_region();
        }

        let window = p.window();
        self.mask.cache_window(window);
        let mut plane: Vec<f32> = self
            .mask
            .read_window(window)
            .into_iter()
            .map(f32::from)
            .collect();

        for (coord, influence) in p.influence.iter() {
            let Some(i) = window.index_of(coord) else {
                continue;
            };
            if self.mask.value(coord).is_none() {
                continue;
            }
            let paint = influence * p.strength();
            let value = selection.region_value(coord).unwrap_or(0.0);
            let next = if p.invert {
                value - paint
            } else {
                (value + paint).min(1.0)
            };
            selection.set_region_value(coord, next);
            let stored = selection.region_value(coord).unwrap_or(0.0);
            plane[i] = (stored * 255.0).round();
        }

        let plane: Vec<u8> = plane.iter().map(|v| v.clamp(0.0, 255.0) as u8).collect();
        self.mask.write_window(window, &plane);
        selection.has_region()
    }
}

pub struct VisibilityTool {
    visibility: EditCache<VisibilityAccessor>,
}

impl VisibilityTool {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            visibility: EditCache::new(VisibilityAccessor::new(backend)),
        }
    }

    /// Hide brushed cells, or reveal them when inverted.
    pub fn apply(&mut self, p: &ApplyParams) {
        let window = p.window();
        self.visibility.cache_window(window);
        let mut data = self.visibility.read_window(window);
        let value = if p.invert { 0 } else { HIDDEN };
        for (coord, _) in p.influence.iter() {
            if let Some(i) = window.index_of(coord) {
                data[i] = value;
            }
        }
        self.visibility.write_window(window, &data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TerrainBackend;
    use crate::brush::BrushInfluence;
    use crate::field::FieldRect;
    use crate::settings::ToolSettings;
    use crate::storage::TerrainStore;
    use crate::tools::test_support::{coord, uniform_influence};
    use glam::Vec2;

    fn params<'a>(
        settings: &'a ToolSettings,
        influence: &'a BrushInfluence,
        invert: bool,
    ) -> ApplyParams<'a> {
        ApplyParams {
            settings,
            influence,
            pressure: 1.0,
            invert,
            position: Vec2::ZERO,
        }
    }

    #[test]
    fn test_select_accumulates_and_mirrors_mask() {
        let store = TerrainStore::flat(8, 1, 1, 0).into_shared();
        let mut tool = SelectTool::new(store.clone());
        let mut selection = SelectionState::new();
        let settings = ToolSettings {
            tool_strength: 0.4,
            ..Default::default()
        };
        let inf = uniform_influence(FieldRect::new(2, 2, 3, 3), 1.0);
        assert!(tool.apply(&params(&settings, &inf, false), &mut selection, None));
        assert!(tool.apply(&params(&settings, &inf, false), &mut selection, None));
        let v = selection.region_value(coord(2, 2)).unwrap();
        assert!((v - 0.8).abs() < 1e-5);
        assert_eq!(store.borrow().selection_mask(coord(2, 2)), Some(204));
        assert_eq!(store.borrow().selection_mask(coord(4, 4)), Some(0));

        tool.apply(&params(&settings, &inf, false), &mut selection, None);
        assert_eq!(selection.region_value(coord(2, 2)), Some(1.0), "clamped at 1");
    }

    #[test]
    fn test_deselect_removes_cells() {
        let store = TerrainStore::flat(8, 1, 1, 0).into_shared();
        let mut tool = SelectTool::new(store.clone());
        let mut selection = SelectionState::new();
        let settings = ToolSettings {
            tool_strength: 1.0,
            ..Default::default()
        };
        let inf = uniform_influence(FieldRect::new(2, 2, 3, 3), 1.0);
        tool.apply(&params(&settings, &inf, false), &mut selection, None);
        let remaining = tool.apply(&params(&settings, &inf, true), &mut selection, None);
        assert!(!remaining);
        assert_eq!(selection.region_value(coord(2, 2)), None);
        assert_eq!(store.borrow().selection_mask(coord(2, 2)), Some(0));
    }

    #[test]
    fn test_cells_off_field_are_skipped() {
        let store = TerrainStore::flat(8, 1, 1, 0).into_shared();
        let mut tool = SelectTool::new(store);
        let mut selection = SelectionState::new();
        let settings = ToolSettings::default();
        let inf = uniform_influence(FieldRect::new(-3, -3, -1, -1), 1.0);
        assert!(!tool.apply(&params(&settings, &inf, false), &mut selection, None));
    }

    #[test]
    fn test_component_tiles_union_and_difference() {
        let store = TerrainStore::flat(8, 2, 1, 0).into_shared();
        let mut tool = SelectTool::new(store);
        let mut selection = SelectionState::new();
        let settings = ToolSettings::default();
        let inf = BrushInfluence::new(FieldRect::new(0, 0, 7, 7));
        let tiles = vec![TileCoord::new(0, 0), TileCoord::new(1, 0)];
        tool.apply(&params(&settings, &inf, false), &mut selection, Some(tiles));
        assert!(selection.is_tile_selected(TileCoord::new(1, 0)));
        tool.apply(
            &params(&settings, &inf, true),
            &mut selection,
            Some(vec![TileCoord::new(1, 0)]),
        );
        assert!(selection.is_tile_selected(TileCoord::new(0, 0)));
        assert!(!selection.is_tile_selected(TileCoord::new(1, 0)));
    }

    #[test]
    fn test_visibility_hides_and_reveals() {
        let store = TerrainStore::flat(8, 1, 1, 0).into_shared();
        let mut tool = VisibilityTool::new(store.clone());
        let settings = ToolSettings::default();
        let inf = uniform_influence(FieldRect::new(1, 1, 2, 2), 0.3);
        tool.apply(&params(&settings, &inf, false));
        assert_eq!(store.borrow().visibility(coord(1, 1)), Some(HIDDEN));
        assert_eq!(store.borrow().visibility(coord(3, 3)), Some(0));
        tool.apply(&params(&settings, &inf, true));
        assert_eq!(store.borrow().visibility(coord(1, 1)), Some(0));
    }
}
