//! Brush system: turns the cursor position and brush settings into a sparse
//! per-cell influence map.
//!
//! Footprints:
//! - circular falloff brushes (Linear, Smooth, Spherical, Tip)
//! - alpha brushes that modulate the Smooth falloff by a grayscale texture,
//!   either tiled in field space (pattern) or stamped along the stroke (stamp)
//! - whole tiles around the cursor (Component)
//! - the transfer gizmo's rectangle (Gizmo)

use std::collections::BTreeMap;
use std::time::Instant;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::backend::{TerrainBackend, TileCoord};
use crate::falloff::{smoothstep, FalloffLaw};
use crate::field::{lerp, FieldCoord, FieldRect};
use crate::gizmo::Gizmo;
use crate::selection::SelectionState;

/// Brush variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrushKind {
    Linear,
    #[default]
    Smooth,
    Spherical,
    Tip,
    AlphaPattern,
    AlphaStamp,
    Component,
    Gizmo,
}

impl BrushKind {
    fn falloff_law(self) -> FalloffLaw {
        match self {
            BrushKind::Linear => FalloffLaw::Linear,
            BrushKind::Spherical => FalloffLaw::Spherical,
            BrushKind::Tip => FalloffLaw::Tip,
            _ => FalloffLaw::Smooth,
        }
    }
}

/// Current phase of brush operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BrushPhase {
    #[default]
    Idle,
    Stroking,
}

/// Grayscale texture used by the alpha brushes.
#[derive(Clone, Debug, PartialEq)]
pub struct AlphaTexture {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl AlphaTexture {
    /// `None` unless `data` holds exactly `width * height` texels.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 || data.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn texel(&self, x: i64, y: i64) -> f32 {
        let x = x.rem_euclid(self.width as i64) as usize;
        let y = y.rem_euclid(self.height as i64) as usize;
        self.data[y * self.width + x] as f32 / 255.0
    }

    /// Bilinear sample in texel units, wrapping at the edges.
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor() as i64;
        let y0 = y.floor() as i64;
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;
        lerp(
            lerp(self.texel(x0, y0), self.texel(x0 + 1, y0), fx),
            lerp(self.texel(x0, y0 + 1), self.texel(x0 + 1, y0 + 1), fx),
            fy,
        )
    }
}

/// Brush settings resolved for one apply.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrushParams {
    /// Outer radius in world units.
    pub radius: f32,
    /// Fraction of the radius given to the falloff band.
    pub falloff: f32,
    /// World units per cell.
    pub scale_xy: f32,
    pub alpha_scale: f32,
    /// Pattern rotation in degrees.
    pub alpha_rotation: f32,
    /// Pattern pan in texture widths.
    pub alpha_pan: Vec2,
    /// Tiles per side for the Component brush.
    pub component_size: i32,
    /// Soften the gizmo rectangle's edges.
    pub smooth_gizmo: bool,
}

impl Default for BrushParams {
    fn default() -> Self {
        Self {
            radius: 8.0,
            falloff: 0.5,
            scale_xy: 1.0,
            alpha_scale: 0.5,
            alpha_rotation: 0.0,
            alpha_pan: Vec2::ZERO,
            component_size: 1,
            smooth_gizmo: false,
        }
    }
}

impl BrushParams {
    /// Inner (full-strength) radius in cells.
    pub fn inner_radius(&self) -> f32 {
        (1.0 - self.falloff) * self.radius / self.scale_xy
    }

    /// Falloff band width in cells.
    pub fn falloff_width(&self) -> f32 {
        self.falloff * self.radius / self.scale_xy
    }
}

/// Selection masking applied on top of the brush footprint.
#[derive(Clone, Copy, Debug)]
pub struct BrushMask<'a> {
    pub selection: &'a SelectionState,
    pub negative: bool,
}

/// Everything outside the brush that an apply reads.
pub struct BrushContext<'a> {
    pub params: BrushParams,
    pub backend: &'a dyn TerrainBackend,
    pub gizmo: &'a Gizmo,
    pub mask: Option<BrushMask<'a>>,
}

/// Sparse influence map plus its bounding rectangle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BrushInfluence {
    cells: BTreeMap<FieldCoord, f32>,
    rect: FieldRect,
}

impl BrushInfluence {
    pub fn new(rect: FieldRect) -> Self {
        Self {
            cells: BTreeMap::new(),
            rect,
        }
    }

    /// Record a cell; zero influence is not stored.
    pub fn insert(&mut self, coord: FieldCoord, value: f32) {
        if value > 0.0 {
            self.cells.insert(coord, value.min(1.0));
        } else {
            self.cells.remove(&coord);
        }
    }

    pub fn get(&self, coord: FieldCoord) -> f32 {
        self.cells.get(&coord).copied().unwrap_or(0.0)
    }

    /// Cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldCoord, f32)> + '_ {
        self.cells.iter().map(|(c, v)| (*c, *v))
    }

    pub fn rect(&self) -> FieldRect {
        self.rect
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Brush state machine
#[derive(Clone, Debug)]
pub struct Brush {
    pub kind: BrushKind,
    phase: BrushPhase,
    last_position: Vec2,
    alpha: Option<AlphaTexture>,
    /// Stamp heading: position the heading was last measured from.
    heading_anchor: Option<Vec2>,
    heading: f32,
    last_sample_time: f64,
    clock: Instant,
}

impl Default for Brush {
    fn default() -> Self {
        Self::new(BrushKind::default())
    }
}

impl Brush {
    pub fn new(kind: BrushKind) -> Self {
        Self {
            kind,
            phase: BrushPhase::Idle,
            last_position: Vec2::ZERO,
            alpha: None,
            heading_anchor: None,
            heading: 0.0,
            last_sample_time: 0.0,
            clock: Instant::now(),
        }
    }

    pub fn phase(&self) -> BrushPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != BrushPhase::Idle
    }

    pub fn last_position(&self) -> Vec2 {
        self.last_position
    }

    /// Stamp heading in radians.
    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn set_alpha_texture(&mut self, texture: Option<AlphaTexture>) {
        self.alpha = texture;
    }

    pub fn alpha_texture(&self) -> Option<&AlphaTexture> {
        self.alpha.as_ref()
    }

    fn now(&self) -> f64 {
        self.clock.elapsed().as_secs_f64()
    }

    pub fn begin_stroke(&mut self, x: f32, y: f32) {
        self.phase = BrushPhase::Stroking;
        self.last_position = Vec2::new(x, y);
        self.heading_anchor = None;
    }

    pub fn mouse_move(&mut self, x: f32, y: f32) {
        let now = self.now();
        self.mouse_move_at(x, y, now);
    }

    /// Cursor update with an explicit timestamp in seconds.
    pub fn mouse_move_at(&mut self, x: f32, y: f32, time: f64) {
        self.last_position = Vec2::new(x, y);
        if self.kind != BrushKind::AlphaStamp {
            return;
        }
        let Some(anchor) = self.heading_anchor else {
            return;
        };
        // Ignore jitter below half a cell.
        let delta = self.last_position - anchor;
        if delta.length_squared() < 0.25 {
            return;
        }
        let dir = delta.normalize_or_zero();
        let dt = (time - self.last_sample_time) as f32;
        let target = (-dir.y).atan2(dir.x);
        // Settles over roughly 100ms.
        self.heading = lerp(self.heading, target, (10.0 * dt).clamp(0.0, 1.0));
        self.last_sample_time = time;
        self.heading_anchor = Some(self.last_position);
    }

    pub fn end_stroke(&mut self) {
        self.phase = BrushPhase::Idle;
    }

    /// Diameter of the affected area in cells, for cursor previews.
    pub fn extent(&self, params: &BrushParams, tile_size: i32) -> f32 {
        match self.kind {
            BrushKind::Component => (params.component_size.max(1) * tile_size) as f32,
            _ => 2.0 * params.radius / params.scale_xy,
        }
    }

    /// Influence for the current cursor position, `None` when nothing is covered.
    pub fn apply(&mut self, ctx: &BrushContext) -> Option<BrushInfluence> {
        let influence = match self.kind {
            BrushKind::Linear | BrushKind::Smooth | BrushKind::Spherical | BrushKind::Tip => {
                self.apply_circle(ctx)
            }
            BrushKind::AlphaPattern => self.apply_pattern(ctx),
            BrushKind::AlphaStamp => self.apply_stamp(ctx),
            BrushKind::Component => self.apply_component(ctx),
            BrushKind::Gizmo => self.apply_gizmo(ctx),
        };
        influence.filter(|inf| !inf.rect.is_empty())
    }

    fn circle_rect(&self, reach: f32) -> FieldRect {
        let p = self.last_position;
        FieldRect::new(
            (p.x - reach).floor() as i32,
            (p.y - reach).floor() as i32,
            (p.x + reach).ceil() as i32,
            (p.y + reach).ceil() as i32,
        )
    }

    fn masked(ctx: &BrushContext, coord: FieldCoord, value: f32) -> f32 {
        match ctx.mask {
            Some(mask) => value * mask.selection.mask_factor(coord, mask.negative),
            None => value,
        }
    }

    fn apply_circle(&self, ctx: &BrushContext) -> Option<BrushInfluence> {
        let radius = ctx.params.inner_radius();
        let falloff = ctx.params.falloff_width();
        let rect = self.circle_rect(radius + falloff);
        let law = self.kind.falloff_law();

        let mut out = BrushInfluence::new(rect);
        let mut has_output = false;
        for coord in rect.iter() {
            let dist = self.last_position.distance(Vec2::new(coord.x as f32, coord.y as f32));
            let amount = law.evaluate(dist, radius, falloff);
            if amount > 0.0 {
                out.insert(coord, Self::masked(ctx, coord, amount));
                has_output = true;
            }
        }
        // A brush smaller than one cell still touches the cell under the cursor.
        if !has_output {
            let p = self.last_position;
            let cell = FieldCoord::new(p.x.floor() as i32, p.y.floor() as i32);
            out.insert(cell, Self::masked(ctx, cell, 1.0));
        }
        Some(out)
    }

    fn apply_pattern(&self, ctx: &BrushContext) -> Option<BrushInfluence> {
        let params = &ctx.params;
        let radius = params.inner_radius();
        let falloff = params.falloff_width();
        let rect = self.circle_rect(radius + falloff);
        let angle = params.alpha_rotation.to_radians();
        let (sin, cos) = angle.sin_cos();
        let scale = if params.alpha_scale > 0.0 {
            params.alpha_scale
        } else {
            1.0
        };

        let mut out = BrushInfluence::new(rect);
        for coord in rect.iter() {
            let alpha = match &self.alpha {
                Some(tex) => {
                    let (w, h) = (tex.width as f32, tex.height as f32);
                    let sx = coord.x as f32 / scale + w * params.alpha_pan.x;
                    let sy = coord.y as f32 / scale + h * params.alpha_pan.y;
                    let u = (sx * cos - sy * sin).rem_euclid(w);
                    let v = (sy * cos + sx * sin).rem_euclid(h);
                    tex.sample(u, v)
                }
                None => 1.0,
            };
            let dist = self.last_position.distance(Vec2::new(coord.x as f32, coord.y as f32));
            let amount = FalloffLaw::Smooth.evaluate(dist, radius, falloff) * alpha;
            if amount > 0.0 {
                out.insert(coord, Self::masked(ctx, coord, amount));
            }
        }
        Some(out)
    }

    fn apply_stamp(&mut self, ctx: &BrushContext) -> Option<BrushInfluence> {
        let p = self.last_position;
        if self.heading_anchor.is_none() {
            // First apply of a stroke only primes the heading.
            self.heading_anchor = Some(p);
            self.heading = 0.0;
            self.last_sample_time = self.now();
            return Some(BrushInfluence::new(FieldRect::new(
                p.x.floor() as i32,
                p.y.floor() as i32,
                p.x.ceil() as i32,
                p.y.ceil() as i32,
            )));
        }

        let radius = ctx.params.radius / ctx.params.scale_xy;
        let rect = self.circle_rect(radius);
        let mut out = BrushInfluence::new(rect);
        let Some(tex) = &self.alpha else {
            for coord in rect.iter() {
                let dist = p.distance(Vec2::new(coord.x as f32, coord.y as f32));
                if dist <= radius {
                    out.insert(coord, Self::masked(ctx, coord, 1.0));
                }
            }
            return Some(out);
        };

        let (w, h) = (tex.width as f32, tex.height as f32);
        // Largest square that fits the circle.
        let max_size = 2.0 * (radius * radius / 2.0).sqrt();
        let stamp_scale = max_size / w.max(h);
        let (sin, cos) = self.heading.sin_cos();
        for coord in rect.iter() {
            let lx = (coord.x as f32 - p.x) / stamp_scale;
            let ly = (coord.y as f32 - p.y) / stamp_scale;
            let sx = lx * cos - ly * sin + w * 0.5;
            let sy = ly * cos + lx * sin + h * 0.5;
            if sx >= 0.0 && sx < w && sy >= 0.0 && sy < h {
                let alpha = tex.sample(sx, sy);
                if alpha > 0.0 {
                    out.insert(coord, Self::masked(ctx, coord, alpha));
                }
            }
        }
        Some(out)
    }

    /// Tiles selected by the Component brush around the cursor.
    pub fn component_tiles(&self, ctx: &BrushContext) -> Vec<TileCoord> {
        let tile_size = ctx.backend.tile_size();
        let cursor = FieldCoord::new(
            self.last_position.x.round() as i32,
            self.last_position.y.round() as i32,
        );
        let center = TileCoord::containing(cursor, tile_size);
        let size = (ctx.params.component_size - 1).max(0);
        let lo = size >> 1;
        let hi = (size >> 1) + (size % 2);
        let query = FieldRect::new(
            (center.x - lo) * tile_size,
            (center.y - lo) * tile_size,
            (center.x + hi + 1) * tile_size - 1,
            (center.y + hi + 1) * tile_size - 1,
        );
        ctx.backend.tiles_in_rect(query)
    }

    fn apply_component(&self, ctx: &BrushContext) -> Option<BrushInfluence> {
        let tile_size = ctx.backend.tile_size();
        let rect = self
            .component_tiles(ctx)
            .iter()
            .fold(FieldRect::EMPTY, |acc, t| acc.union(&t.cell_rect(tile_size)));
        if rect.is_empty() {
            return None;
        }
        let mut out = BrushInfluence::new(rect);
        for coord in rect.iter() {
            if ctx.backend.has_cell(coord) {
                out.insert(coord, Self::masked(ctx, coord, 1.0));
            }
        }
        Some(out)
    }

    fn apply_gizmo(&self, ctx: &BrushContext) -> Option<BrushInfluence> {
        Some(gizmo_influence(ctx))
    }
}

/// Influence of the gizmo rectangle, independent of the cursor.
pub fn gizmo_influence(ctx: &BrushContext) -> BrushInfluence {
    let params = &ctx.params;
    let gizmo = ctx.gizmo;
    let rect = gizmo.field_rect(params.scale_xy);
    let size = gizmo.footprint_size(params.scale_xy);
    let (w, h) = (size.x, size.y);
    let half_w = w * 0.5;
    let half_h = h * 0.5;

    let mut out = BrushInfluence::new(rect);
    for coord in rect.iter() {
        let local = gizmo.footprint_local(
            Vec2::new(coord.x as f32, coord.y as f32),
            params.scale_xy,
        );
        if local.x < 0.0 || local.x > w || local.y < 0.0 || local.y > h {
            continue;
        }
        let mut amount = 1.0;
        if params.smooth_gizmo && h > 0.0 {
            // Square-ish falloff measured in a frame where the rectangle is square.
            let t = Vec2::new((local.x - half_w).abs(), (local.y - half_h).abs() * (w / h));
            let falloff_radius = half_w * params.falloff;
            let square_radius = half_w - falloff_radius;
            let len = t.length();
            let ratio = if len > square_radius && len > 0.0 {
                let cos = t.x / len;
                let sin = t.y / len;
                let rx = if falloff_radius > 0.0 {
                    1.0 - ((t.x - cos * square_radius) / falloff_radius).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                let ry = if falloff_radius > 0.0 {
                    1.0 - ((t.y - sin * square_radius) / falloff_radius).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                rx * ry
            } else {
                1.0
            };
            amount = smoothstep(ratio);
        }
        if amount > 0.0 {
            out.insert(coord, Brush::masked(ctx, coord, amount));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::HEIGHT_NEUTRAL;
    use crate::storage::TerrainStore;

    fn params(radius: f32, falloff: f32) -> BrushParams {
        BrushParams {
            radius,
            falloff,
            ..Default::default()
        }
    }

    fn apply(brush: &mut Brush, params: BrushParams, store: &TerrainStore) -> Option<BrushInfluence> {
        let gizmo = Gizmo::default();
        let ctx = BrushContext {
            params,
            backend: store,
            gizmo: &gizmo,
            mask: None,
        };
        brush.apply(&ctx)
    }

    #[test]
    fn test_brush_default() {
        let brush = Brush::default();
        assert_eq!(brush.kind, BrushKind::Smooth);
        assert_eq!(brush.phase(), BrushPhase::Idle);
        assert!(!brush.is_active());
    }

    #[test]
    fn test_stroke_lifecycle() {
        let mut brush = Brush::new(BrushKind::Linear);
        brush.begin_stroke(3.0, 4.0);
        assert!(brush.is_active());
        brush.mouse_move(5.0, 6.0);
        assert_eq!(brush.last_position(), Vec2::new(5.0, 6.0));
        brush.end_stroke();
        assert_eq!(brush.phase(), BrushPhase::Idle);
    }

    #[test]
    fn test_circle_rect_and_center() {
        let store = TerrainStore::flat(16, 1, 1, HEIGHT_NEUTRAL);
        let mut brush = Brush::new(BrushKind::Smooth);
        brush.begin_stroke(4.0, 4.0);
        let inf = apply(&mut brush, params(4.0, 0.5), &store).unwrap();
        assert_eq!(inf.rect(), FieldRect::new(0, 0, 8, 8));
        assert_eq!(inf.get(FieldCoord::new(4, 4)), 1.0);
        assert_eq!(inf.get(FieldCoord::new(0, 0)), 0.0);
        assert!(inf.get(FieldCoord::new(7, 4)) > 0.0);
        assert_eq!(inf.get(FieldCoord::new(8, 4)), 0.0, "d = r + f is exactly zero");
    }

    #[test]
    fn test_zero_cells_are_not_stored() {
        let store = TerrainStore::flat(16, 1, 1, 0);
        let mut brush = Brush::new(BrushKind::Linear);
        brush.begin_stroke(8.0, 8.0);
        let inf = apply(&mut brush, params(3.0, 0.5), &store).unwrap();
        assert!(inf.iter().all(|(_, v)| v > 0.0 && v <= 1.0));
        assert!(inf.len() < inf.rect().area());
    }

    #[test]
    fn test_tiny_brush_touches_cursor_cell() {
        let store = TerrainStore::flat(16, 1, 1, 0);
        let mut brush = Brush::new(BrushKind::Smooth);
        brush.begin_stroke(2.5, 2.5);
        let inf = apply(&mut brush, params(0.2, 0.0), &store).unwrap();
        assert_eq!(inf.len(), 1);
        assert_eq!(inf.get(FieldCoord::new(2, 2)), 1.0);
    }

    #[test]
    fn test_tiny_brush_respects_mask() {
        let store = TerrainStore::flat(16, 1, 1, 0);
        let gizmo = Gizmo::default();
        let mut selection = SelectionState::new();
        selection.set_region_value(FieldCoord::new(8, 8), 1.0);

        let mut brush = Brush::new(BrushKind::Smooth);
        brush.begin_stroke(2.5, 2.5);
        let ctx = BrushContext {
            params: params(0.2, 0.0),
            backend: &store,
            gizmo: &gizmo,
            mask: Some(BrushMask {
                selection: &selection,
                negative: false,
            }),
        };
        let inf = brush.apply(&ctx).unwrap();
        assert!(inf.is_empty(), "unselected cursor cell gets no influence");

        selection.set_region_value(FieldCoord::new(2, 2), 0.25);
        let ctx = BrushContext {
            params: params(0.2, 0.0),
            backend: &store,
            gizmo: &gizmo,
            mask: Some(BrushMask {
                selection: &selection,
                negative: false,
            }),
        };
        let inf = brush.apply(&ctx).unwrap();
        assert_eq!(inf.get(FieldCoord::new(2, 2)), 0.25);
    }

    #[test]
    fn test_mask_scales_influence() {
        let store = TerrainStore::flat(16, 1, 1, 0);
        let gizmo = Gizmo::default();
        let mut selection = SelectionState::new();
        selection.set_region_value(FieldCoord::new(5, 5), 0.5);

        let mut brush = Brush::new(BrushKind::Linear);
        brush.begin_stroke(5.0, 5.0);
        let ctx = BrushContext {
            params: params(2.0, 0.0),
            backend: &store,
            gizmo: &gizmo,
            mask: Some(BrushMask {
                selection: &selection,
                negative: false,
            }),
        };
        let inf = brush.apply(&ctx).unwrap();
        assert_eq!(inf.get(FieldCoord::new(5, 5)), 0.5);
        assert_eq!(inf.get(FieldCoord::new(6, 5)), 0.0, "unselected cells drop out");

        let ctx = BrushContext {
            mask: Some(BrushMask {
                selection: &selection,
                negative: true,
            }),
            ..ctx
        };
        let inf = brush.apply(&ctx).unwrap();
        assert_eq!(inf.get(FieldCoord::new(5, 5)), 0.5);
        assert_eq!(inf.get(FieldCoord::new(6, 5)), 1.0);
    }

    #[test]
    fn test_alpha_texture_wraps() {
        let tex = AlphaTexture::new(2, 1, vec![0, 255]).unwrap();
        assert_eq!(tex.sample(0.0, 0.0), 0.0);
        assert_eq!(tex.sample(1.0, 0.0), 1.0);
        assert!((tex.sample(1.5, 0.0) - 0.5).abs() < 1e-6, "blends back to texel 0");
        assert!(AlphaTexture::new(2, 2, vec![0; 3]).is_none());
    }

    #[test]
    fn test_pattern_modulates_falloff() {
        let store = TerrainStore::flat(32, 1, 1, 0);
        let mut brush = Brush::new(BrushKind::AlphaPattern);
        // Stripes: even columns black, odd columns white.
        brush.set_alpha_texture(AlphaTexture::new(2, 1, vec![0, 255]));
        brush.begin_stroke(10.0, 10.0);
        let mut p = params(3.0, 0.0);
        p.alpha_scale = 1.0;
        let inf = apply(&mut brush, p, &store).unwrap();
        assert_eq!(inf.get(FieldCoord::new(10, 10)), 0.0);
        assert_eq!(inf.get(FieldCoord::new(11, 10)), 1.0);
    }

    #[test]
    fn test_stamp_primes_then_stamps() {
        let store = TerrainStore::flat(32, 1, 1, 0);
        let mut brush = Brush::new(BrushKind::AlphaStamp);
        brush.set_alpha_texture(AlphaTexture::new(4, 4, vec![255; 16]));
        brush.begin_stroke(10.0, 10.0);

        let first = apply(&mut brush, params(4.0, 0.5), &store).unwrap();
        assert!(first.is_empty());
        assert_eq!(first.rect(), FieldRect::new(10, 10, 10, 10));

        let second = apply(&mut brush, params(4.0, 0.5), &store).unwrap();
        assert!(!second.is_empty());
        assert_eq!(second.get(FieldCoord::new(10, 10)), 1.0);
    }

    #[test]
    fn test_stamp_heading_follows_motion() {
        let store = TerrainStore::flat(32, 1, 1, 0);
        let mut brush = Brush::new(BrushKind::AlphaStamp);
        brush.begin_stroke(0.0, 0.0);
        apply(&mut brush, params(4.0, 0.5), &store);
        let t0 = brush.last_sample_time;

        brush.mouse_move_at(0.2, 0.0, t0 + 1.0);
        assert_eq!(brush.heading(), 0.0, "sub-cell motion is ignored");

        // Moving toward -y gives atan2(1, 0) = pi/2 once fully settled.
        brush.mouse_move_at(0.0, -2.0, t0 + 1.0);
        assert!((brush.heading() - std::f32::consts::FRAC_PI_2).abs() < 1e-5);

        // A quick follow-up only moves part of the way.
        brush.mouse_move_at(2.0, -2.0, t0 + 1.05);
        let h = brush.heading();
        assert!(h > 0.0 && h < std::f32::consts::FRAC_PI_2, "partial turn: {h}");
    }

    #[test]
    fn test_component_brush_covers_tiles() {
        let store = TerrainStore::flat(4, 3, 3, 0);
        let mut brush = Brush::new(BrushKind::Component);
        brush.begin_stroke(5.0, 5.0);
        let inf = apply(&mut brush, params(1.0, 0.0), &store).unwrap();
        assert_eq!(inf.rect(), FieldRect::new(4, 4, 7, 7));
        assert_eq!(inf.len(), 16);

        let mut p = params(1.0, 0.0);
        p.component_size = 2;
        let inf = apply(&mut brush, p, &store).unwrap();
        assert_eq!(inf.rect(), FieldRect::new(4, 4, 11, 11));
    }

    #[test]
    fn test_component_brush_off_field() {
        let store = TerrainStore::flat(4, 1, 1, 0);
        let mut brush = Brush::new(BrushKind::Component);
        brush.begin_stroke(40.0, 40.0);
        assert!(apply(&mut brush, params(1.0, 0.0), &store).is_none());
    }

    #[test]
    fn test_gizmo_brush_rectangle() {
        let store = TerrainStore::flat(32, 1, 1, 0);
        let gizmo = Gizmo::new(Vec2::new(10.0, 10.0), 6.0, 4.0);
        let mut brush = Brush::new(BrushKind::Gizmo);
        let ctx = BrushContext {
            params: params(1.0, 0.5),
            backend: &store,
            gizmo: &gizmo,
            mask: None,
        };
        let inf = brush.apply(&ctx).unwrap();
        assert_eq!(inf.rect(), FieldRect::new(7, 8, 13, 12));
        assert_eq!(inf.get(FieldCoord::new(10, 10)), 1.0);
        assert_eq!(inf.get(FieldCoord::new(8, 10)), 1.0);
        assert_eq!(inf.get(FieldCoord::new(13, 10)), 1.0);
        assert_eq!(inf.get(FieldCoord::new(7, 10)), 0.0, "footprint sits half a cell right");
        assert_eq!(inf.get(FieldCoord::new(10, 8)), 0.0);
    }

    #[test]
    fn test_smooth_gizmo_fades_edges() {
        let store = TerrainStore::flat(32, 1, 1, 0);
        let gizmo = Gizmo::new(Vec2::new(10.0, 10.0), 8.0, 8.0);
        let mut p = params(1.0, 0.5);
        p.smooth_gizmo = true;
        let ctx = BrushContext {
            params: p,
            backend: &store,
            gizmo: &gizmo,
            mask: None,
        };
        let inf = gizmo_influence(&ctx);
        let near_center = inf.get(FieldCoord::new(10, 10));
        let near_edge = inf.get(FieldCoord::new(13, 10));
        assert_eq!(near_center, 1.0);
        assert!(near_edge < near_center && near_edge > 0.0, "edge fades: {near_edge}");
    }
}
