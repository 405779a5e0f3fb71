//! Sculpting engine: registered fields, the active tool and brush, and the
//! stroke lifecycle.
//!
//! A stroke is `begin_tool` -> any number of `mouse_move`/`apply_tool` ->
//! `end_tool`. Each stroke is bracketed by exactly one host transaction and
//! owns its tool's edit caches, which are dropped when the stroke ends.

use std::collections::{BTreeMap, HashMap};

use glam::Vec2;

use crate::backend::{SharedBackend, TerrainBackend};
use crate::brush::{gizmo_influence, Brush, BrushContext, BrushKind, BrushMask};
use crate::debug_log::debug_log;
use crate::gizmo::Gizmo;
use crate::selection::SelectionState;
use crate::settings::ToolSettings;
use crate::target::{open_target, EditTarget, FieldId};
use crate::tools::{
    ApplyParams, CopyTool, ErosionTool, FlattenTool, HydraulicTool, NoiseTool, PaintTool,
    PasteTool, SelectTool, SmoothTool, ToolKind, VisibilityTool,
};
use crate::transaction::TransactionHost;

/// Display hints for the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EditContext {
    /// The selection overlay should be drawn.
    pub mask_visible: bool,
    pub gizmo_visible: bool,
    /// A soft selection exists and masks non-selection tools.
    pub mask_enabled: bool,
}

/// Host ray cast from screen space onto the terrain.
pub trait HitTester {
    /// Field position under a screen point, `None` when nothing is hit.
    fn hit_test(&self, screen_x: f32, screen_y: f32) -> Option<Vec2>;
}

enum StrokeTool {
    Paint(PaintTool),
    Smooth(SmoothTool),
    Flatten(FlattenTool),
    Noise(NoiseTool),
    Erosion(ErosionTool),
    Hydraulic(HydraulicTool),
    Select(SelectTool),
    Visibility(VisibilityTool),
    Copy(CopyTool),
    Paste(PasteTool),
}

struct Stroke {
    kind: ToolKind,
    field: FieldId,
    backend: SharedBackend,
    tool: StrokeTool,
    /// Influence comes from the gizmo rectangle instead of the brush.
    gizmo_brush: bool,
}

impl Stroke {
    /// Copy, and Paste driven by the gizmo, only apply once per stroke.
    fn applies_on_move(&self) -> bool {
        match self.kind {
            ToolKind::Copy => false,
            ToolKind::Paste => !self.gizmo_brush,
            _ => true,
        }
    }
}

pub struct SculptEngine {
    fields: BTreeMap<FieldId, SharedBackend>,
    selections: HashMap<FieldId, SelectionState>,
    next_field: u32,
    settings: ToolSettings,
    brush: Brush,
    gizmo: Gizmo,
    context: EditContext,
    transactions: Box<dyn TransactionHost>,
    stroke: Option<Stroke>,
    pressure: f32,
    invert: bool,
    paint_distance: f32,
}

impl SculptEngine {
    pub fn new(settings: ToolSettings, transactions: Box<dyn TransactionHost>) -> Self {
        let brush = Brush::new(settings.brush_kind);
        let mut engine = Self {
            fields: BTreeMap::new(),
            selections: HashMap::new(),
            next_field: 0,
            settings,
            brush,
            gizmo: Gizmo::default(),
            context: EditContext::default(),
            transactions,
            stroke: None,
            pressure: 1.0,
            invert: false,
            paint_distance: 0.0,
        };
        engine.update_context(engine.settings.tool_kind);
        engine
    }

    pub fn register_field(&mut self, backend: SharedBackend) -> FieldId {
        let id = FieldId(self.next_field);
        self.next_field += 1;
        self.fields.insert(id, backend);
        debug_log(&format!("[engine] registered field {}", id.0));
        id
    }

    /// Forget a field; a stroke on it is ended first.
    pub fn remove_field(&mut self, id: FieldId) -> bool {
        if self.stroke.as_ref().is_some_and(|s| s.field == id) {
            self.end_tool();
        }
        self.selections.remove(&id);
        self.fields.remove(&id).is_some()
    }

    pub fn field(&self, id: FieldId) -> Option<&SharedBackend> {
        self.fields.get(&id)
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ToolSettings {
        &mut self.settings
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    pub fn brush_mut(&mut self) -> &mut Brush {
        &mut self.brush
    }

    pub fn gizmo(&self) -> &Gizmo {
        &self.gizmo
    }

    pub fn gizmo_mut(&mut self) -> &mut Gizmo {
        &mut self.gizmo
    }

    pub fn context(&self) -> EditContext {
        self.context
    }

    pub fn selection(&self, id: FieldId) -> Option<&SelectionState> {
        self.selections.get(&id)
    }

    pub fn selection_mut(&mut self, id: FieldId) -> &mut SelectionState {
        self.selections.entry(id).or_default()
    }

    pub fn active_tool(&self) -> ToolKind {
        self.settings.tool_kind
    }

    /// Switch tools; an open stroke is ended first.
    pub fn set_active_tool(&mut self, kind: ToolKind) {
        if self.stroke.is_some() {
            self.end_tool();
        }
        self.settings.tool_kind = kind;
        self.update_context(kind);
    }

    pub fn set_active_brush(&mut self, kind: BrushKind) {
        self.settings.brush_kind = kind;
        self.brush.kind = kind;
    }

    fn update_context(&mut self, kind: ToolKind) {
        self.context.gizmo_visible = kind.is_gizmo_tool();
        self.context.mask_visible = kind.is_selection();
    }

    pub fn set_pressure(&mut self, pressure: f32) {
        self.pressure = pressure.clamp(0.0, 1.0);
    }

    pub fn set_invert(&mut self, invert: bool) {
        self.invert = invert;
    }

    pub fn is_stroking(&self) -> bool {
        self.stroke.is_some()
    }

    /// Cursor distance travelled in the current or last stroke, in cells.
    pub fn paint_distance(&self) -> f32 {
        self.paint_distance
    }

    /// Start a stroke of the active tool on `target` at field position
    /// `(x, y)` and apply once. `false` when a stroke is already open, the
    /// field is unknown, or the target cannot be edited.
    pub fn begin_tool(&mut self, target: &EditTarget, x: f32, y: f32) -> bool {
        let kind = self.settings.tool_kind;
        if self.stroke.is_some() {
            debug_log(&format!("[stroke] {} refused: stroke already open", kind.name()));
            return false;
        }
        let Some(backend) = self.fields.get(&target.field).cloned() else {
            debug_log(&format!("[stroke] {} refused: unknown field {}", kind.name(), target.field.0));
            return false;
        };
        let mask_target;
        let resolved = if kind.edits_masks_only() {
            mask_target = EditTarget::heightmap(target.field);
            &mask_target
        } else {
            target
        };
        let Some(tool_target) = open_target(backend.clone(), resolved) else {
            debug_log(&format!(
                "[stroke] {} refused: field {} has no {:?} target {:?}",
                kind.name(),
                target.field.0,
                target.kind,
                target.layer
            ));
            return false;
        };

        let tool = match kind {
            ToolKind::Paint => StrokeTool::Paint(PaintTool::new(tool_target)),
            ToolKind::Smooth => StrokeTool::Smooth(SmoothTool::new(tool_target)),
            ToolKind::Flatten => StrokeTool::Flatten(FlattenTool::new(tool_target, Vec2::new(x, y))),
            ToolKind::Noise => StrokeTool::Noise(NoiseTool::new(tool_target)),
            ToolKind::Erosion => StrokeTool::Erosion(ErosionTool::new(backend.clone(), target.kind)),
            ToolKind::HydraulicErosion => StrokeTool::Hydraulic(HydraulicTool::new(backend.clone())),
            ToolKind::Select | ToolKind::Mask => StrokeTool::Select(SelectTool::new(backend.clone())),
            ToolKind::Visibility => StrokeTool::Visibility(VisibilityTool::new(backend.clone())),
            ToolKind::Copy => StrokeTool::Copy(CopyTool::new(backend.clone(), tool_target)),
            ToolKind::Paste => StrokeTool::Paste(PasteTool::new(backend.clone(), tool_target)),
        };
        let gizmo_brush = kind == ToolKind::Copy
            || (kind == ToolKind::Paste && self.settings.paste_gizmo_region)
            || self.brush.kind == BrushKind::Gizmo;

        self.transactions.begin_transaction(kind.name());
        self.brush.begin_stroke(x, y);
        self.paint_distance = 0.0;
        self.stroke = Some(Stroke {
            kind,
            field: target.field,
            backend,
            tool,
            gizmo_brush,
        });
        debug_log(&format!(
            "[stroke] begin {} on field {} at ({:.2}, {:.2})",
            kind.name(),
            target.field.0,
            x,
            y
        ));
        self.apply_tool();
        true
    }

    /// Apply the open stroke's tool at the current brush position.
    pub fn apply_tool(&mut self) {
        let Some(stroke) = self.stroke.as_mut() else {
            return;
        };
        let scale_xy = stroke.backend.borrow().scale().xy;
        let params = self.settings.brush_params(scale_xy);

        let (influence, component_tiles) = {
            let backend = stroke.backend.borrow();
            let masks = self.settings.use_selected_region
                && !stroke.kind.is_selection()
                && stroke.kind != ToolKind::Copy;
            let mask = self
                .selections
                .get(&stroke.field)
                .filter(|s| masks && s.has_region())
                .map(|selection| BrushMask {
                    selection,
                    negative: self.settings.use_negative_mask,
                });
            let ctx = BrushContext {
                params,
                backend: &*backend,
                gizmo: &self.gizmo,
                mask,
            };
            let influence = if stroke.gizmo_brush {
                Some(gizmo_influence(&ctx)).filter(|inf| !inf.rect().is_empty())
            } else {
                self.brush.apply(&ctx)
            };
            let tiles = (stroke.kind.is_selection() && self.brush.kind == BrushKind::Component)
                .then(|| self.brush.component_tiles(&ctx));
            (influence, tiles)
        };
        let Some(influence) = influence else {
            debug_log(&format!("[stroke] {} apply: brush covers nothing", stroke.kind.name()));
            return;
        };

        let p = ApplyParams {
            settings: &self.settings,
            influence: &influence,
            pressure: self.pressure,
            invert: self.invert,
            position: self.brush.last_position(),
        };
        match &mut stroke.tool {
            StrokeTool::Paint(tool) => tool.apply(&p),
            StrokeTool::Smooth(tool) => tool.apply(&p),
            StrokeTool::Flatten(tool) => tool.apply(&p),
            StrokeTool::Noise(tool) => tool.apply(&p),
            StrokeTool::Erosion(tool) => tool.apply(&p),
            StrokeTool::Hydraulic(tool) => tool.apply(&p),
            StrokeTool::Select(tool) => {
                let selection = self.selections.entry(stroke.field).or_default();
                self.context.mask_enabled = tool.apply(&p, selection, component_tiles);
            }
            StrokeTool::Visibility(tool) => tool.apply(&p),
            StrokeTool::Copy(tool) => {
                let selection = self.selections.get(&stroke.field);
                let copied = tool.apply(&p, &mut self.gizmo, selection, scale_xy);
                if !copied {
                    debug_log("[stroke] Copy captured nothing selected");
                }
            }
            StrokeTool::Paste(tool) => tool.apply(&p, &self.gizmo, stroke.gizmo_brush, scale_xy),
        }
        debug_log(&format!(
            "[stroke] {} apply: {} cells in {:?}",
            stroke.kind.name(),
            influence.len(),
            influence.rect()
        ));
    }

    /// Cursor moved to field position `(x, y)`. During a stroke this
    /// accumulates paint distance and applies the tool.
    pub fn mouse_move(&mut self, x: f32, y: f32) {
        let previous = self.brush.last_position();
        self.brush.mouse_move(x, y);
        let Some(stroke) = self.stroke.as_ref() else {
            return;
        };
        self.paint_distance += previous.distance(Vec2::new(x, y));
        if stroke.applies_on_move() {
            self.apply_tool();
        }
    }

    /// Screen-space cursor move; returns whether the terrain was hit.
    pub fn mouse_move_screen(&mut self, hit: &dyn HitTester, screen_x: f32, screen_y: f32) -> bool {
        match hit.hit_test(screen_x, screen_y) {
            Some(p) => {
                self.mouse_move(p.x, p.y);
                true
            }
            None => false,
        }
    }

    /// Close the open stroke and its transaction; a no-op without one.
    pub fn end_tool(&mut self) {
        let Some(stroke) = self.stroke.take() else {
            return;
        };
        self.brush.end_stroke();
        self.transactions.end_transaction();
        debug_log(&format!(
            "[stroke] end {} on field {} after {:.2} cells",
            stroke.kind.name(),
            stroke.field.0,
            self.paint_distance
        ));
    }

    /// One-shot copy of the field under the gizmo. Returns whether data was captured.
    pub fn copy_to_gizmo(&mut self, target: &EditTarget) -> bool {
        self.one_shot(ToolKind::Copy, target, false) && self.gizmo.has_data()
    }

    /// One-shot paste of the gizmo buffer over the gizmo's footprint.
    pub fn paste_from_gizmo(&mut self, target: &EditTarget) -> bool {
        if !self.gizmo.has_data() {
            return false;
        }
        self.one_shot(ToolKind::Paste, target, true)
    }

    fn one_shot(&mut self, kind: ToolKind, target: &EditTarget, gizmo_region: bool) -> bool {
        if self.stroke.is_some() {
            return false;
        }
        let previous_tool = self.settings.tool_kind;
        let previous_region = self.settings.paste_gizmo_region;
        self.settings.tool_kind = kind;
        self.settings.paste_gizmo_region |= gizmo_region;

        let center = self.gizmo.location.truncate();
        let began = self.begin_tool(target, center.x, center.y);
        self.end_tool();

        self.settings.tool_kind = previous_tool;
        self.settings.paste_gizmo_region = previous_region;
        began
    }
}
