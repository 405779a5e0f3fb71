//! Terrain sculpting core: brushes, tools and stroke handling over a tiled
//! heightfield with material weight layers.

pub mod accessor;
pub mod backend;
pub mod brush;
pub mod debug_log;
pub mod edit_cache;
pub mod engine;
pub mod falloff;
pub mod field;
pub mod gizmo;
pub mod lowpass;
pub mod noise_field;
pub mod selection;
pub mod settings;
pub mod storage;
pub mod target;
pub mod tools;
pub mod transaction;

pub use backend::{LayerInfo, SharedBackend, TerrainBackend, TerrainScale, TileCoord};
pub use brush::{Brush, BrushInfluence, BrushKind};
pub use engine::{EditContext, HitTester, SculptEngine};
pub use field::{FieldCoord, FieldRect};
pub use gizmo::Gizmo;
pub use selection::SelectionState;
pub use settings::ToolSettings;
pub use storage::TerrainStore;
pub use target::{EditTarget, FieldId, TargetKind};
pub use tools::ToolKind;
pub use transaction::{NoTransactions, TransactionHost, TransactionJournal};
