//! Command catalog for SyntaxScope
//!
//! Turns raw command-reference entries into the canonical catalog:
//! - deterministic identities (`identity`)
//! - heuristic category and tag assignment (`rules`, `classify`, `tags`)
//! - the enrichment stage (`enrich`)
//! - identity-keyed merging of several datasets (`reconcile`)
//! - JSON persistence and schema validation (`store`, `schema`)
//!
//! Output:
//! - `Vec<Record>` snapshots, one per pipeline stage
//! - `DatasetSummary` counts for stage logs

pub mod classify;
pub mod enrich;
pub mod identity;
pub mod model;
pub mod reconcile;
pub mod rules;
pub mod schema;
pub mod store;
pub mod summary;
pub mod tags;

pub use classify::*;
pub use enrich::*;
pub use identity::*;
pub use model::*;
pub use reconcile::*;
pub use rules::*;
pub use schema::{SchemaError, SchemaValidator};
pub use store::*;
pub use summary::*;
pub use tags::*;
