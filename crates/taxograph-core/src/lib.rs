//! Taxograph Core — taxonomy graph, transitive closure and structural issues

mod closure;
pub mod cycles;
pub mod error;
pub mod graph;
pub mod issue;
pub mod model;


pub use cycles::CycleCheck;
pub use error::GraphError;
pub use graph::TaxonomyGraph;
pub use issue::{Issue, IssueLog, DEFAULT_ISSUE_CAPACITY};
pub use model::{Concept, Edge, EdgeDifference, TaxonomyEntity, ROOT_ID};
