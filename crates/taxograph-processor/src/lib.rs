//! Incremental and full maintenance of derived parentage
//!
//! [`TaxonomyChangeProcessor`] handles one transaction at a time against a
//! persisted hierarchy; [`reindex_all`] rebuilds every entity from scratch.

pub mod config;
pub mod error;
pub mod parentage;
pub mod processor;


pub use config::ProcessorConfig;
pub use error::{ChangeError, ConfigError};
pub use parentage::{derive_parentage, reindex_all, Parentage};
pub use processor::{ProcessReport, TaxonomyChangeProcessor};
