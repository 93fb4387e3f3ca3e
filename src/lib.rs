//! # qualgate-rs: Quality Gates and Incremental Indexing
//!
//! Library for deciding whether an analyzed project passes its quality gate
//! and for keeping search indexes in step with a primary store.
//!
//! - **Condition evaluation**: compares a measure against one threshold,
//!   on the absolute value or on the new-code variation
//! - **Quality gates**: resolves the gate in force for a project and
//!   aggregates its conditions into one verdict
//! - **Incremental indexing**: startup, change-driven, incremental and
//!   scoped re-indexing of active rules and source lines
//! - **Reference store**: SQLite implementations of every collaborator
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         CLI                              │
//! ├──────────────┬───────────────────┬───────────────────────┤
//! │  Gate        │  Index            │  Rules                │
//! │ • Evaluator  │ • Indexer         │ • Finder snapshot     │
//! │ • Service    │ • Active rules    │ • Activation          │
//! │              │ • Source lines    │                       │
//! ├──────────────┴───────────────────┴───────────────────────┤
//! │  Store: SQLite primary store and search index            │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use qualgate_rs::core::config::StoreConfig;
//! use qualgate_rs::gate::{QualityGateEvaluator, QualityGateService, QualityGateServiceImpl};
//! use qualgate_rs::store::SqliteStore;
//!
//! fn main() -> qualgate_rs::Result<()> {
//!     let store = Arc::new(SqliteStore::open(&StoreConfig::default())?);
//!     let service = QualityGateServiceImpl::new(store.clone(), store.clone(), store.clone());
//!
//!     let gate = service.find_effective_quality_gate("my-project")?;
//!     let measures = store.project_measures("my-project")?;
//!     let verdict = QualityGateEvaluator::new().evaluate(&gate, &measures)?;
//!
//!     println!("{}: {}", verdict.gate_name, verdict.level);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Shared infrastructure
pub mod core {
    //! Configuration, errors, snapshots and logging setup.

    pub mod config;
    pub mod errors;
    pub mod snapshot;
    pub mod telemetry;
}

pub mod gate;
pub mod index;
pub mod rules;
pub mod store;

// Re-export primary types for convenience
pub use crate::core::config::QualgateConfig;
pub use crate::core::errors::{ErrorCategory, QualgateError, Result, ResultExt};
pub use gate::{QualityGate, QualityGateEvaluator, QualityGateService, QualityGateServiceImpl};
pub use index::{Indexer, IndexingReport};
pub use store::{SqliteSearchIndex, SqliteStore};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
