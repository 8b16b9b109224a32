//! Quadpath
//!
//! An embedded quad store with a fluent path-traversal query layer.
//!
//! # Architecture
//!
//! - `value` / `quad`: RDF-style values and quads, with an order-preserving
//!   key encoding so every index is a sorted key range
//! - `storage`: ordered key backends (in-memory or RocksDB)
//! - `store`: the quad store, four index permutations (SPOL, POSL, OSPL,
//!   LSPO) kept in sync through atomic write batches
//! - `path` / `eval`: immutable path expressions and a pull-based evaluator
//!   producing binding rows
//! - `rank`: single-pass counting and ranking of tagged products
//! - `demo`: the social and shop datasets with their queries
//!
//! ## Example Usage
//!
//! ```rust
//! use quadpath::{rank_path, start_path, Quad, QuadStore, Value};
//!
//! let store = QuadStore::memory(true, true).unwrap();
//! store.add_quads(vec![
//!     Quad::raw("cust1", "bought", "p1", ""),
//!     Quad::raw("cust1", "bought", "p2", ""),
//!     Quad::raw("p1", "in_group", "g1", ""),
//!     Quad::raw("p2", "in_group", "g1", ""),
//!     Quad::raw("p3", "in_group", "g1", ""),
//!     Quad::raw("cust2", "bought", "p3", ""),
//! ]).unwrap();
//!
//! let owned = start_path(&store, [Value::iri("cust1")]).out([Value::iri("bought")]);
//! let path = owned
//!     .out([Value::iri("in_group")])
//!     .unique()
//!     .r#in([Value::iri("in_group")])
//!     .except(&owned)
//!     .tag("product")
//!     .r#in([Value::iri("bought")]);
//!
//! let ranking = rank_path(&path, "product", "name").unwrap();
//! assert_eq!(ranking.results()[0].product_id, Value::iri("p3"));
//! assert_eq!(ranking.results()[0].count, 1);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod demo;
pub mod eval;
pub mod path;
pub mod quad;
pub mod rank;
pub mod storage;
pub mod store;
pub mod value;

// Re-export main types for convenience
pub use config::{BackendConfig, ConfigError, ConfigResult, StoreConfig};

pub use value::{Literal, Value, ValueError, ValueResult};

pub use quad::{IndexKind, Quad, QuadPattern};

pub use storage::{
    open_backend, MemoryBackend, RocksDbBackend, StorageBackend, StorageError, StorageResult,
    WriteBatch,
};

pub use store::{
    AddOutcome, CommitSummary, Fixed, QuadIter, QuadStore, QuadWriter, RemoveOutcome, StoreError,
    StoreResult,
};

pub use path::{each_binding_row, start_path, Direction, Path, Step};

pub use eval::{
    evaluate, evaluate_with, BindingRow, EvalOptions, PartialRows, PathError, PathResult,
    RowSequence,
};

pub use rank::{rank, rank_path, Aggregator, ProductRecommendation, Ranking};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.1.0");
    }
}
