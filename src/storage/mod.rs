// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Relational persistence for canonical entities.
//!
//! # Trait Hierarchy
//!
//! ```text
//! Repository
//! ├── SqlRepository     (sqlx Any: SQLite / MySQL)
//! └── MemoryRepository  (DashMap, tests and embedded use)
//! ```

pub mod memory;
pub(crate) mod schema;
pub mod sql;
pub mod traits;

pub use memory::MemoryRepository;
pub use sql::{SqlOptions, SqlRepository};
pub use traits::{BulkWriteReport, Repository, STATEMENT_CHUNK};
