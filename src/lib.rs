//! # reqmodel-core
//!
//! Ingestion pipeline for hierarchical requirements models: actors, domains, classes with
//! attributes and state machines, associations, generalizations, use cases and scenarios.
//!
//! ## Overview
//!
//! A model is authored as a tree of small entity files (or as one JSON document shaped like that
//! tree). reqmodel-core reads the tree into a string-keyed **parse tree**, validates it, and
//! converts it into a **canonical model** where every entity is addressed by a typed
//! hierarchical [`key::Key`] and every reference is a `Key`. The canonical model converts back
//! into a parse tree, which can be written out as files again.
//!
//! ```text
//!  files ──read_tree──▶ ParseTree ──to_canonical──▶ canonical::Model
//!  files ◀─write_tree── ParseTree ◀─from_canonical─ canonical::Model
//! ```
//!
//! Every failure is reported as a single [`ParseError`] carrying a stable numeric
//! [`ErrorCode`], the offending file and field, and the markdown documentation for the code.
//! The first problem found aborts the operation; no partial results are returned.
//!
//! ## Architecture
//!
//! - **[`key`]**: the `Key` type and the key-name grammar
//! - **[`parse`]**: parse-tree records and the per-kind entity validators
//! - **[`tree`]**: reading, validating and writing model trees
//! - **[`canonical`]**: the canonical model and its integrity check
//! - **[`convert`]**: conversion between the two representations
//! - **[`config`]**: `reqmodel.toml` settings
//! - **[`error`]**: error codes, [`ParseError`] and [`ModelError`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reqmodel_core::{from_canonical, read_tree, to_canonical, write_tree};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tree = read_tree("./model")?;
//!     let model = to_canonical(&tree, "bookstore")?;
//!     for domain in model.domains.values() {
//!         println!("{}: {}", domain.key, domain.name);
//!     }
//!     write_tree(&from_canonical(&model)?, "./model-copy")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Reading diagnostics
//!
//! ```rust,no_run
//! # use reqmodel_core::read_tree;
//! match read_tree("./model") {
//!     Ok(tree) => println!("read '{}'", tree.name),
//!     Err(err) => {
//!         eprintln!("{err}");
//!         eprintln!("{}", err.error_doc);
//!     }
//! }
//! ```

use serde_json::Value;
use std::path::Path;

pub mod canonical;
pub mod config;
pub mod convert;
pub mod error;
pub mod error_docs;
pub mod key;
pub mod parse;
pub mod tree;

#[cfg(test)]
mod tests;

pub use convert::{from_canonical, to_canonical};
pub use error::*;
pub use parse::ParseTree;

use config::{TreeConfig, CONFIG_FILE_NAME};
use parse::SchemaRegistry;
use tree::{FsSink, FsSource, JsonSink, JsonSource, TreeReader, TreeWriter};

/// Read and validate the model tree rooted at `root`.
///
/// Settings come from `reqmodel.toml` in `root` when present.
pub fn read_tree<P: AsRef<Path>>(root: P) -> Result<ParseTree, ParseError> {
    let root = root.as_ref();
    let config = TreeConfig::for_root(root).map_err(|err| {
        ParseError::new(ErrorCode::TreeReadFailed, err.to_string(), CONFIG_FILE_NAME)
    })?;
    let registry = SchemaRegistry::new();
    let source = FsSource::new(root, config.skip_hidden);
    TreeReader::new(&source, &registry, &config).read()
}

/// Read and validate a model tree given as one JSON document shaped like the directory tree.
pub fn read_tree_json(document: &Value) -> Result<ParseTree, ParseError> {
    let config = TreeConfig::default();
    let registry = SchemaRegistry::new();
    let source = JsonSource::new(document, config.skip_hidden);
    TreeReader::new(&source, &registry, &config).read()
}

/// Write a parse tree below `root`, in the format configured by `reqmodel.toml` in `root`.
pub fn write_tree<P: AsRef<Path>>(tree: &ParseTree, root: P) -> Result<(), ModelError> {
    let root = root.as_ref();
    let config = TreeConfig::for_root(root)?;
    let mut sink = FsSink::new(root, &config);
    TreeWriter::new(&mut sink).write(tree)
}

/// Render a parse tree as one JSON document, the form [`read_tree_json`] accepts.
pub fn write_tree_json(tree: &ParseTree) -> Result<Value, ModelError> {
    let mut sink = JsonSink::new();
    TreeWriter::new(&mut sink).write(tree)?;
    Ok(sink.into_value())
}
