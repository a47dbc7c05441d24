//! [crate::tree] moves model trees between storage and the parse tree.
//!
//! - [`source`] abstracts where a tree is read from (a directory or one JSON document),
//! - [`reader`] assembles the parse tree from a source, one validated entity file at a time,
//! - [`completeness`] and [`references`] are the two tree-level validation passes,
//! - [`writer`] lays a parse tree back out as files,
//! - [`layout`], [`filename`] and [`scope`] hold the naming conventions shared by all of them.

pub mod completeness;
pub mod filename;
pub mod layout;
pub mod reader;
pub mod references;
pub mod scope;
pub mod source;
pub mod writer;

pub use reader::TreeReader;
pub use scope::{ClassPath, Scope};
pub use source::{FsSource, JsonSource, TreeSource};
pub use writer::{FsSink, JsonSink, TreeSink, TreeWriter};

use crate::{error::ParseError, parse::ParseTree};

/// Run both tree-level passes over an assembled tree: completeness first, then references.
pub fn validate(tree: &ParseTree, sentinel: &str) -> Result<(), ParseError> {
    completeness::check(tree, sentinel)?;
    references::check(tree)
}
