//! Filename grammars: simple `<key><suffix>.<ext>` names and compound association names.

use std::path::Path;

use crate::{
    config::MetadataFormat,
    error::{ErrorCode, ParseError},
    key::{validate_name, AssociationName, KeyError},
    tree::layout::{Collection, ALL_COLLECTIONS},
};

/// Format of a file named `<stem>.<ext>`, if `name` is one.
pub fn match_file(name: &str, stem: &str) -> Option<MetadataFormat> {
    let (found, ext) = name.rsplit_once('.')?;
    if found != stem {
        return None;
    }
    MetadataFormat::from_extension(ext)
}

/// Split an entry name into its key stem and format when it belongs to `collection`.
pub fn match_entry(name: &str, collection: &Collection) -> Option<(String, MetadataFormat)> {
    let (rest, ext) = name.rsplit_once('.')?;
    let format = MetadataFormat::from_extension(ext)?;
    let stem = rest.strip_suffix(collection.suffix)?;
    if collection.suffix.is_empty() && stem.contains('.') {
        // `<key>.<other suffix>.json` belongs to some other collection.
        return None;
    }
    Some((stem.to_string(), format))
}

/// Whether some collection stored in a directory named `dir` accepts `name`.
pub fn is_claimed(dir: &str, name: &str) -> bool {
    ALL_COLLECTIONS
        .iter()
        .filter(|collection| collection.dir == dir)
        .any(|collection| match_entry(name, collection).is_some())
}

/// Validate a simple key taken from a file or directory name.
pub fn simple_key(stem: &str, file: &Path) -> Result<String, ParseError> {
    validate_name(stem).map_err(|err| key_error(err, file))?;
    Ok(stem.to_string())
}

/// Parse a compound association filename stem whose endpoints must have `segments` parts.
pub fn association_name(
    stem: &str,
    segments: usize,
    file: &Path,
) -> Result<AssociationName, ParseError> {
    AssociationName::parse(stem, segments).map_err(|err| key_error(err, file))
}

fn key_error(err: KeyError, file: &Path) -> ParseError {
    let code = match err {
        KeyError::AssociationShape { .. } => ErrorCode::AssociationFilenameInvalid,
        KeyError::SegmentCount { .. } => ErrorCode::AssociationSegmentCount,
        _ => ErrorCode::KeyInvalidFormat,
    };
    ParseError::new(code, err.to_string(), file)
}
