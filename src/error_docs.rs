//! Embedded markdown explanations for every [`ErrorCode`].
//!
//! Documents live in `docs/errors/` and are named `<code>_<slug>.md`; lookup goes by the numeric
//! prefix only, so slugs can be renamed freely.

use std::collections::HashMap;

use include_dir::{include_dir, Dir};
use once_cell::sync::Lazy;

use crate::error::ErrorCode;

static ERROR_DOCS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/docs/errors");

const FORMAT_DOC_NAME: &str = "format.md";

static DOC_INDEX: Lazy<HashMap<u32, &'static str>> = Lazy::new(|| {
    ERROR_DOCS
        .files()
        .filter_map(|file| {
            let name = file.path().file_name()?.to_str()?;
            let (prefix, _slug) = name.strip_suffix(".md")?.split_once('_')?;
            let number = prefix.parse::<u32>().ok()?;
            Some((number, file.contents_utf8()?))
        })
        .collect()
});

/// Look up the document for `code`.
///
/// # Panics
///
/// Panics when the document is missing. That is an internal configuration fault.
pub fn error_doc(code: ErrorCode) -> &'static str {
    match DOC_INDEX.get(&code.number()) {
        Some(doc) => doc,
        None => panic!(
            "internal configuration fault: no error document for {code} under docs/errors/"
        ),
    }
}

/// General format documentation attached to every error.
///
/// # Panics
///
/// Panics when `docs/errors/format.md` is not embedded.
pub fn format_doc() -> &'static str {
    match ERROR_DOCS
        .get_file(FORMAT_DOC_NAME)
        .and_then(|file| file.contents_utf8())
    {
        Some(doc) => doc,
        None => panic!("internal configuration fault: docs/errors/{FORMAT_DOC_NAME} is missing"),
    }
}
