// Structural schemas for entity files
//
// Every file-level entity kind has a JSON Schema (draft 2020-12) embedded from `schemas/`.
// The registry compiles them once and is handed explicitly to whoever parses entity files;
// there is no process-wide schema state.

use include_dir::{include_dir, Dir};
use jsonschema::{Draft, Validator};
use serde_json::Value;
use std::{collections::HashMap, fmt, path::Path};

use crate::{
    error::{ModelError, ParseError},
    parse::FileKind,
};

static SCHEMA_FILES: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/schemas");

struct CompiledSchema {
    text: &'static str,
    validator: Validator,
}

/// Compiled structural schemas, one per [`FileKind`].
pub struct SchemaRegistry {
    schemas: HashMap<FileKind, CompiledSchema>,
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds = self.schemas.keys().collect::<Vec<_>>();
        kinds.sort();
        f.debug_struct("SchemaRegistry").field("kinds", &kinds).finish()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        SchemaRegistry::new()
    }
}

impl SchemaRegistry {
    /// Compile every embedded schema.
    ///
    /// # Panics
    ///
    /// When an embedded schema is missing or does not compile. The schemas ship with the crate,
    /// so this is a packaging defect and never a consequence of user input.
    pub fn new() -> Self {
        match SchemaRegistry::try_new() {
            Ok(registry) => registry,
            Err(err) => panic!("internal configuration fault: {err}"),
        }
    }

    pub fn try_new() -> Result<Self, ModelError> {
        let mut schemas = HashMap::new();
        for kind in FileKind::all().iter().copied() {
            let file_name = format!("{}.schema.json", kind.schema_name());
            let text = SCHEMA_FILES
                .get_file(&file_name)
                .and_then(|file| file.contents_utf8())
                .ok_or_else(|| {
                    ModelError::Config(format!("embedded schema {file_name} is missing"))
                })?;
            let schema: Value = serde_json::from_str(text)?;
            let validator = jsonschema::options()
                .with_draft(Draft::Draft202012)
                .build(&schema)
                .map_err(|err| ModelError::Config(format!("invalid schema {file_name}: {err}")))?;
            schemas.insert(kind, CompiledSchema { text, validator });
        }
        tracing::debug!(
            "[SchemaRegistry::try_new] compiled {} entity schemas",
            schemas.len()
        );
        Ok(SchemaRegistry { schemas })
    }

    /// Raw text of the schema for `kind`.
    pub fn schema_text(&self, kind: FileKind) -> &'static str {
        self.schemas.get(&kind).map(|s| s.text).unwrap_or_default()
    }

    /// Check `value` against the schema for `kind`, reporting every violation in one error.
    pub fn check(&self, kind: FileKind, value: &Value, file: &Path) -> Result<(), ParseError> {
        let Some(schema) = self.schemas.get(&kind) else {
            return Ok(());
        };
        let problems = schema
            .validator
            .iter_errors(value)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        if problems.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            "[SchemaRegistry::check] {:?} schema rejected {}: {:?}",
            kind,
            file.display(),
            problems
        );
        Err(ParseError::new(
            kind.schema_violation(),
            format!("file violates the {} schema: {}", kind.schema_name(), problems.join("; ")),
            file,
        )
        .with_schema(schema.text))
    }
}
