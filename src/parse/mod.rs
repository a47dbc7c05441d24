//! Parse-tree records and the entity validators that produce them.
//!
//! Every file-level entity kind implements [`Entity`]: a serde shape, a [`FileKind`] naming its
//! structural schema and error codes, and a business-rule check. [`parse_entity`] runs the
//! uniform pipeline for any kind:
//!
//! 1. decode the raw bytes as JSON or YAML (`*InvalidEncoding`),
//! 2. check the decoded value against the kind's schema (`*SchemaViolation`, schema attached),
//! 3. deserialize into the record type,
//! 4. run [`Entity::validate`] for the rules the schema cannot express.
//!
//! Records carry only the fields found in their file. Child maps (marked `#[serde(skip)]`) are
//! filled in by the tree reader from the directory structure and never appear in a file.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::{
    config::MetadataFormat,
    error::{ErrorCode, ParseError},
    key::validate_name,
};

pub mod class;
pub mod domain;
pub mod generalization;
pub mod logic;
pub mod model;
pub mod schema_registry;
pub mod state_machine;
pub mod use_case;

pub use class::{Attribute, Class, ClassAssociation};
pub use domain::{Domain, Subdomain};
pub use generalization::{
    ActorGeneralization, ClassGeneralization, Generalization, UseCaseGeneralization,
};
pub use logic::{Logic, Parameter};
pub use model::{Actor, ActorType, DomainAssociation, GlobalFunction, Model};
pub use schema_registry::SchemaRegistry;
pub use state_machine::{Action, Event, Guard, Query, State, StateAction, StateMachine, Transition};
pub use use_case::{
    Case, Leaf, NameStyle, Scenario, ScenarioObject, ShareType, Step, UseCase, UseCaseActor,
    UseCaseLevel, UseCaseShared,
};

/// The complete parse tree: the root model record with every child map populated.
pub type ParseTree = Model;

/// The kinds of entity that live in their own file, each with its own schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileKind {
    Model,
    Actor,
    ActorGeneralization,
    GlobalFunction,
    Domain,
    DomainAssociation,
    Subdomain,
    Class,
    ClassGeneralization,
    ClassAssociation,
    StateMachine,
    Action,
    Query,
    UseCase,
    UseCaseGeneralization,
    Scenario,
}

impl FileKind {
    pub fn all() -> &'static [FileKind] {
        &[
            FileKind::Model,
            FileKind::Actor,
            FileKind::ActorGeneralization,
            FileKind::GlobalFunction,
            FileKind::Domain,
            FileKind::DomainAssociation,
            FileKind::Subdomain,
            FileKind::Class,
            FileKind::ClassGeneralization,
            FileKind::ClassAssociation,
            FileKind::StateMachine,
            FileKind::Action,
            FileKind::Query,
            FileKind::UseCase,
            FileKind::UseCaseGeneralization,
            FileKind::Scenario,
        ]
    }

    /// Name of the embedded schema file, `schemas/<name>.schema.json`.
    pub fn schema_name(self) -> &'static str {
        match self {
            FileKind::Model => "model",
            FileKind::Actor => "actor",
            FileKind::ActorGeneralization | FileKind::ClassGeneralization | FileKind::UseCaseGeneralization => {
                "generalization"
            }
            FileKind::GlobalFunction => "global_function",
            FileKind::Domain => "domain",
            FileKind::DomainAssociation => "domain_association",
            FileKind::Subdomain => "subdomain",
            FileKind::Class => "class",
            FileKind::ClassAssociation => "association",
            FileKind::StateMachine => "state_machine",
            FileKind::Action | FileKind::Query => "action",
            FileKind::UseCase => "use_case",
            FileKind::Scenario => "scenario",
        }
    }

    pub fn invalid_encoding(self) -> ErrorCode {
        match self {
            FileKind::Model => ErrorCode::ModelInvalidEncoding,
            FileKind::Actor => ErrorCode::ActorInvalidEncoding,
            FileKind::ActorGeneralization => ErrorCode::ActorGeneralizationInvalidEncoding,
            FileKind::GlobalFunction => ErrorCode::GlobalFunctionInvalidEncoding,
            FileKind::Domain => ErrorCode::DomainInvalidEncoding,
            FileKind::DomainAssociation => ErrorCode::DomainAssociationInvalidEncoding,
            FileKind::Subdomain => ErrorCode::SubdomainInvalidEncoding,
            FileKind::Class => ErrorCode::ClassInvalidEncoding,
            FileKind::ClassGeneralization => ErrorCode::ClassGeneralizationInvalidEncoding,
            FileKind::ClassAssociation => ErrorCode::AssociationInvalidEncoding,
            FileKind::StateMachine => ErrorCode::StateMachineInvalidEncoding,
            FileKind::Action => ErrorCode::ActionInvalidEncoding,
            FileKind::Query => ErrorCode::QueryInvalidEncoding,
            FileKind::UseCase => ErrorCode::UseCaseInvalidEncoding,
            FileKind::UseCaseGeneralization => ErrorCode::UseCaseGeneralizationInvalidEncoding,
            FileKind::Scenario => ErrorCode::ScenarioInvalidEncoding,
        }
    }

    pub fn schema_violation(self) -> ErrorCode {
        match self {
            FileKind::Model => ErrorCode::ModelSchemaViolation,
            FileKind::Actor => ErrorCode::ActorSchemaViolation,
            FileKind::ActorGeneralization => ErrorCode::ActorGeneralizationSchemaViolation,
            FileKind::GlobalFunction => ErrorCode::GlobalFunctionSchemaViolation,
            FileKind::Domain => ErrorCode::DomainSchemaViolation,
            FileKind::DomainAssociation => ErrorCode::DomainAssociationSchemaViolation,
            FileKind::Subdomain => ErrorCode::SubdomainSchemaViolation,
            FileKind::Class => ErrorCode::ClassSchemaViolation,
            FileKind::ClassGeneralization => ErrorCode::ClassGeneralizationSchemaViolation,
            FileKind::ClassAssociation => ErrorCode::AssociationSchemaViolation,
            FileKind::StateMachine => ErrorCode::StateMachineSchemaViolation,
            FileKind::Action => ErrorCode::ActionSchemaViolation,
            FileKind::Query => ErrorCode::QuerySchemaViolation,
            FileKind::UseCase => ErrorCode::UseCaseSchemaViolation,
            FileKind::UseCaseGeneralization => ErrorCode::UseCaseGeneralizationSchemaViolation,
            FileKind::Scenario => ErrorCode::ScenarioSchemaViolation,
        }
    }
}

/// A record that is read from its own file and validated there.
pub trait Entity: Serialize + DeserializeOwned {
    const KIND: FileKind;

    /// Business rules beyond what the structural schema expresses.
    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError>;
}

/// Helpers for business-rule checks, bound to the file being validated.
#[derive(Debug, Clone, Copy)]
pub struct Rules<'a> {
    file: &'a Path,
}

impl<'a> Rules<'a> {
    pub fn new(file: &'a Path) -> Self {
        Rules { file }
    }

    pub fn file(&self) -> &'a Path {
        self.file
    }

    pub fn error(&self, code: ErrorCode, message: impl Into<String>) -> ParseError {
        ParseError::new(code, message, self.file)
    }

    /// `value` must contain something other than whitespace.
    pub fn required(&self, value: &str, code: ErrorCode, field: &str) -> Result<(), ParseError> {
        if value.trim().is_empty() {
            return Err(self
                .error(code, format!("'{field}' is required and must not be blank"))
                .with_field(field));
        }
        Ok(())
    }

    /// When present, `value` must not be blank.
    pub fn optional(
        &self,
        value: &Option<String>,
        code: ErrorCode,
        field: &str,
    ) -> Result<(), ParseError> {
        match value {
            Some(value) if value.trim().is_empty() => Err(self
                .error(code, format!("'{field}' must not be blank when present"))
                .with_field(field)),
            _ => Ok(()),
        }
    }

    /// `items` must have at least one entry and every entry must be non-blank.
    pub fn non_empty_items(
        &self,
        items: &[String],
        empty: ErrorCode,
        blank: ErrorCode,
        field: &str,
    ) -> Result<(), ParseError> {
        if items.is_empty() {
            return Err(self
                .error(empty, format!("'{field}' must have at least one entry"))
                .with_field(field));
        }
        self.items(items, blank, field)
    }

    /// Every entry of `items` must be non-blank.
    pub fn items(&self, items: &[String], blank: ErrorCode, field: &str) -> Result<(), ParseError> {
        for (idx, item) in items.iter().enumerate() {
            if item.trim().is_empty() {
                return Err(self
                    .error(blank, format!("entry {idx} of '{field}' must not be blank"))
                    .with_field(format!("{field}[{idx}]")));
            }
        }
        Ok(())
    }

    /// `value` must be one of `allowed`.
    pub fn one_of(
        &self,
        value: &str,
        allowed: &[&str],
        code: ErrorCode,
        field: &str,
    ) -> Result<(), ParseError> {
        if !allowed.contains(&value) {
            return Err(self
                .error(
                    code,
                    format!(
                        "'{field}' is '{value}' but must be one of: {}",
                        allowed.join(", ")
                    ),
                )
                .with_field(field));
        }
        Ok(())
    }

    /// Keys of maps inside a file follow the key-name grammar.
    pub fn map_key(&self, key: &str, field: &str) -> Result<(), ParseError> {
        validate_name(key).map_err(|err| {
            self.error(ErrorCode::KeyInvalidFormat, err.to_string())
                .with_field(format!("{field}.{key}"))
        })
    }
}

/// Decode raw file bytes into a JSON value.
pub fn decode(raw: &[u8], format: MetadataFormat) -> Result<Value, String> {
    let text =
        std::str::from_utf8(raw).map_err(|err| format!("file is not valid UTF-8: {err}"))?;
    match format {
        MetadataFormat::Json => {
            serde_json::from_str(text).map_err(|err| format!("invalid JSON: {err}"))
        }
        MetadataFormat::Yaml => {
            serde_yaml::from_str(text).map_err(|err| format!("invalid YAML: {err}"))
        }
    }
}

/// Encode a record in the given format.
pub fn encode<T: Serialize>(
    entity: &T,
    format: MetadataFormat,
    pretty: bool,
) -> Result<Vec<u8>, crate::error::ModelError> {
    Ok(match format {
        MetadataFormat::Json if pretty => {
            let mut bytes = serde_json::to_vec_pretty(entity)?;
            bytes.push(b'\n');
            bytes
        }
        MetadataFormat::Json => serde_json::to_vec(entity)?,
        MetadataFormat::Yaml => serde_yaml::to_string(entity)?.into_bytes(),
    })
}

/// Run the full validation pipeline for one entity file.
#[tracing::instrument(skip(registry, raw), fields(kind = ?T::KIND))]
pub fn parse_entity<T: Entity>(
    registry: &SchemaRegistry,
    raw: &[u8],
    file: &Path,
    format: MetadataFormat,
) -> Result<T, ParseError> {
    let value = decode(raw, format)
        .map_err(|message| ParseError::new(T::KIND.invalid_encoding(), message, file))?;
    registry.check(T::KIND, &value, file)?;
    let entity: T = serde_json::from_value(value).map_err(|err| {
        ParseError::new(
            T::KIND.schema_violation(),
            format!("file does not match the expected shape: {err}"),
            file,
        )
        .with_schema(registry.schema_text(T::KIND))
    })?;
    entity.validate(&Rules::new(file))?;
    tracing::debug!("[parse_entity] {:?} accepted: {}", T::KIND, file.display());
    Ok(entity)
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}
