//! Error types shared by every stage of the pipeline.
//!
//! User-fixable problems are reported as a [`ParseError`]: one stable [`ErrorCode`], a message,
//! the offending file and, where it applies, the field path inside that file. Every
//! `ParseError` carries the markdown explanation for its code and the general format
//! documentation, so a caller can show a complete diagnostic without further lookups.
//!
//! [`ModelError`] wraps `ParseError` together with the failures of the outer surfaces (I/O,
//! serialization, configuration and conversion).

use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{error_docs, key::KeyError};

/// Declares [`ErrorCode`] together with [`ErrorCode::ALL`], so the list of every code can
/// never miss a variant.
macro_rules! error_codes {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident = $number:literal,)* }) => {
        $(#[$meta])*
        $vis enum $name {
            $($variant = $number,)*
        }

        impl $name {
            /// Every code, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];
        }
    };
}

error_codes! {
    /// Stable numeric codes for every problem the pipeline reports.
    ///
    /// Codes are grouped by entity kind in blocks of 1000. Each code has a matching document under
    /// `docs/errors/` named by its numeric prefix.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[repr(u32)]
    pub enum ErrorCode {
        ModelInvalidEncoding = 1001,
        ModelSchemaViolation = 1002,
        ModelNameRequired = 1003,
        LogicDescriptionRequired = 1004,
        LogicNotationInvalid = 1005,
        ParameterNameRequired = 1006,
        GlobalFunctionInvalidEncoding = 1007,
        GlobalFunctionSchemaViolation = 1008,
        GlobalFunctionNameRequired = 1009,
        GlobalFunctionParameterBlank = 1010,

        ActorInvalidEncoding = 2001,
        ActorSchemaViolation = 2002,
        ActorNameRequired = 2003,

        DomainInvalidEncoding = 3001,
        DomainSchemaViolation = 3002,
        DomainNameRequired = 3003,
        DomainAssociationInvalidEncoding = 3004,
        DomainAssociationSchemaViolation = 3005,
        DomainAssociationProblemRequired = 3006,
        DomainAssociationSolutionRequired = 3007,

        SubdomainInvalidEncoding = 4001,
        SubdomainSchemaViolation = 4002,
        SubdomainNameRequired = 4003,

        ClassInvalidEncoding = 5001,
        ClassSchemaViolation = 5002,
        ClassNameRequired = 5003,
        AttributeNameRequired = 5004,
        ClassIndexEmpty = 5005,
        ClassIndexEntryBlank = 5006,
        ClassActorKeyBlank = 5007,

        ClassGeneralizationInvalidEncoding = 6001,
        ClassGeneralizationSchemaViolation = 6002,
        ActorGeneralizationInvalidEncoding = 6003,
        ActorGeneralizationSchemaViolation = 6004,
        UseCaseGeneralizationInvalidEncoding = 6005,
        UseCaseGeneralizationSchemaViolation = 6006,
        GeneralizationNameRequired = 6007,
        GeneralizationSuperclassRequired = 6008,
        GeneralizationSubclassesRequired = 6009,
        GeneralizationSubclassBlank = 6010,

        AssociationInvalidEncoding = 7001,
        AssociationSchemaViolation = 7002,
        AssociationNameRequired = 7003,
        AssociationFromClassRequired = 7004,
        AssociationToClassRequired = 7005,
        AssociationClassBlank = 7006,

        StateMachineInvalidEncoding = 8001,
        StateMachineSchemaViolation = 8002,
        StateNameRequired = 8003,
        StateActionKeyRequired = 8004,
        StateActionWhenInvalid = 8005,
        EventNameRequired = 8006,
        GuardNameRequired = 8007,
        TransitionEventRequired = 8008,
        TransitionKeyBlank = 8009,

        ActionInvalidEncoding = 9001,
        ActionSchemaViolation = 9002,
        ActionNameRequired = 9003,
        QueryInvalidEncoding = 9004,
        QuerySchemaViolation = 9005,
        QueryNameRequired = 9006,

        UseCaseInvalidEncoding = 10001,
        UseCaseSchemaViolation = 10002,
        UseCaseNameRequired = 10003,
        ScenarioInvalidEncoding = 10004,
        ScenarioSchemaViolation = 10005,
        ScenarioNameRequired = 10006,
        ScenarioObjectClassRequired = 10007,
        ScenarioObjectNameRequired = 10008,
        StepConditionRequired = 10009,
        StepCasesRequired = 10010,
        StepKeyRequired = 10011,

        TreeReadFailed = 11001,
        TreeRootMissing = 11002,
        KeyInvalidFormat = 11003,
        AssociationFilenameInvalid = 11004,
        AssociationSegmentCount = 11005,
        AssociationFilenameMismatch = 11006,
        DuplicateEntry = 11007,
        NoActors = 11101,
        NoDomains = 11102,
        DomainNoSubdomains = 11103,
        SingleSubdomainNotDefault = 11104,
        DefaultSubdomainAmongMany = 11105,
        SubdomainTooFewClasses = 11106,
        SubdomainNoAssociations = 11107,
        ClassNoAttributes = 11108,
        ClassNoStateMachine = 11109,
        StateMachineNoTransitions = 11110,
        ActionUnreferenced = 11111,
        ClassActorNotFound = 11201,
        IndexAttributeNotFound = 11202,
        IndexAttributeDuplicate = 11203,
        StateActionNotFound = 11204,
        TransitionStateNotFound = 11205,
        TransitionEventNotFound = 11206,
        TransitionGuardNotFound = 11207,
        TransitionActionNotFound = 11208,
        TransitionNoStates = 11209,
        GeneralizationSuperclassNotFound = 11210,
        GeneralizationSubclassNotFound = 11211,
        GeneralizationDuplicateSubclass = 11212,
        GeneralizationSuperclassIsSubclass = 11213,
        GeneralizationMembershipConflict = 11214,
        AssociationClassNotFound = 11215,
        AssociationMultiplicityInvalid = 11216,
        AssociationClassIsEndpoint = 11217,
        DomainAssociationDomainNotFound = 11218,
        DomainAssociationSelf = 11219,
        UseCaseActorNotFound = 11220,
        UseCaseActorNotActor = 11221,
        UseCaseShareNotFound = 11222,
        UseCaseShareSelf = 11223,
        ScenarioObjectClassNotFound = 11224,
        ScenarioStepObjectNotFound = 11225,
        ScenarioStepEventNotFound = 11226,
        ScenarioStepQueryNotFound = 11227,
        ScenarioStepScenarioNotFound = 11228,
        AssociationReferenceMalformed = 11229,
        CanonicalKeyMismatch = 11301,
        CanonicalReferenceUnresolved = 11302,
        CanonicalReferenceOutOfScope = 11303,
        CanonicalGeneralizationIncomplete = 11304,
    }
}

impl ErrorCode {
    /// The stable numeric value of this code.
    pub fn number(self) -> u32 {
        self as u32
    }

    /// The markdown document explaining this code.
    ///
    /// # Panics
    ///
    /// Panics when no document is embedded for the code. That is a defect in the crate (a code
    /// was added without its document), never a consequence of user input.
    pub fn doc(self) -> &'static str {
        error_docs::error_doc(self)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.number())
    }
}

fn code_number(code: &ErrorCode) -> u32 {
    code.number()
}

fn location(file: &Path, field: &Option<String>) -> String {
    match field {
        Some(field) => format!("{} at {field}", file.display()),
        None => file.display().to_string(),
    }
}

/// A user-fixable problem in a model tree.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[E{}] {message} ({})", code_number(.code), location(.file, .field))]
pub struct ParseError {
    pub code: ErrorCode,
    pub message: String,
    /// File the problem was found in, relative to the tree root.
    pub file: PathBuf,
    /// Dotted/indexed path of the offending field inside `file`.
    pub field: Option<String>,
    /// Markdown explanation of `code`.
    pub error_doc: &'static str,
    /// Raw schema text, set when the failure was a schema violation.
    pub schema: Option<&'static str>,
    /// General format documentation, attached to every error.
    pub format_doc: &'static str,
}

impl ParseError {
    pub fn new(code: ErrorCode, message: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        ParseError {
            code,
            message: message.into(),
            file: file.into(),
            field: None,
            error_doc: code.doc(),
            schema: None,
            format_doc: error_docs::format_doc(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_schema(mut self, schema: &'static str) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Prefix the field path with the path of an enclosing object, so nested validators can
    /// report paths relative to themselves.
    pub fn within(mut self, prefix: &str) -> Self {
        self.field = Some(match self.field.take() {
            Some(field) if field.starts_with('[') => format!("{prefix}{field}"),
            Some(field) => format!("{prefix}.{field}"),
            None => prefix.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("{0}")]
    Parse(ParseError),
    #[error("Key error: {0}")]
    Key(KeyError),
    #[error("Conversion error: {0}")]
    Conversion(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl ModelError {
    /// The stable code of the underlying parse error, if this is one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ModelError::Parse(err) => Some(err.code),
            _ => None,
        }
    }
}

impl From<ParseError> for ModelError {
    fn from(src: ParseError) -> ModelError {
        ModelError::Parse(src)
    }
}

impl From<KeyError> for ModelError {
    fn from(src: KeyError) -> ModelError {
        ModelError::Key(src)
    }
}

impl From<io::Error> for ModelError {
    fn from(x: io::Error) -> Self {
        ModelError::Io(format!("IOError ({}): {x}", x.kind()))
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(src: serde_json::Error) -> ModelError {
        ModelError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<serde_yaml::Error> for ModelError {
    fn from(src: serde_yaml::Error) -> ModelError {
        ModelError::Serialization(format!("YAML (de)serialization error: {src}"))
    }
}

impl From<toml::de::Error> for ModelError {
    fn from(src: toml::de::Error) -> ModelError {
        ModelError::Config(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for ModelError {
    fn from(src: toml::ser::Error) -> ModelError {
        ModelError::Serialization(format!("Toml serialization error: {src}"))
    }
}
