use serde::{Deserialize, Serialize};
use std::ops::Deref;

use crate::{
    error::{ErrorCode, ParseError},
    parse::{Entity, FileKind, Rules},
};

/// A superclass and the subclasses that specialize it. The same shape is used for actors,
/// classes and use cases; the wrappers below tie it to the right file kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generalization {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    pub superclass_key: String,
    /// Members in any order; converting through the canonical model sorts them by key.
    pub subclass_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "crate::parse::is_false")]
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "crate::parse::is_false")]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uml_comment: String,
}

impl Generalization {
    pub fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(&self.name, ErrorCode::GeneralizationNameRequired, "name")?;
        rules.required(
            &self.superclass_key,
            ErrorCode::GeneralizationSuperclassRequired,
            "superclass_key",
        )?;
        rules.non_empty_items(
            &self.subclass_keys,
            ErrorCode::GeneralizationSubclassesRequired,
            ErrorCode::GeneralizationSubclassBlank,
            "subclass_keys",
        )
    }
}

macro_rules! generalization_kind {
    ($name:ident, $kind:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Generalization);

        impl Deref for $name {
            type Target = Generalization;

            fn deref(&self) -> &Generalization {
                &self.0
            }
        }

        impl Entity for $name {
            const KIND: FileKind = $kind;

            fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
                self.0.validate(rules)
            }
        }
    };
}

generalization_kind!(
    ActorGeneralization,
    FileKind::ActorGeneralization,
    "Generalization between actors, stored at model level."
);
generalization_kind!(
    ClassGeneralization,
    FileKind::ClassGeneralization,
    "Generalization between classes of one subdomain."
);
generalization_kind!(
    UseCaseGeneralization,
    FileKind::UseCaseGeneralization,
    "Generalization between use cases of one subdomain."
);
