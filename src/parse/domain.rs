use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    error::{ErrorCode, ParseError},
    parse::{
        Class, ClassAssociation, ClassGeneralization, Entity, FileKind, Rules, UseCase,
        UseCaseGeneralization,
    },
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    #[serde(default, skip_serializing_if = "crate::parse::is_false")]
    pub realized: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uml_comment: String,

    #[serde(skip)]
    pub subdomains: BTreeMap<String, Subdomain>,
    /// Associations between classes of different subdomains of this domain.
    #[serde(skip)]
    pub class_associations: BTreeMap<String, ClassAssociation>,
}

impl Entity for Domain {
    const KIND: FileKind = FileKind::Domain;

    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(&self.name, ErrorCode::DomainNameRequired, "name")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subdomain {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uml_comment: String,

    #[serde(skip)]
    pub classes: BTreeMap<String, Class>,
    #[serde(skip)]
    pub generalizations: BTreeMap<String, ClassGeneralization>,
    #[serde(skip)]
    pub class_associations: BTreeMap<String, ClassAssociation>,
    #[serde(skip)]
    pub use_cases: BTreeMap<String, UseCase>,
    #[serde(skip)]
    pub use_case_generalizations: BTreeMap<String, UseCaseGeneralization>,
}

impl Entity for Subdomain {
    const KIND: FileKind = FileKind::Subdomain;

    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(&self.name, ErrorCode::SubdomainNameRequired, "name")
    }
}
