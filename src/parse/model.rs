use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    config::default_subdomain_sentinel,
    error::{ErrorCode, ParseError},
    parse::{
        logic::{self, Logic},
        ActorGeneralization, ClassAssociation, Domain, Entity, FileKind, Rules,
    },
};

/// The root record of a model tree, read from `model.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invariants: Vec<Logic>,

    #[serde(skip)]
    pub actors: BTreeMap<String, Actor>,
    #[serde(skip)]
    pub actor_generalizations: BTreeMap<String, ActorGeneralization>,
    #[serde(skip)]
    pub global_functions: BTreeMap<String, GlobalFunction>,
    #[serde(skip)]
    pub domains: BTreeMap<String, Domain>,
    #[serde(skip)]
    pub domain_associations: BTreeMap<String, DomainAssociation>,
    /// Associations between classes of different domains.
    #[serde(skip)]
    pub class_associations: BTreeMap<String, ClassAssociation>,
    /// Name a domain's only subdomain carries in this tree. Taken from the reader's config,
    /// never from `model.json`.
    #[serde(skip, default = "default_subdomain_sentinel")]
    pub subdomain_sentinel: String,
}

impl Entity for Model {
    const KIND: FileKind = FileKind::Model;

    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(&self.name, ErrorCode::ModelNameRequired, "name")?;
        logic::validate_all(&self.invariants, rules, "invariants")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    Person,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    pub actor_type: ActorType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uml_comment: String,
}

impl Entity for Actor {
    const KIND: FileKind = FileKind::Actor;

    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(&self.name, ErrorCode::ActorNameRequired, "name")
    }
}

/// A function callable from any logic specification in the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalFunction {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<String>,
    pub logic: Logic,
}

impl Entity for GlobalFunction {
    const KIND: FileKind = FileKind::GlobalFunction;

    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(&self.name, ErrorCode::GlobalFunctionNameRequired, "name")?;
        rules.items(
            &self.parameters,
            ErrorCode::GlobalFunctionParameterBlank,
            "parameters",
        )?;
        self.logic
            .validate(rules)
            .map_err(|err| err.within("logic"))
    }
}

/// A problem domain relying on a solution domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainAssociation {
    pub problem_domain_key: String,
    pub solution_domain_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uml_comment: String,
}

impl Entity for DomainAssociation {
    const KIND: FileKind = FileKind::DomainAssociation;

    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(
            &self.problem_domain_key,
            ErrorCode::DomainAssociationProblemRequired,
            "problem_domain_key",
        )?;
        rules.required(
            &self.solution_domain_key,
            ErrorCode::DomainAssociationSolutionRequired,
            "solution_domain_key",
        )
    }
}
