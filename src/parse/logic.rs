use serde::{Deserialize, Serialize};

use crate::{error::ErrorCode, error::ParseError, parse::Rules};

/// Notations a logic specification may be written in. The text itself is carried opaquely.
pub const KNOWN_NOTATIONS: &[&str] = &["tla_plus"];

/// A logic specification: a prose description plus optional formal text in a named notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logic {
    pub description: String,
    pub notation: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub specification: String,
}

impl Logic {
    pub fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(
            &self.description,
            ErrorCode::LogicDescriptionRequired,
            "description",
        )?;
        rules.one_of(
            &self.notation,
            KNOWN_NOTATIONS,
            ErrorCode::LogicNotationInvalid,
            "notation",
        )
    }
}

/// Validate each entry of a logic list, reporting `field[idx]` paths.
pub fn validate_all(logic: &[Logic], rules: &Rules<'_>, field: &str) -> Result<(), ParseError> {
    for (idx, entry) in logic.iter().enumerate() {
        entry
            .validate(rules)
            .map_err(|err| err.within(&format!("{field}[{idx}]")))?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data_type_rules: String,
}

impl Parameter {
    pub fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(&self.name, ErrorCode::ParameterNameRequired, "name")
    }
}

pub fn validate_parameters(
    parameters: &[Parameter],
    rules: &Rules<'_>,
) -> Result<(), ParseError> {
    for (idx, parameter) in parameters.iter().enumerate() {
        parameter
            .validate(rules)
            .map_err(|err| err.within(&format!("parameters[{idx}]")))?;
    }
    Ok(())
}
