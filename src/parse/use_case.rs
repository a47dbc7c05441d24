use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    error::{ErrorCode, ParseError},
    parse::{Entity, FileKind, Rules},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseCaseLevel {
    Sky,
    Sea,
    Mud,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseCase {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    pub level: UseCaseLevel,
    #[serde(default, skip_serializing_if = "crate::parse::is_false")]
    pub read_only: bool,
    /// Participating actor classes, keyed by class key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub actors: BTreeMap<String, UseCaseActor>,
    /// Other use cases this one includes or extends, keyed by use case key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub shares: BTreeMap<String, UseCaseShared>,

    #[serde(skip)]
    pub scenarios: BTreeMap<String, Scenario>,
}

impl Entity for UseCase {
    const KIND: FileKind = FileKind::UseCase;

    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(&self.name, ErrorCode::UseCaseNameRequired, "name")?;
        for key in self.actors.keys() {
            rules.map_key(key, "actors")?;
        }
        for key in self.shares.keys() {
            rules.map_key(key, "shares")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseCaseActor {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uml_comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareType {
    Include,
    Extend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseCaseShared {
    pub share_type: ShareType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uml_comment: String,
}

/// One concrete run through a use case, read from `scenarios/<key>.scenario.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub objects: BTreeMap<String, ScenarioObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Step>,
}

impl Entity for Scenario {
    const KIND: FileKind = FileKind::Scenario;

    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(&self.name, ErrorCode::ScenarioNameRequired, "name")?;
        for (key, object) in self.objects.iter() {
            rules.map_key(key, "objects")?;
            object
                .validate(rules)
                .map_err(|err| err.within(&format!("objects.{key}")))?;
        }
        if let Some(steps) = &self.steps {
            steps.validate(rules).map_err(|err| err.within("steps"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameStyle {
    #[default]
    Name,
    Id,
    Unnamed,
}

/// An instance of a class taking part in a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioObject {
    #[serde(default)]
    pub object_number: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub name_style: NameStyle,
    pub class_key: String,
    #[serde(default, skip_serializing_if = "crate::parse::is_false")]
    pub multi: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uml_comment: String,
}

impl ScenarioObject {
    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(
            &self.class_key,
            ErrorCode::ScenarioObjectClassRequired,
            "class_key",
        )?;
        if self.name_style == NameStyle::Name {
            rules.required(&self.name, ErrorCode::ScenarioObjectNameRequired, "name")?;
        }
        Ok(())
    }
}

/// A node of a scenario's step tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step_type", rename_all = "snake_case")]
pub enum Step {
    Sequence {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        statements: Vec<Step>,
    },
    Loop {
        condition: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        statements: Vec<Step>,
    },
    Switch {
        cases: Vec<Case>,
    },
    Leaf(Leaf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub condition: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statements: Vec<Step>,
}

/// A single interaction between scenario objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "leaf_type", rename_all = "snake_case")]
pub enum Leaf {
    Event {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        description: String,
        from_object_key: String,
        to_object_key: String,
        event_key: String,
    },
    Query {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        description: String,
        from_object_key: String,
        to_object_key: String,
        query_key: String,
    },
    Scenario {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_object_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to_object_key: Option<String>,
        scenario_key: String,
    },
    Delete {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        description: String,
        from_object_key: String,
    },
}

impl Step {
    /// Child steps in order, across every case of a switch.
    pub fn children(&self) -> Vec<&Step> {
        match self {
            Step::Sequence { statements } | Step::Loop { statements, .. } => {
                statements.iter().collect()
            }
            Step::Switch { cases } => cases.iter().flat_map(|c| c.statements.iter()).collect(),
            Step::Leaf(_) => Vec::new(),
        }
    }

    /// Every leaf of this step tree, depth first.
    pub fn leaves(&self) -> Vec<&Leaf> {
        match self {
            Step::Leaf(leaf) => vec![leaf],
            _ => self.children().into_iter().flat_map(Step::leaves).collect(),
        }
    }

    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        match self {
            Step::Sequence { statements } => validate_statements(statements, rules),
            Step::Loop {
                condition,
                statements,
            } => {
                rules.required(condition, ErrorCode::StepConditionRequired, "condition")?;
                validate_statements(statements, rules)
            }
            Step::Switch { cases } => {
                if cases.is_empty() {
                    return Err(rules
                        .error(
                            ErrorCode::StepCasesRequired,
                            "a switch step must have at least one case",
                        )
                        .with_field("cases"));
                }
                for (idx, case) in cases.iter().enumerate() {
                    rules
                        .required(&case.condition, ErrorCode::StepConditionRequired, "condition")
                        .and_then(|_| validate_statements(&case.statements, rules))
                        .map_err(|err| err.within(&format!("cases[{idx}]")))?;
                }
                Ok(())
            }
            Step::Leaf(leaf) => leaf.validate(rules),
        }
    }
}

fn validate_statements(statements: &[Step], rules: &Rules<'_>) -> Result<(), ParseError> {
    for (idx, step) in statements.iter().enumerate() {
        step.validate(rules)
            .map_err(|err| err.within(&format!("statements[{idx}]")))?;
    }
    Ok(())
}

impl Leaf {
    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        let code = ErrorCode::StepKeyRequired;
        match self {
            Leaf::Event {
                from_object_key,
                to_object_key,
                event_key,
                ..
            } => {
                rules.required(from_object_key, code, "from_object_key")?;
                rules.required(to_object_key, code, "to_object_key")?;
                rules.required(event_key, code, "event_key")
            }
            Leaf::Query {
                from_object_key,
                to_object_key,
                query_key,
                ..
            } => {
                rules.required(from_object_key, code, "from_object_key")?;
                rules.required(to_object_key, code, "to_object_key")?;
                rules.required(query_key, code, "query_key")
            }
            Leaf::Scenario {
                from_object_key,
                to_object_key,
                scenario_key,
                ..
            } => {
                rules.optional(from_object_key, code, "from_object_key")?;
                rules.optional(to_object_key, code, "to_object_key")?;
                rules.required(scenario_key, code, "scenario_key")
            }
            Leaf::Delete {
                from_object_key, ..
            } => rules.required(from_object_key, code, "from_object_key"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::MetadataFormat,
        parse::{parse_entity, SchemaRegistry},
    };
    use std::path::Path;
    use test_log::test;

    fn parse(raw: &str) -> Result<Scenario, ParseError> {
        parse_entity(
            &SchemaRegistry::new(),
            raw.as_bytes(),
            Path::new("scenarios/happy.scenario.json"),
            MetadataFormat::Json,
        )
    }

    #[test]
    fn test_step_tree_parses_into_variants() {
        let scenario = parse(
            r#"{ "name": "Happy path",
                 "objects": {
                     "shopper": { "object_number": 1, "name": "Sam", "class_key": "customer" },
                     "cart": { "name_style": "unnamed", "class_key": "order" } },
                 "steps": { "step_type": "sequence", "statements": [
                     { "step_type": "leaf", "leaf_type": "event", "from_object_key": "shopper",
                       "to_object_key": "cart", "event_key": "add_item" },
                     { "step_type": "switch", "cases": [
                         { "condition": "in stock", "statements": [
                             { "step_type": "leaf", "leaf_type": "delete", "from_object_key": "cart" } ] } ] } ] } }"#,
        )
        .unwrap();
        let steps = scenario.steps.as_ref().unwrap();
        assert!(matches!(steps, Step::Sequence { statements } if statements.len() == 2));
        let leaves = steps.leaves();
        assert_eq!(leaves.len(), 2);
        assert!(matches!(leaves[1], Leaf::Delete { from_object_key, .. } if from_object_key == "cart"));

        let text = serde_json::to_value(steps).unwrap();
        assert_eq!(text["statements"][0]["step_type"], "leaf");
        assert_eq!(text["statements"][0]["leaf_type"], "event");
    }

    #[test]
    fn test_nested_step_paths() {
        let err = parse(
            r#"{ "name": "Retry",
                 "steps": { "step_type": "sequence", "statements": [
                     { "step_type": "loop", "condition": "", "statements": [] } ] } }"#,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::StepConditionRequired);
        assert_eq!(err.field.as_deref(), Some("steps.statements[0].condition"));

        let err = parse(
            r#"{ "name": "Retry",
                 "steps": { "step_type": "switch", "cases": [
                     { "condition": "a", "statements": [
                         { "step_type": "leaf", "leaf_type": "query", "from_object_key": "a",
                           "to_object_key": "b", "query_key": " " } ] } ] } }"#,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::StepKeyRequired);
        assert_eq!(
            err.field.as_deref(),
            Some("steps.cases[0].statements[0].query_key")
        );
    }

    #[test]
    fn test_switch_needs_cases() {
        let err = parse(r#"{ "name": "Empty", "steps": { "step_type": "switch", "cases": [] } }"#)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::StepCasesRequired);
        assert_eq!(err.field.as_deref(), Some("steps.cases"));
    }

    #[test]
    fn test_unknown_step_type_is_schema_violation() {
        let err = parse(r#"{ "name": "Odd", "steps": { "step_type": "parallel" } }"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::ScenarioSchemaViolation);
        assert!(err.schema.is_some());
    }

    #[test]
    fn test_object_name_depends_on_style() {
        let err = parse(r#"{ "name": "A", "objects": { "sam": { "class_key": "customer" } } }"#)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ScenarioObjectNameRequired);
        assert_eq!(err.field.as_deref(), Some("objects.sam.name"));
        assert!(parse(
            r#"{ "name": "A", "objects": { "sam": { "name_style": "id", "class_key": "customer" } } }"#
        )
        .is_ok());
    }

    #[test]
    fn test_use_case_level_enforced_by_schema() {
        let err = parse_entity::<UseCase>(
            &SchemaRegistry::new(),
            br#"{ "name": "Buy", "level": "cloud" }"#,
            Path::new("use_cases/buy/use_case.json"),
            MetadataFormat::Json,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::UseCaseSchemaViolation);
    }
}
