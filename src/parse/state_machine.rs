use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    error::{ErrorCode, ParseError},
    parse::{
        logic::{self, validate_parameters},
        Entity, FileKind, Logic, Parameter, Rules,
    },
};

/// Moments of a state's lifecycle an action can be bound to.
pub const STATE_ACTION_WHEN: &[&str] = &["entry", "exit", "do"];

/// The lifecycle of a class, read from `state_machine.json` beside `class.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateMachine {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub states: BTreeMap<String, State>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub events: BTreeMap<String, Event>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub guards: BTreeMap<String, Guard>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<Transition>,
}

impl Entity for StateMachine {
    const KIND: FileKind = FileKind::StateMachine;

    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        for (key, state) in self.states.iter() {
            rules.map_key(key, "states")?;
            state
                .validate(rules)
                .map_err(|err| err.within(&format!("states.{key}")))?;
        }
        for (key, event) in self.events.iter() {
            rules.map_key(key, "events")?;
            rules
                .required(&event.name, ErrorCode::EventNameRequired, "name")
                .and_then(|_| validate_parameters(&event.parameters, rules))
                .map_err(|err| err.within(&format!("events.{key}")))?;
        }
        for (key, guard) in self.guards.iter() {
            rules.map_key(key, "guards")?;
            rules
                .required(&guard.name, ErrorCode::GuardNameRequired, "name")
                .and_then(|_| guard.logic.validate(rules).map_err(|err| err.within("logic")))
                .map_err(|err| err.within(&format!("guards.{key}")))?;
        }
        for (idx, transition) in self.transitions.iter().enumerate() {
            transition
                .validate(rules)
                .map_err(|err| err.within(&format!("transitions[{idx}]")))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uml_comment: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<StateAction>,
}

impl State {
    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(&self.name, ErrorCode::StateNameRequired, "name")?;
        for (idx, action) in self.actions.iter().enumerate() {
            rules
                .required(
                    &action.action_key,
                    ErrorCode::StateActionKeyRequired,
                    "action_key",
                )
                .and_then(|_| {
                    rules.one_of(
                        &action.when,
                        STATE_ACTION_WHEN,
                        ErrorCode::StateActionWhenInvalid,
                        "when",
                    )
                })
                .map_err(|err| err.within(&format!("actions[{idx}]")))?;
        }
        Ok(())
    }
}

/// An action bound to a state's `entry`, `exit` or `do` moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAction {
    pub action_key: String,
    pub when: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guard {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    pub logic: Logic,
}

/// A transition between states. A missing `from_state_key` marks an initial transition and a
/// missing `to_state_key` a final one; at least one of them must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_state_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_state_key: Option<String>,
    pub event_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_key: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uml_comment: String,
}

impl Transition {
    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(
            &self.event_key,
            ErrorCode::TransitionEventRequired,
            "event_key",
        )?;
        for (value, field) in [
            (&self.from_state_key, "from_state_key"),
            (&self.to_state_key, "to_state_key"),
            (&self.guard_key, "guard_key"),
            (&self.action_key, "action_key"),
        ] {
            rules.optional(value, ErrorCode::TransitionKeyBlank, field)?;
        }
        Ok(())
    }
}

/// Something a class does, read from `actions/<key>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<Logic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guarantees: Vec<Logic>,
}

impl Entity for Action {
    const KIND: FileKind = FileKind::Action;

    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(&self.name, ErrorCode::ActionNameRequired, "name")?;
        validate_contract(&self.parameters, &self.requires, &self.guarantees, rules)
    }
}

/// A read-only question a class answers, read from `queries/<key>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<Logic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guarantees: Vec<Logic>,
}

impl Entity for Query {
    const KIND: FileKind = FileKind::Query;

    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(&self.name, ErrorCode::QueryNameRequired, "name")?;
        validate_contract(&self.parameters, &self.requires, &self.guarantees, rules)
    }
}

fn validate_contract(
    parameters: &[Parameter],
    requires: &[Logic],
    guarantees: &[Logic],
    rules: &Rules<'_>,
) -> Result<(), ParseError> {
    validate_parameters(parameters, rules)?;
    logic::validate_all(requires, rules, "requires")?;
    logic::validate_all(guarantees, rules, "guarantees")
}
