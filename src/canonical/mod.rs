//! The canonical model: every entity addressed by its [`Key`], every reference stored as a
//! `Key`, and the parts of a class's state machine held as peer maps on the class.
//!
//! Values here are produced by [`crate::to_canonical`] and treated as immutable by the
//! consumers of the model.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use crate::{
    key::Key,
    parse::{ActorType, NameStyle, Parameter, ShareType, UseCaseLevel},
};

pub mod validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Key of the model itself, supplied by the caller when converting.
    pub key: String,
    pub name: String,
    pub details: String,
    pub invariants: Vec<Logic>,
    pub actors: BTreeMap<Key, Actor>,
    pub actor_generalizations: BTreeMap<Key, Generalization>,
    pub global_functions: BTreeMap<Key, GlobalFunction>,
    pub domains: BTreeMap<Key, Domain>,
    pub domain_associations: BTreeMap<Key, DomainAssociation>,
    pub class_associations: BTreeMap<Key, ClassAssociation>,
    /// Name a domain's only subdomain carries, restored onto the tree by `from_canonical`.
    #[serde(default = "crate::config::default_subdomain_sentinel")]
    pub subdomain_sentinel: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notation {
    TlaPlus,
}

impl Notation {
    pub fn as_str(self) -> &'static str {
        match self {
            Notation::TlaPlus => "tla_plus",
        }
    }
}

impl FromStr for Notation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tla_plus" => Ok(Notation::TlaPlus),
            other => Err(format!("unknown logic notation '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logic {
    pub description: String,
    pub notation: Notation,
    pub specification: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub key: Key,
    pub name: String,
    pub details: String,
    pub actor_type: ActorType,
    pub uml_comment: String,
    /// Generalization this actor is the superclass of.
    pub superclass_of_key: Option<Key>,
    /// Generalization this actor is a subclass in.
    pub subclass_of_key: Option<Key>,
}

/// A generalization. Its members carry the back-references to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generalization {
    pub key: Key,
    pub name: String,
    pub details: String,
    pub is_complete: bool,
    pub is_static: bool,
    pub uml_comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalFunction {
    pub key: Key,
    pub name: String,
    pub comment: String,
    pub parameters: Vec<String>,
    pub logic: Logic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub key: Key,
    pub name: String,
    pub details: String,
    pub realized: bool,
    pub uml_comment: String,
    pub subdomains: BTreeMap<Key, Subdomain>,
    pub class_associations: BTreeMap<Key, ClassAssociation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainAssociation {
    pub key: Key,
    pub problem_domain_key: Key,
    pub solution_domain_key: Key,
    pub uml_comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subdomain {
    pub key: Key,
    pub name: String,
    pub details: String,
    pub uml_comment: String,
    pub classes: BTreeMap<Key, Class>,
    pub generalizations: BTreeMap<Key, Generalization>,
    pub class_associations: BTreeMap<Key, ClassAssociation>,
    pub use_cases: BTreeMap<Key, UseCase>,
    pub use_case_generalizations: BTreeMap<Key, Generalization>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub key: Key,
    pub name: String,
    pub details: String,
    pub actor_key: Option<Key>,
    pub uml_comment: String,
    pub superclass_of_key: Option<Key>,
    pub subclass_of_key: Option<Key>,
    pub attributes: BTreeMap<Key, Attribute>,
    pub states: BTreeMap<Key, State>,
    pub events: BTreeMap<Key, Event>,
    pub guards: BTreeMap<Key, Guard>,
    pub transitions: BTreeMap<Key, Transition>,
    pub actions: BTreeMap<Key, Action>,
    pub queries: BTreeMap<Key, Query>,
}

impl Class {
    /// Whether any state machine part exists.
    pub fn has_state_machine(&self) -> bool {
        !(self.states.is_empty()
            && self.events.is_empty()
            && self.guards.is_empty()
            && self.transitions.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: Key,
    pub name: String,
    pub details: String,
    pub data_type_rules: String,
    pub derivation_policy: Option<Logic>,
    pub nullable: bool,
    pub uml_comment: String,
    /// Ordinals of the class indexes this attribute belongs to, ascending.
    pub index_nums: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum When {
    Entry,
    Exit,
    Do,
}

impl When {
    pub fn as_str(self) -> &'static str {
        match self {
            When::Entry => "entry",
            When::Exit => "exit",
            When::Do => "do",
        }
    }
}

impl FromStr for When {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" => Ok(When::Entry),
            "exit" => Ok(When::Exit),
            "do" => Ok(When::Do),
            other => Err(format!("'{other}' is not one of entry, exit, do")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAction {
    pub action_key: Key,
    pub when: When,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub key: Key,
    pub name: String,
    pub details: String,
    pub uml_comment: String,
    pub actions: Vec<StateAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub key: Key,
    pub name: String,
    pub details: String,
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guard {
    pub key: Key,
    pub name: String,
    pub details: String,
    pub logic: Logic,
}

/// The states a transition connects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum TransitionPath {
    /// Enters the state machine.
    Initial { to: Key },
    /// Leaves the state machine.
    Final { from: Key },
    Between { from: Key, to: Key },
}

impl TransitionPath {
    pub fn from_state(&self) -> Option<&Key> {
        match self {
            TransitionPath::Initial { .. } => None,
            TransitionPath::Final { from } | TransitionPath::Between { from, .. } => Some(from),
        }
    }

    pub fn to_state(&self) -> Option<&Key> {
        match self {
            TransitionPath::Final { .. } => None,
            TransitionPath::Initial { to } | TransitionPath::Between { to, .. } => Some(to),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub key: Key,
    pub path: TransitionPath,
    pub event_key: Key,
    pub guard_key: Option<Key>,
    pub action_key: Option<Key>,
    pub uml_comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub key: Key,
    pub name: String,
    pub details: String,
    pub parameters: Vec<Parameter>,
    pub requires: Vec<Logic>,
    pub guarantees: Vec<Logic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub key: Key,
    pub name: String,
    pub details: String,
    pub parameters: Vec<Parameter>,
    pub requires: Vec<Logic>,
    pub guarantees: Vec<Logic>,
}

/// How many instances may take part at one end of an association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Multiplicity {
    /// `N`
    Exactly(u32),
    /// `N..M`, with `M >= N`
    Range(u32, u32),
    /// `N..*`
    AtLeast(u32),
    /// `*`
    Any,
}

impl FromStr for Multiplicity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bound = |part: &str| {
            let invalid = || format!("multiplicity '{s}' must be N, N..M, N..* or *");
            // Digits only and no leading zero, so the text form is unique.
            if part.is_empty()
                || !part.bytes().all(|b| b.is_ascii_digit())
                || (part.len() > 1 && part.starts_with('0'))
            {
                return Err(invalid());
            }
            part.parse::<u32>().map_err(|_| invalid())
        };
        match s.split_once("..") {
            None if s == "*" => Ok(Multiplicity::Any),
            None => Ok(Multiplicity::Exactly(bound(s)?)),
            Some((lower, "*")) => Ok(Multiplicity::AtLeast(bound(lower)?)),
            Some((lower, upper)) => {
                let (lower, upper) = (bound(lower)?, bound(upper)?);
                if upper < lower {
                    return Err(format!(
                        "multiplicity '{s}' has an upper bound below its lower bound"
                    ));
                }
                Ok(Multiplicity::Range(lower, upper))
            }
        }
    }
}

impl Display for Multiplicity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Multiplicity::Exactly(n) => write!(f, "{n}"),
            Multiplicity::Range(lower, upper) => write!(f, "{lower}..{upper}"),
            Multiplicity::AtLeast(n) => write!(f, "{n}..*"),
            Multiplicity::Any => f.write_str("*"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassAssociation {
    pub key: Key,
    pub name: String,
    pub details: String,
    pub from_class_key: Key,
    pub from_multiplicity: Multiplicity,
    pub to_class_key: Key,
    pub to_multiplicity: Multiplicity,
    pub association_class_key: Option<Key>,
    pub uml_comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseCase {
    pub key: Key,
    pub name: String,
    pub details: String,
    pub level: UseCaseLevel,
    pub read_only: bool,
    pub superclass_of_key: Option<Key>,
    pub subclass_of_key: Option<Key>,
    /// Participating actor classes.
    pub actors: BTreeMap<Key, UseCaseActor>,
    /// Use cases this one includes or extends.
    pub shares: BTreeMap<Key, UseCaseShared>,
    pub scenarios: BTreeMap<Key, Scenario>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseCaseActor {
    pub uml_comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseCaseShared {
    pub share_type: ShareType,
    pub uml_comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub key: Key,
    pub name: String,
    pub details: String,
    pub objects: BTreeMap<Key, ScenarioObject>,
    pub steps: Option<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioObject {
    pub key: Key,
    pub object_number: u32,
    pub name: String,
    pub name_style: NameStyle,
    pub class_key: Key,
    pub multi: bool,
    pub uml_comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step_type", rename_all = "snake_case")]
pub enum Step {
    Sequence { statements: Vec<Step> },
    Loop { condition: String, statements: Vec<Step> },
    Switch { cases: Vec<Case> },
    Leaf(Leaf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub condition: String,
    pub statements: Vec<Step>,
}

/// A scenario interaction. Object references are scenario object keys; events and queries
/// are keys on the class of the receiving object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "leaf_type", rename_all = "snake_case")]
pub enum Leaf {
    Event {
        description: String,
        from_object_key: Key,
        to_object_key: Key,
        event_key: Key,
    },
    Query {
        description: String,
        from_object_key: Key,
        to_object_key: Key,
        query_key: Key,
    },
    Scenario {
        description: String,
        from_object_key: Option<Key>,
        to_object_key: Option<Key>,
        scenario_key: Key,
    },
    Delete {
        description: String,
        from_object_key: Key,
    },
}
