use std::collections::BTreeMap;

use crate::{
    canonical::{self, validate, Model},
    convert::{conversion, transition_ordinal},
    error::ModelError,
    key::Key,
    parse::{self, ParseTree},
    tree::scope::{ClassPath, Scope},
};

/// Convert a canonical model back into a parse tree.
///
/// The model is checked first, so every reference projects onto the local name its scope
/// expects. Generalization member lists are collected from the members' back-references and
/// class indexes from the attributes' index ordinals, both in key order. The resulting tree
/// must pass the completeness and cross-reference passes.
#[tracing::instrument(skip(model), fields(model = %model.key))]
pub fn from_canonical(model: &Model) -> Result<ParseTree, ModelError> {
    validate::check(model)?;

    let mut actor_members = Members::collect(model.actors.values().map(|actor| {
        (
            &actor.key,
            actor.superclass_of_key.as_ref(),
            actor.subclass_of_key.as_ref(),
        )
    }));
    let tree = ParseTree {
        name: model.name.clone(),
        details: model.details.clone(),
        invariants: model.invariants.iter().map(logic).collect(),
        actors: model
            .actors
            .values()
            .map(|actor| {
                (
                    name(&actor.key),
                    parse::Actor {
                        name: actor.name.clone(),
                        details: actor.details.clone(),
                        actor_type: actor.actor_type,
                        uml_comment: actor.uml_comment.clone(),
                    },
                )
            })
            .collect(),
        actor_generalizations: actor_members.generalizations(
            &model.actor_generalizations,
            parse::ActorGeneralization,
        )?,
        global_functions: model
            .global_functions
            .values()
            .map(|function| {
                (
                    name(&function.key),
                    parse::GlobalFunction {
                        name: function.name.clone(),
                        comment: function.comment.clone(),
                        parameters: function.parameters.clone(),
                        logic: logic(&function.logic),
                    },
                )
            })
            .collect(),
        domains: model
            .domains
            .values()
            .map(|domain| -> Result<_, ModelError> {
                Ok((name(&domain.key), convert_domain(domain)?))
            })
            .collect::<Result<_, ModelError>>()?,
        domain_associations: model
            .domain_associations
            .values()
            .map(|association| {
                (
                    name(&association.key),
                    parse::DomainAssociation {
                        problem_domain_key: name(&association.problem_domain_key),
                        solution_domain_key: name(&association.solution_domain_key),
                        uml_comment: association.uml_comment.clone(),
                    },
                )
            })
            .collect(),
        class_associations: associations(None, &model.class_associations)?,
        subdomain_sentinel: model.subdomain_sentinel.clone(),
    };

    crate::tree::validate(&tree, &model.subdomain_sentinel)?;
    tracing::info!(
        "[from_canonical] rebuilt tree '{}' with {} domains",
        tree.name,
        tree.domains.len()
    );
    Ok(tree)
}

/// Local name of a key, the form references take inside one scope.
fn name(key: &Key) -> String {
    key.name().to_string()
}

fn logic(logic: &canonical::Logic) -> parse::Logic {
    parse::Logic {
        description: logic.description.clone(),
        notation: logic.notation.as_str().to_string(),
        specification: logic.specification.clone(),
    }
}

fn logic_list(list: &[canonical::Logic]) -> Vec<parse::Logic> {
    list.iter().map(logic).collect()
}

/// Member lists of the generalizations of one scope, gathered from back-references.
#[derive(Default)]
struct Members {
    superclass: BTreeMap<Key, String>,
    subclasses: BTreeMap<Key, Vec<String>>,
}

impl Members {
    /// `members` yields each member's key with its `superclass_of_key` and `subclass_of_key`.
    fn collect<'m>(
        members: impl Iterator<Item = (&'m Key, Option<&'m Key>, Option<&'m Key>)>,
    ) -> Members {
        let mut collected = Members::default();
        for (member, superclass_of, subclass_of) in members {
            if let Some(generalization) = superclass_of {
                collected
                    .superclass
                    .insert(generalization.clone(), name(member));
            }
            if let Some(generalization) = subclass_of {
                collected
                    .subclasses
                    .entry(generalization.clone())
                    .or_default()
                    .push(name(member));
            }
        }
        collected
    }

    fn generalizations<T>(
        &mut self,
        generalizations: &BTreeMap<Key, canonical::Generalization>,
        wrap: fn(parse::Generalization) -> T,
    ) -> Result<BTreeMap<String, T>, ModelError> {
        let mut converted = BTreeMap::new();
        for generalization in generalizations.values() {
            let key = &generalization.key;
            let superclass_key = self
                .superclass
                .remove(key)
                .ok_or_else(|| conversion(format!("no member is the superclass of '{key}'")))?;
            let subclass_keys = self.subclasses.remove(key).unwrap_or_default();
            converted.insert(
                name(key),
                wrap(parse::Generalization {
                    name: generalization.name.clone(),
                    details: generalization.details.clone(),
                    superclass_key,
                    subclass_keys,
                    is_complete: generalization.is_complete,
                    is_static: generalization.is_static,
                    uml_comment: generalization.uml_comment.clone(),
                }),
            );
        }
        Ok(converted)
    }
}

fn convert_domain(domain: &canonical::Domain) -> Result<parse::Domain, ModelError> {
    Ok(parse::Domain {
        name: domain.name.clone(),
        details: domain.details.clone(),
        realized: domain.realized,
        uml_comment: domain.uml_comment.clone(),
        subdomains: domain
            .subdomains
            .values()
            .map(|subdomain| -> Result<_, ModelError> {
                Ok((name(&subdomain.key), convert_subdomain(subdomain)?))
            })
            .collect::<Result<_, ModelError>>()?,
        class_associations: associations(Some(&domain.key), &domain.class_associations)?,
    })
}

fn convert_subdomain(subdomain: &canonical::Subdomain) -> Result<parse::Subdomain, ModelError> {
    let mut class_members = Members::collect(subdomain.classes.values().map(|class| {
        (
            &class.key,
            class.superclass_of_key.as_ref(),
            class.subclass_of_key.as_ref(),
        )
    }));
    let mut use_case_members = Members::collect(subdomain.use_cases.values().map(|use_case| {
        (
            &use_case.key,
            use_case.superclass_of_key.as_ref(),
            use_case.subclass_of_key.as_ref(),
        )
    }));
    Ok(parse::Subdomain {
        name: subdomain.name.clone(),
        details: subdomain.details.clone(),
        uml_comment: subdomain.uml_comment.clone(),
        classes: subdomain
            .classes
            .values()
            .map(|class| -> Result<_, ModelError> {
                Ok((name(&class.key), convert_class(class)?))
            })
            .collect::<Result<_, ModelError>>()?,
        generalizations: class_members
            .generalizations(&subdomain.generalizations, parse::ClassGeneralization)?,
        class_associations: associations(Some(&subdomain.key), &subdomain.class_associations)?,
        use_cases: subdomain
            .use_cases
            .values()
            .map(|use_case| (name(&use_case.key), convert_use_case(use_case)))
            .collect(),
        use_case_generalizations: use_case_members.generalizations(
            &subdomain.use_case_generalizations,
            parse::UseCaseGeneralization,
        )?,
    })
}

fn convert_class(class: &canonical::Class) -> Result<parse::Class, ModelError> {
    let mut indexes: Vec<Vec<String>> = Vec::new();
    for attribute in class.attributes.values() {
        for &num in attribute.index_nums.iter() {
            if indexes.len() <= num {
                indexes.resize_with(num + 1, Vec::new);
            }
            indexes[num].push(name(&attribute.key));
        }
    }
    if let Some(idx) = indexes.iter().position(Vec::is_empty) {
        return Err(conversion(format!(
            "index {idx} of '{}' has no attributes",
            class.key
        )));
    }

    let state_machine = if class.has_state_machine() {
        Some(convert_state_machine(class)?)
    } else {
        None
    };
    Ok(parse::Class {
        name: class.name.clone(),
        details: class.details.clone(),
        actor_key: class.actor_key.as_ref().map(name),
        uml_comment: class.uml_comment.clone(),
        attributes: class
            .attributes
            .values()
            .map(|attribute| {
                (
                    name(&attribute.key),
                    parse::Attribute {
                        name: attribute.name.clone(),
                        details: attribute.details.clone(),
                        data_type_rules: attribute.data_type_rules.clone(),
                        derivation_policy: attribute.derivation_policy.as_ref().map(logic),
                        nullable: attribute.nullable,
                        uml_comment: attribute.uml_comment.clone(),
                    },
                )
            })
            .collect(),
        indexes,
        state_machine,
        actions: class
            .actions
            .values()
            .map(|action| {
                (
                    name(&action.key),
                    parse::Action {
                        name: action.name.clone(),
                        details: action.details.clone(),
                        parameters: action.parameters.clone(),
                        requires: logic_list(&action.requires),
                        guarantees: logic_list(&action.guarantees),
                    },
                )
            })
            .collect(),
        queries: class
            .queries
            .values()
            .map(|query| {
                (
                    name(&query.key),
                    parse::Query {
                        name: query.name.clone(),
                        details: query.details.clone(),
                        parameters: query.parameters.clone(),
                        requires: logic_list(&query.requires),
                        guarantees: logic_list(&query.guarantees),
                    },
                )
            })
            .collect(),
    })
}

fn convert_state_machine(class: &canonical::Class) -> Result<parse::StateMachine, ModelError> {
    let mut transitions = class
        .transitions
        .values()
        .map(|transition| -> Result<(usize, parse::Transition), ModelError> {
            let ordinal = transition_ordinal(&transition.key).ok_or_else(|| {
                conversion(format!(
                    "transition key '{}' carries no ordinal",
                    transition.key
                ))
            })?;
            Ok((
                ordinal,
                parse::Transition {
                    from_state_key: transition.path.from_state().map(name),
                    to_state_key: transition.path.to_state().map(name),
                    event_key: name(&transition.event_key),
                    guard_key: transition.guard_key.as_ref().map(name),
                    action_key: transition.action_key.as_ref().map(name),
                    uml_comment: transition.uml_comment.clone(),
                },
            ))
        })
        .collect::<Result<Vec<_>, ModelError>>()?;
    transitions.sort_by_key(|(ordinal, _)| *ordinal);

    Ok(parse::StateMachine {
        states: class
            .states
            .values()
            .map(|state| {
                (
                    name(&state.key),
                    parse::State {
                        name: state.name.clone(),
                        details: state.details.clone(),
                        uml_comment: state.uml_comment.clone(),
                        actions: state
                            .actions
                            .iter()
                            .map(|action| parse::StateAction {
                                action_key: name(&action.action_key),
                                when: action.when.as_str().to_string(),
                            })
                            .collect(),
                    },
                )
            })
            .collect(),
        events: class
            .events
            .values()
            .map(|event| {
                (
                    name(&event.key),
                    parse::Event {
                        name: event.name.clone(),
                        details: event.details.clone(),
                        parameters: event.parameters.clone(),
                    },
                )
            })
            .collect(),
        guards: class
            .guards
            .values()
            .map(|guard| {
                (
                    name(&guard.key),
                    parse::Guard {
                        name: guard.name.clone(),
                        details: guard.details.clone(),
                        logic: logic(&guard.logic),
                    },
                )
            })
            .collect(),
        transitions: transitions
            .into_iter()
            .map(|(_, transition)| transition)
            .collect(),
    })
}

/// Associations owned by `owner`, with endpoints written relative to its scope.
fn associations(
    owner: Option<&Key>,
    associations: &BTreeMap<Key, canonical::ClassAssociation>,
) -> Result<BTreeMap<String, parse::ClassAssociation>, ModelError> {
    let scope = Scope::from_owner(owner).ok_or_else(|| {
        conversion("class associations belong to the model, a domain or a subdomain")
    })?;
    let reference = |class: &Key| -> Result<String, ModelError> {
        ClassPath::from_key(class)
            .and_then(|path| scope.reference(&path))
            .ok_or_else(|| conversion(format!("'{class}' cannot be referenced at {scope} level")))
    };
    let mut converted = BTreeMap::new();
    for association in associations.values() {
        converted.insert(
            name(&association.key),
            parse::ClassAssociation {
                name: association.name.clone(),
                details: association.details.clone(),
                from_class_key: reference(&association.from_class_key)?,
                from_multiplicity: association.from_multiplicity.to_string(),
                to_class_key: reference(&association.to_class_key)?,
                to_multiplicity: association.to_multiplicity.to_string(),
                association_class_key: association
                    .association_class_key
                    .as_ref()
                    .map(reference)
                    .transpose()?,
                uml_comment: association.uml_comment.clone(),
            },
        );
    }
    Ok(converted)
}

fn convert_use_case(use_case: &canonical::UseCase) -> parse::UseCase {
    parse::UseCase {
        name: use_case.name.clone(),
        details: use_case.details.clone(),
        level: use_case.level,
        read_only: use_case.read_only,
        actors: use_case
            .actors
            .iter()
            .map(|(class, actor)| {
                (
                    name(class),
                    parse::UseCaseActor {
                        uml_comment: actor.uml_comment.clone(),
                    },
                )
            })
            .collect(),
        shares: use_case
            .shares
            .iter()
            .map(|(shared, share)| {
                (
                    name(shared),
                    parse::UseCaseShared {
                        share_type: share.share_type,
                        uml_comment: share.uml_comment.clone(),
                    },
                )
            })
            .collect(),
        scenarios: use_case
            .scenarios
            .values()
            .map(|scenario| (name(&scenario.key), convert_scenario(scenario)))
            .collect(),
    }
}

fn convert_scenario(scenario: &canonical::Scenario) -> parse::Scenario {
    parse::Scenario {
        name: scenario.name.clone(),
        details: scenario.details.clone(),
        objects: scenario
            .objects
            .values()
            .map(|object| {
                (
                    name(&object.key),
                    parse::ScenarioObject {
                        object_number: object.object_number,
                        name: object.name.clone(),
                        name_style: object.name_style,
                        class_key: name(&object.class_key),
                        multi: object.multi,
                        uml_comment: object.uml_comment.clone(),
                    },
                )
            })
            .collect(),
        steps: scenario.steps.as_ref().map(convert_step),
    }
}

fn convert_step(step: &canonical::Step) -> parse::Step {
    let statements = |steps: &[canonical::Step]| -> Vec<parse::Step> {
        steps.iter().map(convert_step).collect()
    };
    match step {
        canonical::Step::Sequence { statements: steps } => parse::Step::Sequence {
            statements: statements(steps),
        },
        canonical::Step::Loop {
            condition,
            statements: steps,
        } => parse::Step::Loop {
            condition: condition.clone(),
            statements: statements(steps),
        },
        canonical::Step::Switch { cases } => parse::Step::Switch {
            cases: cases
                .iter()
                .map(|case| parse::Case {
                    condition: case.condition.clone(),
                    statements: statements(&case.statements),
                })
                .collect(),
        },
        canonical::Step::Leaf(leaf) => parse::Step::Leaf(convert_leaf(leaf)),
    }
}

fn convert_leaf(leaf: &canonical::Leaf) -> parse::Leaf {
    match leaf {
        canonical::Leaf::Event {
            description,
            from_object_key,
            to_object_key,
            event_key,
        } => parse::Leaf::Event {
            description: description.clone(),
            from_object_key: name(from_object_key),
            to_object_key: name(to_object_key),
            event_key: name(event_key),
        },
        canonical::Leaf::Query {
            description,
            from_object_key,
            to_object_key,
            query_key,
        } => parse::Leaf::Query {
            description: description.clone(),
            from_object_key: name(from_object_key),
            to_object_key: name(to_object_key),
            query_key: name(query_key),
        },
        canonical::Leaf::Scenario {
            description,
            from_object_key,
            to_object_key,
            scenario_key,
        } => parse::Leaf::Scenario {
            description: description.clone(),
            from_object_key: from_object_key.as_ref().map(name),
            to_object_key: to_object_key.as_ref().map(name),
            scenario_key: name(scenario_key),
        },
        canonical::Leaf::Delete {
            description,
            from_object_key,
        } => parse::Leaf::Delete {
            description: description.clone(),
            from_object_key: name(from_object_key),
        },
    }
}
