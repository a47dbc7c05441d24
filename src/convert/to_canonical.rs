use std::collections::BTreeMap;

use crate::{
    canonical::{
        self, validate, Action, Actor, Attribute, Case, Class, ClassAssociation, Domain,
        DomainAssociation, Event, GlobalFunction, Guard, Leaf, Model, Multiplicity, Query, Scenario,
        ScenarioObject, State, StateAction, Step, Subdomain, Transition, TransitionPath, UseCase,
        UseCaseActor, UseCaseShared,
    },
    convert::{conversion, transition_name},
    error::ModelError,
    key::{validate_name, Key, KeyKind},
    parse::{self, ParseTree},
    tree::scope::Scope,
};

/// Convert a parse tree into the canonical model, keyed under `model_key`.
///
/// Keys are derived top-down from each parent key and the entity's local name. Textual
/// references are resolved through the scope they were written at, and generalization member
/// lists become back-references on the members. The result passes [`validate::check`] or an
/// error is returned.
#[tracing::instrument(skip(tree))]
pub fn to_canonical(tree: &ParseTree, model_key: &str) -> Result<Model, ModelError> {
    validate_name(model_key)?;

    let actor_generalizations = Inverted::new(
        KeyKind::ActorGeneralization,
        None,
        tree.actor_generalizations.iter().map(|(k, g)| (k, &g.0)),
    )?;
    let mut actors = BTreeMap::new();
    for (name, actor) in tree.actors.iter() {
        let key = Key::new(KeyKind::Actor, None, name)?;
        let (superclass_of_key, subclass_of_key) = actor_generalizations.member(name);
        actors.insert(
            key.clone(),
            Actor {
                key,
                name: actor.name.clone(),
                details: actor.details.clone(),
                actor_type: actor.actor_type,
                uml_comment: actor.uml_comment.clone(),
                superclass_of_key,
                subclass_of_key,
            },
        );
    }

    let mut global_functions = BTreeMap::new();
    for (name, function) in tree.global_functions.iter() {
        let key = Key::new(KeyKind::GlobalFunction, None, name)?;
        global_functions.insert(
            key.clone(),
            GlobalFunction {
                key,
                name: function.name.clone(),
                comment: function.comment.clone(),
                parameters: function.parameters.clone(),
                logic: logic(&function.logic)?,
            },
        );
    }

    let mut domains = BTreeMap::new();
    for (name, domain) in tree.domains.iter() {
        let domain = convert_domain(name, domain)?;
        domains.insert(domain.key.clone(), domain);
    }

    let mut domain_associations = BTreeMap::new();
    for (name, association) in tree.domain_associations.iter() {
        let key = Key::new(KeyKind::DomainAssociation, None, name)?;
        domain_associations.insert(
            key.clone(),
            DomainAssociation {
                key,
                problem_domain_key: Key::new(
                    KeyKind::Domain,
                    None,
                    &association.problem_domain_key,
                )?,
                solution_domain_key: Key::new(
                    KeyKind::Domain,
                    None,
                    &association.solution_domain_key,
                )?,
                uml_comment: association.uml_comment.clone(),
            },
        );
    }

    let model = Model {
        key: model_key.to_string(),
        name: tree.name.clone(),
        details: tree.details.clone(),
        invariants: logic_list(&tree.invariants)?,
        actors,
        actor_generalizations: actor_generalizations.generalizations,
        global_functions,
        domains,
        domain_associations,
        class_associations: associations(&Scope::Model, None, &tree.class_associations)?,
        subdomain_sentinel: tree.subdomain_sentinel.clone(),
    };
    validate::check(&model)?;
    tracing::info!(
        "[to_canonical] converted model '{}' with {} domains",
        model.key,
        model.domains.len()
    );
    Ok(model)
}

fn logic(logic: &parse::Logic) -> Result<canonical::Logic, ModelError> {
    Ok(canonical::Logic {
        description: logic.description.clone(),
        notation: logic.notation.parse().map_err(ModelError::Conversion)?,
        specification: logic.specification.clone(),
    })
}

fn logic_list(list: &[parse::Logic]) -> Result<Vec<canonical::Logic>, ModelError> {
    list.iter().map(logic).collect()
}

/// The generalizations of one scope, plus the back-reference each member receives.
struct Inverted {
    generalizations: BTreeMap<Key, canonical::Generalization>,
    superclass_of: BTreeMap<String, Key>,
    subclass_of: BTreeMap<String, Key>,
}

impl Inverted {
    fn new<'g>(
        kind: KeyKind,
        parent: Option<&Key>,
        entries: impl Iterator<Item = (&'g String, &'g parse::Generalization)>,
    ) -> Result<Inverted, ModelError> {
        let mut inverted = Inverted {
            generalizations: BTreeMap::new(),
            superclass_of: BTreeMap::new(),
            subclass_of: BTreeMap::new(),
        };
        for (name, generalization) in entries {
            let key = Key::new(kind, parent, name)?;
            claim(
                &mut inverted.superclass_of,
                &generalization.superclass_key,
                &key,
            )?;
            for subclass in generalization.subclass_keys.iter() {
                claim(&mut inverted.subclass_of, subclass, &key)?;
            }
            inverted.generalizations.insert(
                key.clone(),
                canonical::Generalization {
                    key,
                    name: generalization.name.clone(),
                    details: generalization.details.clone(),
                    is_complete: generalization.is_complete,
                    is_static: generalization.is_static,
                    uml_comment: generalization.uml_comment.clone(),
                },
            );
        }
        Ok(inverted)
    }

    /// `(superclass_of_key, subclass_of_key)` of the member named `member`.
    fn member(&self, member: &str) -> (Option<Key>, Option<Key>) {
        (
            self.superclass_of.get(member).cloned(),
            self.subclass_of.get(member).cloned(),
        )
    }
}

/// A member holds at most one back-reference per role.
fn claim(
    slots: &mut BTreeMap<String, Key>,
    member: &str,
    generalization: &Key,
) -> Result<(), ModelError> {
    if let Some(other) = slots.insert(member.to_string(), generalization.clone()) {
        return Err(conversion(format!(
            "'{member}' takes the same role in '{other}' and '{generalization}'"
        )));
    }
    Ok(())
}

fn convert_domain(name: &str, domain: &parse::Domain) -> Result<Domain, ModelError> {
    let key = Key::new(KeyKind::Domain, None, name)?;
    let mut subdomains = BTreeMap::new();
    for (subdomain_name, subdomain) in domain.subdomains.iter() {
        let subdomain = convert_subdomain(&key, subdomain_name, subdomain)?;
        subdomains.insert(subdomain.key.clone(), subdomain);
    }
    Ok(Domain {
        class_associations: associations(
            &Scope::domain(name),
            Some(&key),
            &domain.class_associations,
        )?,
        key,
        name: domain.name.clone(),
        details: domain.details.clone(),
        realized: domain.realized,
        uml_comment: domain.uml_comment.clone(),
        subdomains,
    })
}

fn convert_subdomain(
    domain: &Key,
    name: &str,
    subdomain: &parse::Subdomain,
) -> Result<Subdomain, ModelError> {
    let key = Key::new(KeyKind::Subdomain, Some(domain), name)?;
    let generalizations = Inverted::new(
        KeyKind::ClassGeneralization,
        Some(&key),
        subdomain.generalizations.iter().map(|(k, g)| (k, &g.0)),
    )?;
    let use_case_generalizations = Inverted::new(
        KeyKind::UseCaseGeneralization,
        Some(&key),
        subdomain
            .use_case_generalizations
            .iter()
            .map(|(k, g)| (k, &g.0)),
    )?;

    let mut classes = BTreeMap::new();
    for (class_name, class) in subdomain.classes.iter() {
        let class = convert_class(&key, class_name, class, &generalizations)?;
        classes.insert(class.key.clone(), class);
    }
    let mut use_cases = BTreeMap::new();
    for (use_case_name, use_case) in subdomain.use_cases.iter() {
        let use_case =
            convert_use_case(&key, use_case_name, use_case, &use_case_generalizations)?;
        use_cases.insert(use_case.key.clone(), use_case);
    }

    Ok(Subdomain {
        class_associations: associations(
            &Scope::subdomain(domain.name(), name),
            Some(&key),
            &subdomain.class_associations,
        )?,
        key,
        name: subdomain.name.clone(),
        details: subdomain.details.clone(),
        uml_comment: subdomain.uml_comment.clone(),
        classes,
        generalizations: generalizations.generalizations,
        use_cases,
        use_case_generalizations: use_case_generalizations.generalizations,
    })
}

fn convert_class(
    subdomain: &Key,
    name: &str,
    class: &parse::Class,
    generalizations: &Inverted,
) -> Result<Class, ModelError> {
    let key = Key::new(KeyKind::Class, Some(subdomain), name)?;
    let owner = Some(&key);

    let mut index_nums: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, index) in class.indexes.iter().enumerate() {
        for attribute in index.iter() {
            if !class.attributes.contains_key(attribute) {
                return Err(conversion(format!(
                    "index {idx} of '{key}' names attribute '{attribute}', which does not exist"
                )));
            }
            let nums = index_nums.entry(attribute.as_str()).or_default();
            if nums.last() == Some(&idx) {
                return Err(conversion(format!(
                    "index {idx} of '{key}' lists attribute '{attribute}' more than once"
                )));
            }
            nums.push(idx);
        }
    }
    let mut attributes = BTreeMap::new();
    for (attribute_name, attribute) in class.attributes.iter() {
        let attribute_key = Key::new(KeyKind::Attribute, owner, attribute_name)?;
        attributes.insert(
            attribute_key.clone(),
            Attribute {
                key: attribute_key,
                name: attribute.name.clone(),
                details: attribute.details.clone(),
                data_type_rules: attribute.data_type_rules.clone(),
                derivation_policy: attribute.derivation_policy.as_ref().map(logic).transpose()?,
                nullable: attribute.nullable,
                uml_comment: attribute.uml_comment.clone(),
                index_nums: index_nums.remove(attribute_name.as_str()).unwrap_or_default(),
            },
        );
    }

    let (superclass_of_key, subclass_of_key) = generalizations.member(name);
    let mut converted = Class {
        key: key.clone(),
        name: class.name.clone(),
        details: class.details.clone(),
        actor_key: class
            .actor_key
            .as_deref()
            .map(|actor| Key::new(KeyKind::Actor, None, actor))
            .transpose()?,
        uml_comment: class.uml_comment.clone(),
        superclass_of_key,
        subclass_of_key,
        attributes,
        states: BTreeMap::new(),
        events: BTreeMap::new(),
        guards: BTreeMap::new(),
        transitions: BTreeMap::new(),
        actions: BTreeMap::new(),
        queries: BTreeMap::new(),
    };
    if let Some(state_machine) = &class.state_machine {
        convert_state_machine(&mut converted, state_machine)?;
    }

    for (action_name, action) in class.actions.iter() {
        let action_key = Key::new(KeyKind::Action, owner, action_name)?;
        converted.actions.insert(
            action_key.clone(),
            Action {
                key: action_key,
                name: action.name.clone(),
                details: action.details.clone(),
                parameters: action.parameters.clone(),
                requires: logic_list(&action.requires)?,
                guarantees: logic_list(&action.guarantees)?,
            },
        );
    }
    for (query_name, query) in class.queries.iter() {
        let query_key = Key::new(KeyKind::Query, owner, query_name)?;
        converted.queries.insert(
            query_key.clone(),
            Query {
                key: query_key,
                name: query.name.clone(),
                details: query.details.clone(),
                parameters: query.parameters.clone(),
                requires: logic_list(&query.requires)?,
                guarantees: logic_list(&query.guarantees)?,
            },
        );
    }
    Ok(converted)
}

/// Spread a state machine over the peer maps of `class`.
fn convert_state_machine(
    class: &mut Class,
    state_machine: &parse::StateMachine,
) -> Result<(), ModelError> {
    let class_key = class.key.clone();
    let owner = Some(&class_key);
    for (name, state) in state_machine.states.iter() {
        let key = Key::new(KeyKind::State, owner, name)?;
        let actions = state
            .actions
            .iter()
            .map(|action| -> Result<StateAction, ModelError> {
                Ok(StateAction {
                    action_key: Key::new(KeyKind::Action, owner, &action.action_key)?,
                    when: action.when.parse().map_err(ModelError::Conversion)?,
                })
            })
            .collect::<Result<Vec<_>, ModelError>>()?;
        class.states.insert(
            key.clone(),
            State {
                key,
                name: state.name.clone(),
                details: state.details.clone(),
                uml_comment: state.uml_comment.clone(),
                actions,
            },
        );
    }
    for (name, event) in state_machine.events.iter() {
        let key = Key::new(KeyKind::Event, owner, name)?;
        class.events.insert(
            key.clone(),
            Event {
                key,
                name: event.name.clone(),
                details: event.details.clone(),
                parameters: event.parameters.clone(),
            },
        );
    }
    for (name, guard) in state_machine.guards.iter() {
        let key = Key::new(KeyKind::Guard, owner, name)?;
        class.guards.insert(
            key.clone(),
            Guard {
                key,
                name: guard.name.clone(),
                details: guard.details.clone(),
                logic: logic(&guard.logic)?,
            },
        );
    }
    for (idx, transition) in state_machine.transitions.iter().enumerate() {
        let state = |name: &str| Key::new(KeyKind::State, owner, name);
        let path = match (&transition.from_state_key, &transition.to_state_key) {
            (None, Some(to)) => TransitionPath::Initial { to: state(to)? },
            (Some(from), None) => TransitionPath::Final { from: state(from)? },
            (Some(from), Some(to)) => TransitionPath::Between {
                from: state(from)?,
                to: state(to)?,
            },
            (None, None) => {
                return Err(conversion(format!(
                    "transition {idx} of '{class_key}' names neither a from state nor a to state"
                )))
            }
        };
        let key = Key::new(KeyKind::Transition, owner, &transition_name(idx))?;
        let transition = Transition {
            key: key.clone(),
            path,
            event_key: Key::new(KeyKind::Event, owner, &transition.event_key)?,
            guard_key: transition
                .guard_key
                .as_deref()
                .map(|guard| Key::new(KeyKind::Guard, owner, guard))
                .transpose()?,
            action_key: transition
                .action_key
                .as_deref()
                .map(|action| Key::new(KeyKind::Action, owner, action))
                .transpose()?,
            uml_comment: transition.uml_comment.clone(),
        };
        class.transitions.insert(key, transition);
    }
    Ok(())
}

/// Associations stored at `scope`, whose owner key is `owner`.
fn associations(
    scope: &Scope,
    owner: Option<&Key>,
    associations: &BTreeMap<String, parse::ClassAssociation>,
) -> Result<BTreeMap<Key, ClassAssociation>, ModelError> {
    let class = |reference: &str| -> Result<Key, ModelError> {
        let path = scope.resolve(reference).ok_or_else(|| {
            conversion(format!(
                "'{reference}' is not a class reference valid at {scope} level"
            ))
        })?;
        Ok(path.key()?)
    };
    let multiplicity = |text: &str| -> Result<Multiplicity, ModelError> {
        text.parse().map_err(ModelError::Conversion)
    };

    let mut converted = BTreeMap::new();
    for (name, association) in associations.iter() {
        let key = Key::new(KeyKind::ClassAssociation, owner, name)?;
        converted.insert(
            key.clone(),
            ClassAssociation {
                key,
                name: association.name.clone(),
                details: association.details.clone(),
                from_class_key: class(&association.from_class_key)?,
                from_multiplicity: multiplicity(&association.from_multiplicity)?,
                to_class_key: class(&association.to_class_key)?,
                to_multiplicity: multiplicity(&association.to_multiplicity)?,
                association_class_key: association
                    .association_class_key
                    .as_deref()
                    .map(class)
                    .transpose()?,
                uml_comment: association.uml_comment.clone(),
            },
        );
    }
    Ok(converted)
}

fn convert_use_case(
    subdomain: &Key,
    name: &str,
    use_case: &parse::UseCase,
    generalizations: &Inverted,
) -> Result<UseCase, ModelError> {
    let key = Key::new(KeyKind::UseCase, Some(subdomain), name)?;
    let mut actors = BTreeMap::new();
    for (class_name, actor) in use_case.actors.iter() {
        actors.insert(
            Key::new(KeyKind::Class, Some(subdomain), class_name)?,
            UseCaseActor {
                uml_comment: actor.uml_comment.clone(),
            },
        );
    }
    let mut shares = BTreeMap::new();
    for (shared_name, shared) in use_case.shares.iter() {
        shares.insert(
            Key::new(KeyKind::UseCase, Some(subdomain), shared_name)?,
            UseCaseShared {
                share_type: shared.share_type,
                uml_comment: shared.uml_comment.clone(),
            },
        );
    }
    let mut scenarios = BTreeMap::new();
    for (scenario_name, scenario) in use_case.scenarios.iter() {
        let scenario = convert_scenario(subdomain, &key, scenario_name, scenario)?;
        scenarios.insert(scenario.key.clone(), scenario);
    }
    let (superclass_of_key, subclass_of_key) = generalizations.member(name);
    Ok(UseCase {
        key,
        name: use_case.name.clone(),
        details: use_case.details.clone(),
        level: use_case.level,
        read_only: use_case.read_only,
        superclass_of_key,
        subclass_of_key,
        actors,
        shares,
        scenarios,
    })
}

fn convert_scenario(
    subdomain: &Key,
    use_case: &Key,
    name: &str,
    scenario: &parse::Scenario,
) -> Result<Scenario, ModelError> {
    let key = Key::new(KeyKind::Scenario, Some(use_case), name)?;
    let mut objects = BTreeMap::new();
    for (object_name, object) in scenario.objects.iter() {
        let object_key = Key::new(KeyKind::ScenarioObject, Some(&key), object_name)?;
        objects.insert(
            object_key.clone(),
            ScenarioObject {
                key: object_key,
                object_number: object.object_number,
                name: object.name.clone(),
                name_style: object.name_style,
                class_key: Key::new(KeyKind::Class, Some(subdomain), &object.class_key)?,
                multi: object.multi,
                uml_comment: object.uml_comment.clone(),
            },
        );
    }
    let steps = StepConverter {
        subdomain,
        use_case,
        scenario_key: &key,
        scenario,
    };
    let steps = scenario
        .steps
        .as_ref()
        .map(|step| steps.step(step))
        .transpose()?;
    Ok(Scenario {
        key,
        name: scenario.name.clone(),
        details: scenario.details.clone(),
        objects,
        steps,
    })
}

/// Resolves the references inside one scenario's step tree.
struct StepConverter<'a> {
    subdomain: &'a Key,
    use_case: &'a Key,
    scenario_key: &'a Key,
    scenario: &'a parse::Scenario,
}

impl StepConverter<'_> {
    fn step(&self, step: &parse::Step) -> Result<Step, ModelError> {
        Ok(match step {
            parse::Step::Sequence { statements } => Step::Sequence {
                statements: self.statements(statements)?,
            },
            parse::Step::Loop {
                condition,
                statements,
            } => Step::Loop {
                condition: condition.clone(),
                statements: self.statements(statements)?,
            },
            parse::Step::Switch { cases } => Step::Switch {
                cases: cases
                    .iter()
                    .map(|case| -> Result<Case, ModelError> {
                        Ok(Case {
                            condition: case.condition.clone(),
                            statements: self.statements(&case.statements)?,
                        })
                    })
                    .collect::<Result<Vec<_>, ModelError>>()?,
            },
            parse::Step::Leaf(leaf) => Step::Leaf(self.leaf(leaf)?),
        })
    }

    fn statements(&self, statements: &[parse::Step]) -> Result<Vec<Step>, ModelError> {
        statements.iter().map(|step| self.step(step)).collect()
    }

    fn object(&self, name: &str) -> Result<Key, ModelError> {
        Ok(Key::new(
            KeyKind::ScenarioObject,
            Some(self.scenario_key),
            name,
        )?)
    }

    /// Key of the class of scenario object `name`; events and queries are looked up there.
    fn object_class(&self, name: &str) -> Result<Key, ModelError> {
        let object = self.scenario.objects.get(name).ok_or_else(|| {
            conversion(format!(
                "'{}' has no object '{name}'",
                self.scenario_key
            ))
        })?;
        Ok(Key::new(
            KeyKind::Class,
            Some(self.subdomain),
            &object.class_key,
        )?)
    }

    fn leaf(&self, leaf: &parse::Leaf) -> Result<Leaf, ModelError> {
        Ok(match leaf {
            parse::Leaf::Event {
                description,
                from_object_key,
                to_object_key,
                event_key,
            } => Leaf::Event {
                description: description.clone(),
                from_object_key: self.object(from_object_key)?,
                to_object_key: self.object(to_object_key)?,
                event_key: Key::new(
                    KeyKind::Event,
                    Some(&self.object_class(to_object_key)?),
                    event_key,
                )?,
            },
            parse::Leaf::Query {
                description,
                from_object_key,
                to_object_key,
                query_key,
            } => Leaf::Query {
                description: description.clone(),
                from_object_key: self.object(from_object_key)?,
                to_object_key: self.object(to_object_key)?,
                query_key: Key::new(
                    KeyKind::Query,
                    Some(&self.object_class(to_object_key)?),
                    query_key,
                )?,
            },
            parse::Leaf::Scenario {
                description,
                from_object_key,
                to_object_key,
                scenario_key,
            } => Leaf::Scenario {
                description: description.clone(),
                from_object_key: from_object_key
                    .as_deref()
                    .map(|object| self.object(object))
                    .transpose()?,
                to_object_key: to_object_key
                    .as_deref()
                    .map(|object| self.object(object))
                    .transpose()?,
                scenario_key: Key::new(KeyKind::Scenario, Some(self.use_case), scenario_key)?,
            },
            parse::Leaf::Delete {
                description,
                from_object_key,
            } => Leaf::Delete {
                description: description.clone(),
                from_object_key: self.object(from_object_key)?,
            },
        })
    }
}
