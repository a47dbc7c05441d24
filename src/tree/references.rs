//! Cross-reference integrity: every reference in the tree must resolve to an existing entity
//! at the right place. The first dangling or conflicting reference is reported.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use crate::{
    canonical::Multiplicity,
    error::{ErrorCode, ParseError},
    key::is_valid_key,
    parse::{
        Class, ClassAssociation, Generalization, Leaf, Model, Scenario, Step, Subdomain, UseCase,
    },
    tree::{
        layout,
        scope::{ClassPath, Scope},
    },
};

pub fn check(model: &Model) -> Result<(), ParseError> {
    check_domain_associations(model)?;

    let root = PathBuf::new();
    check_generalizations(
        model
            .actor_generalizations
            .iter()
            .map(|(key, generalization)| (key, &generalization.0)),
        |key| model.actors.contains_key(key),
        "actor",
        |key| layout::collection_path(&root, &layout::ACTOR_GENERALIZATIONS, key),
    )?;

    for (domain_key, domain) in model.domains.iter() {
        for (subdomain_key, subdomain) in domain.subdomains.iter() {
            check_subdomain(model, domain_key, subdomain_key, subdomain)?;
        }
        let domain_dir = layout::domain_dir(domain_key);
        check_associations(
            model,
            &Scope::domain(domain_key),
            &domain.class_associations,
            &domain_dir,
        )?;
    }
    check_associations(model, &Scope::Model, &model.class_associations, &root)
}

fn check_domain_associations(model: &Model) -> Result<(), ParseError> {
    for (key, association) in model.domain_associations.iter() {
        let file = layout::collection_path(Path::new(""), &layout::DOMAIN_ASSOCIATIONS, key);
        for (domain, field) in [
            (&association.problem_domain_key, "problem_domain_key"),
            (&association.solution_domain_key, "solution_domain_key"),
        ] {
            if !model.domains.contains_key(domain) {
                return Err(ParseError::new(
                    ErrorCode::DomainAssociationDomainNotFound,
                    format!("'{field}' names domain '{domain}', which does not exist"),
                    &file,
                )
                .with_field(field));
            }
        }
        if association.problem_domain_key == association.solution_domain_key {
            return Err(ParseError::new(
                ErrorCode::DomainAssociationSelf,
                format!(
                    "domain '{}' cannot be its own solution domain",
                    association.problem_domain_key
                ),
                &file,
            )
            .with_field("solution_domain_key"));
        }
    }
    Ok(())
}

fn check_subdomain(
    model: &Model,
    domain_key: &str,
    subdomain_key: &str,
    subdomain: &Subdomain,
) -> Result<(), ParseError> {
    let dir = layout::subdomain_dir(domain_key, subdomain_key);
    for (class_key, class) in subdomain.classes.iter() {
        check_class(
            model,
            class,
            &layout::class_dir(domain_key, subdomain_key, class_key),
        )?;
    }
    check_generalizations(
        subdomain
            .generalizations
            .iter()
            .map(|(key, generalization)| (key, &generalization.0)),
        |key| subdomain.classes.contains_key(key),
        "class",
        |key| layout::collection_path(&dir, &layout::CLASS_GENERALIZATIONS, key),
    )?;
    check_generalizations(
        subdomain
            .use_case_generalizations
            .iter()
            .map(|(key, generalization)| (key, &generalization.0)),
        |key| subdomain.use_cases.contains_key(key),
        "use case",
        |key| layout::collection_path(&dir, &layout::USE_CASE_GENERALIZATIONS, key),
    )?;
    check_associations(
        model,
        &Scope::subdomain(domain_key, subdomain_key),
        &subdomain.class_associations,
        &dir,
    )?;
    for (use_case_key, use_case) in subdomain.use_cases.iter() {
        check_use_case(
            subdomain,
            use_case_key,
            use_case,
            &layout::use_case_dir(domain_key, subdomain_key, use_case_key),
        )?;
    }
    Ok(())
}

fn check_class(model: &Model, class: &Class, dir: &Path) -> Result<(), ParseError> {
    let class_file = layout::entity_path(dir, layout::CLASS_FILE);
    if let Some(actor) = &class.actor_key {
        if !model.actors.contains_key(actor) {
            return Err(ParseError::new(
                ErrorCode::ClassActorNotFound,
                format!("'actor_key' names actor '{actor}', which does not exist"),
                &class_file,
            )
            .with_field("actor_key"));
        }
    }
    for (idx, index) in class.indexes.iter().enumerate() {
        let mut seen = BTreeSet::new();
        for (pos, attribute) in index.iter().enumerate() {
            let field = format!("indexes[{idx}][{pos}]");
            if !class.attributes.contains_key(attribute) {
                return Err(ParseError::new(
                    ErrorCode::IndexAttributeNotFound,
                    format!("index {idx} names attribute '{attribute}', which does not exist"),
                    &class_file,
                )
                .with_field(field));
            }
            if !seen.insert(attribute) {
                return Err(ParseError::new(
                    ErrorCode::IndexAttributeDuplicate,
                    format!("index {idx} lists attribute '{attribute}' more than once"),
                    &class_file,
                )
                .with_field(field));
            }
        }
    }

    let Some(state_machine) = &class.state_machine else {
        return Ok(());
    };
    let file = layout::entity_path(dir, layout::STATE_MACHINE_FILE);
    for (state_key, state) in state_machine.states.iter() {
        for (idx, action) in state.actions.iter().enumerate() {
            if !class.actions.contains_key(&action.action_key) {
                return Err(ParseError::new(
                    ErrorCode::StateActionNotFound,
                    format!(
                        "state '{state_key}' runs action '{}', which the class does not define",
                        action.action_key
                    ),
                    &file,
                )
                .with_field(format!("states.{state_key}.actions[{idx}].action_key")));
            }
        }
    }
    for (idx, transition) in state_machine.transitions.iter().enumerate() {
        let at = |field: &str| format!("transitions[{idx}].{field}");
        if transition.from_state_key.is_none() && transition.to_state_key.is_none() {
            return Err(ParseError::new(
                ErrorCode::TransitionNoStates,
                format!("transition {idx} names neither a from state nor a to state"),
                &file,
            )
            .with_field(format!("transitions[{idx}]")));
        }
        for (state, field) in [
            (&transition.from_state_key, "from_state_key"),
            (&transition.to_state_key, "to_state_key"),
        ] {
            if let Some(state) = state {
                if !state_machine.states.contains_key(state) {
                    return Err(ParseError::new(
                        ErrorCode::TransitionStateNotFound,
                        format!("transition {idx} names state '{state}', which does not exist"),
                        &file,
                    )
                    .with_field(at(field)));
                }
            }
        }
        if !state_machine.events.contains_key(&transition.event_key) {
            return Err(ParseError::new(
                ErrorCode::TransitionEventNotFound,
                format!(
                    "transition {idx} names event '{}', which does not exist",
                    transition.event_key
                ),
                &file,
            )
            .with_field(at("event_key")));
        }
        if let Some(guard) = &transition.guard_key {
            if !state_machine.guards.contains_key(guard) {
                return Err(ParseError::new(
                    ErrorCode::TransitionGuardNotFound,
                    format!("transition {idx} names guard '{guard}', which does not exist"),
                    &file,
                )
                .with_field(at("guard_key")));
            }
        }
        if let Some(action) = &transition.action_key {
            if !class.actions.contains_key(action) {
                return Err(ParseError::new(
                    ErrorCode::TransitionActionNotFound,
                    format!("transition {idx} runs action '{action}', which does not exist"),
                    &file,
                )
                .with_field(at("action_key")));
            }
        }
    }
    Ok(())
}

/// Check one group of generalizations whose members must satisfy `exists`.
///
/// Across the group an entity may be the superclass of at most one generalization and a
/// subclass in at most one.
fn check_generalizations<'g>(
    generalizations: impl Iterator<Item = (&'g String, &'g Generalization)>,
    exists: impl Fn(&str) -> bool,
    member: &str,
    file_of: impl Fn(&str) -> PathBuf,
) -> Result<(), ParseError> {
    let mut superclass_of: BTreeMap<&str, &str> = BTreeMap::new();
    let mut subclass_of: BTreeMap<&str, &str> = BTreeMap::new();
    for (key, generalization) in generalizations {
        let file = file_of(key);
        let superclass = generalization.superclass_key.as_str();
        if !exists(superclass) {
            return Err(ParseError::new(
                ErrorCode::GeneralizationSuperclassNotFound,
                format!("superclass '{superclass}' is not a {member} of this scope"),
                &file,
            )
            .with_field("superclass_key"));
        }
        let mut seen = BTreeSet::new();
        for (idx, subclass) in generalization.subclass_keys.iter().enumerate() {
            let field = format!("subclass_keys[{idx}]");
            if !exists(subclass) {
                return Err(ParseError::new(
                    ErrorCode::GeneralizationSubclassNotFound,
                    format!("subclass '{subclass}' is not a {member} of this scope"),
                    &file,
                )
                .with_field(field));
            }
            if !seen.insert(subclass.as_str()) {
                return Err(ParseError::new(
                    ErrorCode::GeneralizationDuplicateSubclass,
                    format!("subclass '{subclass}' is listed more than once"),
                    &file,
                )
                .with_field(field));
            }
            if subclass == superclass {
                return Err(ParseError::new(
                    ErrorCode::GeneralizationSuperclassIsSubclass,
                    format!("'{superclass}' cannot be a subclass of itself"),
                    &file,
                )
                .with_field(field));
            }
            if let Some(other) = subclass_of.insert(subclass.as_str(), key.as_str()) {
                return Err(ParseError::new(
                    ErrorCode::GeneralizationMembershipConflict,
                    format!("{member} '{subclass}' is already a subclass in generalization '{other}'"),
                    &file,
                )
                .with_field(field));
            }
        }
        if let Some(other) = superclass_of.insert(superclass, key.as_str()) {
            return Err(ParseError::new(
                ErrorCode::GeneralizationMembershipConflict,
                format!(
                    "{member} '{superclass}' is already the superclass of generalization '{other}'"
                ),
                &file,
            )
            .with_field("superclass_key"));
        }
    }
    Ok(())
}

fn class_exists(model: &Model, path: &ClassPath) -> bool {
    model
        .domains
        .get(&path.domain)
        .and_then(|domain| domain.subdomains.get(&path.subdomain))
        .is_some_and(|subdomain| subdomain.classes.contains_key(&path.class))
}

fn check_associations(
    model: &Model,
    scope: &Scope,
    associations: &BTreeMap<String, ClassAssociation>,
    dir: &Path,
) -> Result<(), ParseError> {
    for (name, association) in associations.iter() {
        let file = layout::collection_path(dir, &layout::ASSOCIATIONS, name);
        let mut endpoints = Vec::new();
        for (reference, field) in [
            (Some(&association.from_class_key), "from_class_key"),
            (Some(&association.to_class_key), "to_class_key"),
            (
                association.association_class_key.as_ref(),
                "association_class_key",
            ),
        ] {
            let Some(reference) = reference else {
                continue;
            };
            let path = scope
                .resolve(reference)
                .filter(|p| [&p.domain, &p.subdomain, &p.class].iter().all(|s| is_valid_key(s)))
                .ok_or_else(|| {
                    ParseError::new(
                        ErrorCode::AssociationReferenceMalformed,
                        format!(
                            "'{reference}' is not a class reference of {} segment(s) valid at {scope} level",
                            scope.segments()
                        ),
                        &file,
                    )
                    .with_field(field)
                })?;
            if !class_exists(model, &path) {
                return Err(ParseError::new(
                    ErrorCode::AssociationClassNotFound,
                    format!("'{field}' names class '{path}', which does not exist"),
                    &file,
                )
                .with_field(field));
            }
            endpoints.push(path);
        }
        for (multiplicity, field) in [
            (&association.from_multiplicity, "from_multiplicity"),
            (&association.to_multiplicity, "to_multiplicity"),
        ] {
            if let Err(message) = multiplicity.parse::<Multiplicity>() {
                return Err(ParseError::new(
                    ErrorCode::AssociationMultiplicityInvalid,
                    message,
                    &file,
                )
                .with_field(field));
            }
        }
        if let [from, to, class] = endpoints.as_slice() {
            if class == from || class == to {
                return Err(ParseError::new(
                    ErrorCode::AssociationClassIsEndpoint,
                    format!("association class '{class}' is also an endpoint of the association"),
                    &file,
                )
                .with_field("association_class_key"));
            }
        }
    }
    Ok(())
}

fn check_use_case(
    subdomain: &Subdomain,
    use_case_key: &str,
    use_case: &UseCase,
    dir: &Path,
) -> Result<(), ParseError> {
    let file = layout::entity_path(dir, layout::USE_CASE_FILE);
    for class_key in use_case.actors.keys() {
        let field = format!("actors.{class_key}");
        let Some(class) = subdomain.classes.get(class_key) else {
            return Err(ParseError::new(
                ErrorCode::UseCaseActorNotFound,
                format!("actor class '{class_key}' does not exist in this subdomain"),
                &file,
            )
            .with_field(field));
        };
        if class.actor_key.is_none() {
            return Err(ParseError::new(
                ErrorCode::UseCaseActorNotActor,
                format!("class '{class_key}' does not represent an actor"),
                &file,
            )
            .with_field(field));
        }
    }
    for shared_key in use_case.shares.keys() {
        let field = format!("shares.{shared_key}");
        if shared_key == use_case_key {
            return Err(ParseError::new(
                ErrorCode::UseCaseShareSelf,
                format!("use case '{use_case_key}' cannot include or extend itself"),
                &file,
            )
            .with_field(field));
        }
        if !subdomain.use_cases.contains_key(shared_key) {
            return Err(ParseError::new(
                ErrorCode::UseCaseShareNotFound,
                format!("use case '{shared_key}' does not exist in this subdomain"),
                &file,
            )
            .with_field(field));
        }
    }
    for (scenario_key, scenario) in use_case.scenarios.iter() {
        let file = layout::collection_path(dir, &layout::SCENARIOS, scenario_key);
        let context = ScenarioContext {
            subdomain,
            use_case,
            scenario,
            file: &file,
        };
        context.check()?;
    }
    Ok(())
}

struct ScenarioContext<'a> {
    subdomain: &'a Subdomain,
    use_case: &'a UseCase,
    scenario: &'a Scenario,
    file: &'a Path,
}

impl ScenarioContext<'_> {
    fn check(&self) -> Result<(), ParseError> {
        for (object_key, object) in self.scenario.objects.iter() {
            if !self.subdomain.classes.contains_key(&object.class_key) {
                return Err(ParseError::new(
                    ErrorCode::ScenarioObjectClassNotFound,
                    format!(
                        "object '{object_key}' is of class '{}', which does not exist in this subdomain",
                        object.class_key
                    ),
                    self.file,
                )
                .with_field(format!("objects.{object_key}.class_key")));
            }
        }
        match &self.scenario.steps {
            Some(step) => self.check_step(step, "steps"),
            None => Ok(()),
        }
    }

    fn check_step(&self, step: &Step, at: &str) -> Result<(), ParseError> {
        match step {
            Step::Sequence { statements } | Step::Loop { statements, .. } => {
                self.check_statements(statements, at)
            }
            Step::Switch { cases } => {
                for (idx, case) in cases.iter().enumerate() {
                    self.check_statements(&case.statements, &format!("{at}.cases[{idx}]"))?;
                }
                Ok(())
            }
            Step::Leaf(leaf) => self.check_leaf(leaf, at),
        }
    }

    fn check_statements(&self, statements: &[Step], at: &str) -> Result<(), ParseError> {
        for (idx, step) in statements.iter().enumerate() {
            self.check_step(step, &format!("{at}.statements[{idx}]"))?;
        }
        Ok(())
    }

    /// Class of the scenario object `object_key`, checked to exist.
    fn object_class(&self, object_key: &str, field: String) -> Result<&Class, ParseError> {
        self.scenario
            .objects
            .get(object_key)
            .and_then(|object| self.subdomain.classes.get(&object.class_key))
            .ok_or_else(|| {
                ParseError::new(
                    ErrorCode::ScenarioStepObjectNotFound,
                    format!("step names object '{object_key}', which the scenario does not declare"),
                    self.file,
                )
                .with_field(field)
            })
    }

    fn check_leaf(&self, leaf: &Leaf, at: &str) -> Result<(), ParseError> {
        let field = |name: &str| format!("{at}.{name}");
        match leaf {
            Leaf::Event {
                from_object_key,
                to_object_key,
                event_key,
                ..
            } => {
                self.object_class(from_object_key, field("from_object_key"))?;
                let target = self.object_class(to_object_key, field("to_object_key"))?;
                let known = target
                    .state_machine
                    .as_ref()
                    .is_some_and(|sm| sm.events.contains_key(event_key));
                if !known {
                    return Err(ParseError::new(
                        ErrorCode::ScenarioStepEventNotFound,
                        format!(
                            "event '{event_key}' is not an event of the class of object '{to_object_key}'"
                        ),
                        self.file,
                    )
                    .with_field(field("event_key")));
                }
            }
            Leaf::Query {
                from_object_key,
                to_object_key,
                query_key,
                ..
            } => {
                self.object_class(from_object_key, field("from_object_key"))?;
                let target = self.object_class(to_object_key, field("to_object_key"))?;
                if !target.queries.contains_key(query_key) {
                    return Err(ParseError::new(
                        ErrorCode::ScenarioStepQueryNotFound,
                        format!(
                            "query '{query_key}' is not a query of the class of object '{to_object_key}'"
                        ),
                        self.file,
                    )
                    .with_field(field("query_key")));
                }
            }
            Leaf::Scenario {
                from_object_key,
                to_object_key,
                scenario_key,
                ..
            } => {
                if let Some(object) = from_object_key {
                    self.object_class(object, field("from_object_key"))?;
                }
                if let Some(object) = to_object_key {
                    self.object_class(object, field("to_object_key"))?;
                }
                if !self.use_case.scenarios.contains_key(scenario_key) {
                    return Err(ParseError::new(
                        ErrorCode::ScenarioStepScenarioNotFound,
                        format!("scenario '{scenario_key}' does not exist in this use case"),
                        self.file,
                    )
                    .with_field(field("scenario_key")));
                }
            }
            Leaf::Delete {
                from_object_key, ..
            } => {
                self.object_class(from_object_key, field("from_object_key"))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;
    use crate::parse::{
        ClassGeneralization, ScenarioObject, Transition, UseCaseActor, UseCaseLevel,
    };
    use crate::tests::helpers::{minimal_tree, subdomain_mut};

    fn class_mut<'a>(tree: &'a mut Model, key: &str) -> &'a mut Class {
        subdomain_mut(tree).classes.get_mut(key).unwrap()
    }

    #[test]
    fn test_minimal_tree_resolves() {
        assert!(check(&minimal_tree()).is_ok());
    }

    #[test]
    fn test_transition_without_states() {
        let mut tree = minimal_tree();
        let sm = class_mut(&mut tree, "book_order").state_machine.as_mut().unwrap();
        sm.transitions.push(Transition {
            from_state_key: None,
            to_state_key: None,
            event_key: "place".to_string(),
            guard_key: None,
            action_key: None,
            uml_comment: String::new(),
        });
        let err = check(&tree).unwrap_err();
        assert_eq!(err.code, ErrorCode::TransitionNoStates);
        assert_eq!(err.field.as_deref(), Some("transitions[1]"));
    }

    #[test]
    fn test_transition_references() {
        let mut tree = minimal_tree();
        let sm = class_mut(&mut tree, "book_order").state_machine.as_mut().unwrap();
        sm.transitions[0].guard_key = Some("paid".to_string());
        let err = check(&tree).unwrap_err();
        assert_eq!(err.code, ErrorCode::TransitionGuardNotFound);
        assert_eq!(err.field.as_deref(), Some("transitions[0].guard_key"));
        assert_eq!(
            err.file,
            PathBuf::from("domains/orders/subdomains/default/classes/book_order/state_machine.json")
        );
    }

    #[test]
    fn test_superclass_listed_as_subclass() {
        let mut tree = minimal_tree();
        subdomain_mut(&mut tree).generalizations.insert(
            "orders".to_string(),
            ClassGeneralization(Generalization {
                name: "Orders".to_string(),
                details: String::new(),
                superclass_key: "book_order".to_string(),
                subclass_keys: vec!["book_order_line".to_string(), "book_order".to_string()],
                is_complete: false,
                is_static: false,
                uml_comment: String::new(),
            }),
        );
        let err = check(&tree).unwrap_err();
        assert_eq!(err.code, ErrorCode::GeneralizationSuperclassIsSubclass);
        assert_eq!(err.field.as_deref(), Some("subclass_keys[1]"));
    }

    #[test]
    fn test_class_in_two_generalizations() {
        let mut tree = minimal_tree();
        for key in ["kinds", "more_kinds"] {
            subdomain_mut(&mut tree).generalizations.insert(
                key.to_string(),
                ClassGeneralization(Generalization {
                    name: "Kinds".to_string(),
                    details: String::new(),
                    superclass_key: "book_order".to_string(),
                    subclass_keys: vec!["book_order_line".to_string()],
                    is_complete: false,
                    is_static: false,
                    uml_comment: String::new(),
                }),
            );
        }
        let err = check(&tree).unwrap_err();
        assert_eq!(err.code, ErrorCode::GeneralizationMembershipConflict);
        assert_eq!(err.field.as_deref(), Some("subclass_keys[0]"));
        assert!(err.message.contains("kinds"));
    }

    #[test]
    fn test_index_references() {
        let mut tree = minimal_tree();
        class_mut(&mut tree, "book_order").indexes = vec![vec![
            "placed_on".to_string(),
            "placed_on".to_string(),
        ]];
        assert_eq!(
            check(&tree).unwrap_err().code,
            ErrorCode::IndexAttributeDuplicate
        );
        class_mut(&mut tree, "book_order").indexes = vec![vec!["number".to_string()]];
        let err = check(&tree).unwrap_err();
        assert_eq!(err.code, ErrorCode::IndexAttributeNotFound);
        assert_eq!(err.field.as_deref(), Some("indexes[0][0]"));
    }

    #[test]
    fn test_association_references() {
        let mut tree = minimal_tree();
        let association = subdomain_mut(&mut tree)
            .class_associations
            .values_mut()
            .next()
            .unwrap();
        association.to_multiplicity = "5..3".to_string();
        assert_eq!(
            check(&tree).unwrap_err().code,
            ErrorCode::AssociationMultiplicityInvalid
        );

        let association = subdomain_mut(&mut tree)
            .class_associations
            .values_mut()
            .next()
            .unwrap();
        association.to_multiplicity = "*".to_string();
        association.association_class_key = Some("book_order".to_string());
        assert_eq!(
            check(&tree).unwrap_err().code,
            ErrorCode::AssociationClassIsEndpoint
        );

        let association = subdomain_mut(&mut tree)
            .class_associations
            .values_mut()
            .next()
            .unwrap();
        association.association_class_key = Some("default/book_order".to_string());
        assert_eq!(
            check(&tree).unwrap_err().code,
            ErrorCode::AssociationReferenceMalformed
        );
    }

    #[test]
    fn test_self_association_is_permitted() {
        let mut tree = minimal_tree();
        let association = subdomain_mut(&mut tree)
            .class_associations
            .values_mut()
            .next()
            .unwrap();
        association.to_class_key = association.from_class_key.clone();
        assert!(check(&tree).is_ok());
    }

    #[test]
    fn test_use_case_references() {
        let mut tree = minimal_tree();
        let mut use_case = UseCase {
            name: "Place order".to_string(),
            details: String::new(),
            level: UseCaseLevel::Sea,
            read_only: false,
            actors: BTreeMap::from([("book_order".to_string(), UseCaseActor::default())]),
            shares: BTreeMap::new(),
            scenarios: BTreeMap::new(),
        };
        subdomain_mut(&mut tree)
            .use_cases
            .insert("place_order".to_string(), use_case.clone());
        let err = check(&tree).unwrap_err();
        assert_eq!(err.code, ErrorCode::UseCaseActorNotActor);
        assert_eq!(err.field.as_deref(), Some("actors.book_order"));

        use_case.actors.clear();
        use_case.scenarios.insert(
            "happy".to_string(),
            Scenario {
                name: "Happy".to_string(),
                details: String::new(),
                objects: BTreeMap::from([(
                    "order".to_string(),
                    ScenarioObject {
                        object_number: 0,
                        name: "Order".to_string(),
                        name_style: Default::default(),
                        class_key: "book_order".to_string(),
                        multi: false,
                        uml_comment: String::new(),
                    },
                )]),
                steps: Some(Step::Sequence {
                    statements: vec![Step::Leaf(Leaf::Event {
                        description: String::new(),
                        from_object_key: "order".to_string(),
                        to_object_key: "order".to_string(),
                        event_key: "cancel".to_string(),
                    })],
                }),
            },
        );
        subdomain_mut(&mut tree)
            .use_cases
            .insert("place_order".to_string(), use_case);
        let err = check(&tree).unwrap_err();
        assert_eq!(err.code, ErrorCode::ScenarioStepEventNotFound);
        assert_eq!(err.field.as_deref(), Some("steps.statements[0].event_key"));
    }

    #[test]
    fn test_class_actor_must_exist() {
        let mut tree = minimal_tree();
        class_mut(&mut tree, "book_order").actor_key = Some("clerk".to_string());
        assert_eq!(check(&tree).unwrap_err().code, ErrorCode::ClassActorNotFound);
    }
}
