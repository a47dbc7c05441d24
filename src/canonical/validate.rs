//! Integrity check of a canonical model, run on every model the converter produces.
//!
//! Every entity must sit in the map slot named by its own key, in a map of its kind, under its
//! owner. Every reference must name an existing entity of the expected kind inside the scope
//! the reference is allowed to reach. The first violation is reported.

use std::collections::BTreeSet;

use crate::{
    canonical::{
        Actor, Class, ClassAssociation, Domain, Generalization, Leaf, Model, Scenario, Step,
        Subdomain, UseCase,
    },
    error::{ErrorCode, ParseError},
    key::{association_segment_count, AssociationName, Key, KeyKind},
    tree::{layout, scope::{ClassPath, Scope}},
};

pub fn check(model: &Model) -> Result<(), ParseError> {
    let checker = Checker {
        known: collect_keys(model),
    };
    checker.model(model)
}

/// Every key a map slot of the model holds.
fn collect_keys(model: &Model) -> BTreeSet<Key> {
    let mut keys = BTreeSet::new();
    keys.extend(model.actors.keys().cloned());
    keys.extend(model.actor_generalizations.keys().cloned());
    keys.extend(model.global_functions.keys().cloned());
    keys.extend(model.domain_associations.keys().cloned());
    keys.extend(model.class_associations.keys().cloned());
    for (domain_key, domain) in model.domains.iter() {
        keys.insert(domain_key.clone());
        keys.extend(domain.class_associations.keys().cloned());
        for (subdomain_key, subdomain) in domain.subdomains.iter() {
            keys.insert(subdomain_key.clone());
            keys.extend(subdomain.generalizations.keys().cloned());
            keys.extend(subdomain.use_case_generalizations.keys().cloned());
            keys.extend(subdomain.class_associations.keys().cloned());
            for (class_key, class) in subdomain.classes.iter() {
                keys.insert(class_key.clone());
                keys.extend(class.attributes.keys().cloned());
                keys.extend(class.states.keys().cloned());
                keys.extend(class.events.keys().cloned());
                keys.extend(class.guards.keys().cloned());
                keys.extend(class.transitions.keys().cloned());
                keys.extend(class.actions.keys().cloned());
                keys.extend(class.queries.keys().cloned());
            }
            for (use_case_key, use_case) in subdomain.use_cases.iter() {
                keys.insert(use_case_key.clone());
                for (scenario_key, scenario) in use_case.scenarios.iter() {
                    keys.insert(scenario_key.clone());
                    keys.extend(scenario.objects.keys().cloned());
                }
            }
        }
    }
    keys
}

/// Class of the object `to_object_key` names, or the whole subdomain when it names none.
fn receiver<'s>(scenario: &'s Scenario, to_object_key: &Key, subdomain: &'s Key) -> &'s Key {
    scenario
        .objects
        .get(to_object_key)
        .map_or(subdomain, |object| &object.class_key)
}

struct Checker {
    known: BTreeSet<Key>,
}

impl Checker {
    /// The entity stored under `slot` has key `key`, of `kind`, owned by `owner`.
    fn slot(
        &self,
        slot: &Key,
        key: &Key,
        kind: KeyKind,
        owner: Option<&Key>,
    ) -> Result<(), ParseError> {
        let mismatch = |message: String| {
            ParseError::new(ErrorCode::CanonicalKeyMismatch, message, layout::file_of(slot))
        };
        if slot != key {
            return Err(mismatch(format!(
                "entity stored under '{slot}' carries the key '{key}'"
            )));
        }
        key.expect_kind(kind)
            .map_err(|err| mismatch(err.to_string()))?;
        key.validate_parent(owner)
            .map_err(|err| mismatch(err.to_string()))
    }

    /// `target`, referenced from `from.field`, names an existing `kind` entity inside `within`.
    fn reference(
        &self,
        from: &Key,
        field: &str,
        target: &Key,
        kind: KeyKind,
        within: Option<&Key>,
    ) -> Result<(), ParseError> {
        if target.kind() != kind || !self.known.contains(target) {
            return Err(ParseError::new(
                ErrorCode::CanonicalReferenceUnresolved,
                format!("'{field}' of '{from}' is '{target}', which is not an existing {kind}"),
                layout::file_of(from),
            )
            .with_field(field));
        }
        if let Some(scope) = within {
            if target.ancestor(scope.kind()).as_ref() != Some(scope) {
                return Err(ParseError::new(
                    ErrorCode::CanonicalReferenceOutOfScope,
                    format!("'{field}' of '{from}' is '{target}', which lies outside '{scope}'"),
                    layout::file_of(from),
                )
                .with_field(field));
            }
        }
        Ok(())
    }

    fn optional(
        &self,
        from: &Key,
        field: &str,
        target: Option<&Key>,
        kind: KeyKind,
        within: Option<&Key>,
    ) -> Result<(), ParseError> {
        match target {
            Some(target) => self.reference(from, field, target, kind, within),
            None => Ok(()),
        }
    }

    fn model(&self, model: &Model) -> Result<(), ParseError> {
        for (slot, actor) in model.actors.iter() {
            self.slot(slot, &actor.key, KeyKind::Actor, None)?;
            self.actor(actor)?;
        }
        for (slot, generalization) in model.actor_generalizations.iter() {
            self.slot(slot, &generalization.key, KeyKind::ActorGeneralization, None)?;
            self.generalization(
                generalization,
                model
                    .actors
                    .values()
                    .map(|a| (a.superclass_of_key.as_ref(), a.subclass_of_key.as_ref())),
            )?;
        }
        for (slot, function) in model.global_functions.iter() {
            self.slot(slot, &function.key, KeyKind::GlobalFunction, None)?;
        }
        for (slot, association) in model.domain_associations.iter() {
            self.slot(slot, &association.key, KeyKind::DomainAssociation, None)?;
            for (target, field) in [
                (&association.problem_domain_key, "problem_domain_key"),
                (&association.solution_domain_key, "solution_domain_key"),
            ] {
                self.reference(&association.key, field, target, KeyKind::Domain, None)?;
            }
        }
        for (slot, domain) in model.domains.iter() {
            self.slot(slot, &domain.key, KeyKind::Domain, None)?;
            self.domain(domain)?;
        }
        self.associations(None, model.class_associations.iter())
    }

    fn actor(&self, actor: &Actor) -> Result<(), ParseError> {
        let kind = KeyKind::ActorGeneralization;
        self.optional(
            &actor.key,
            "superclass_of_key",
            actor.superclass_of_key.as_ref(),
            kind,
            None,
        )?;
        self.optional(
            &actor.key,
            "subclass_of_key",
            actor.subclass_of_key.as_ref(),
            kind,
            None,
        )
    }

    /// A generalization is named as superclass by exactly one member and as subclass by at
    /// least one. `members` yields each member's `(superclass_of_key, subclass_of_key)`.
    fn generalization<'m>(
        &self,
        generalization: &Generalization,
        members: impl Iterator<Item = (Option<&'m Key>, Option<&'m Key>)>,
    ) -> Result<(), ParseError> {
        let key = &generalization.key;
        let (mut superclasses, mut subclasses) = (0usize, 0usize);
        for (superclass_of, subclass_of) in members {
            superclasses += usize::from(superclass_of == Some(key));
            subclasses += usize::from(subclass_of == Some(key));
        }
        if superclasses != 1 || subclasses == 0 {
            return Err(ParseError::new(
                ErrorCode::CanonicalGeneralizationIncomplete,
                format!(
                    "generalization '{key}' has {superclasses} superclass(es) and {subclasses} subclass(es); exactly one superclass and at least one subclass are required"
                ),
                layout::file_of(key),
            ));
        }
        Ok(())
    }

    fn domain(&self, domain: &Domain) -> Result<(), ParseError> {
        for (slot, subdomain) in domain.subdomains.iter() {
            self.slot(slot, &subdomain.key, KeyKind::Subdomain, Some(&domain.key))?;
            self.subdomain(subdomain)?;
        }
        self.associations(Some(&domain.key), domain.class_associations.iter())
    }

    fn subdomain(&self, subdomain: &Subdomain) -> Result<(), ParseError> {
        let owner = Some(&subdomain.key);
        for (slot, class) in subdomain.classes.iter() {
            self.slot(slot, &class.key, KeyKind::Class, owner)?;
            self.class(class, &subdomain.key)?;
        }
        for (slot, generalization) in subdomain.generalizations.iter() {
            self.slot(slot, &generalization.key, KeyKind::ClassGeneralization, owner)?;
            self.generalization(
                generalization,
                subdomain
                    .classes
                    .values()
                    .map(|c| (c.superclass_of_key.as_ref(), c.subclass_of_key.as_ref())),
            )?;
        }
        for (slot, use_case) in subdomain.use_cases.iter() {
            self.slot(slot, &use_case.key, KeyKind::UseCase, owner)?;
            self.use_case(use_case, subdomain)?;
        }
        for (slot, generalization) in subdomain.use_case_generalizations.iter() {
            self.slot(slot, &generalization.key, KeyKind::UseCaseGeneralization, owner)?;
            self.generalization(
                generalization,
                subdomain
                    .use_cases
                    .values()
                    .map(|u| (u.superclass_of_key.as_ref(), u.subclass_of_key.as_ref())),
            )?;
        }
        self.associations(owner, subdomain.class_associations.iter())
    }

    fn class(&self, class: &Class, subdomain: &Key) -> Result<(), ParseError> {
        let key = &class.key;
        let owner = Some(key);
        self.optional(key, "actor_key", class.actor_key.as_ref(), KeyKind::Actor, None)?;
        for (field, target) in [
            ("superclass_of_key", class.superclass_of_key.as_ref()),
            ("subclass_of_key", class.subclass_of_key.as_ref()),
        ] {
            self.optional(
                key,
                field,
                target,
                KeyKind::ClassGeneralization,
                Some(subdomain),
            )?;
        }
        for (slot, attribute) in class.attributes.iter() {
            self.slot(slot, &attribute.key, KeyKind::Attribute, owner)?;
        }
        for (slot, state) in class.states.iter() {
            self.slot(slot, &state.key, KeyKind::State, owner)?;
            for (idx, action) in state.actions.iter().enumerate() {
                self.reference(
                    &state.key,
                    &format!("actions[{idx}].action_key"),
                    &action.action_key,
                    KeyKind::Action,
                    owner,
                )?;
            }
        }
        for (slot, event) in class.events.iter() {
            self.slot(slot, &event.key, KeyKind::Event, owner)?;
        }
        for (slot, guard) in class.guards.iter() {
            self.slot(slot, &guard.key, KeyKind::Guard, owner)?;
        }
        for (slot, transition) in class.transitions.iter() {
            let from = &transition.key;
            self.slot(slot, from, KeyKind::Transition, owner)?;
            self.optional(from, "from_state_key", transition.path.from_state(), KeyKind::State, owner)?;
            self.optional(from, "to_state_key", transition.path.to_state(), KeyKind::State, owner)?;
            self.reference(from, "event_key", &transition.event_key, KeyKind::Event, owner)?;
            self.optional(from, "guard_key", transition.guard_key.as_ref(), KeyKind::Guard, owner)?;
            self.optional(from, "action_key", transition.action_key.as_ref(), KeyKind::Action, owner)?;
        }
        for (slot, action) in class.actions.iter() {
            self.slot(slot, &action.key, KeyKind::Action, owner)?;
        }
        for (slot, query) in class.queries.iter() {
            self.slot(slot, &query.key, KeyKind::Query, owner)?;
        }
        Ok(())
    }

    /// Associations stored under `owner`, whose endpoints must lie inside it and whose key
    /// must spell its endpoints the way a filename at that level would.
    fn associations<'a>(
        &self,
        owner: Option<&Key>,
        associations: impl Iterator<Item = (&'a Key, &'a ClassAssociation)>,
    ) -> Result<(), ParseError> {
        let scope = Scope::from_owner(owner);
        for (slot, association) in associations {
            let key = &association.key;
            self.slot(slot, key, KeyKind::ClassAssociation, owner)?;
            for (field, target) in [
                ("from_class_key", Some(&association.from_class_key)),
                ("to_class_key", Some(&association.to_class_key)),
                ("association_class_key", association.association_class_key.as_ref()),
            ] {
                self.optional(key, field, target, KeyKind::Class, owner)?;
            }
            let name = AssociationName::parse(
                key.name(),
                association_segment_count(owner.map(Key::kind)),
            )
            .map_err(|err| {
                ParseError::new(ErrorCode::CanonicalKeyMismatch, err.to_string(), layout::file_of(key))
            })?;
            let endpoint = |class: &Key| {
                ClassPath::from_key(class)
                    .and_then(|path| scope.as_ref()?.relative_segments(&path))
            };
            if endpoint(&association.from_class_key).as_ref() != Some(&name.from)
                || endpoint(&association.to_class_key).as_ref() != Some(&name.to)
            {
                return Err(ParseError::new(
                    ErrorCode::CanonicalKeyMismatch,
                    format!(
                        "association '{key}' connects '{}' and '{}', which its key does not name",
                        association.from_class_key, association.to_class_key
                    ),
                    layout::file_of(key),
                ));
            }
        }
        Ok(())
    }

    fn use_case(&self, use_case: &UseCase, subdomain: &Subdomain) -> Result<(), ParseError> {
        let key = &use_case.key;
        let within = Some(&subdomain.key);
        for (field, target) in [
            ("superclass_of_key", use_case.superclass_of_key.as_ref()),
            ("subclass_of_key", use_case.subclass_of_key.as_ref()),
        ] {
            self.optional(key, field, target, KeyKind::UseCaseGeneralization, within)?;
        }
        for class_key in use_case.actors.keys() {
            self.reference(key, "actors", class_key, KeyKind::Class, within)?;
        }
        for shared_key in use_case.shares.keys() {
            self.reference(key, "shares", shared_key, KeyKind::UseCase, within)?;
        }
        for (slot, scenario) in use_case.scenarios.iter() {
            self.slot(slot, &scenario.key, KeyKind::Scenario, Some(key))?;
            self.scenario(scenario, key, &subdomain.key)?;
        }
        Ok(())
    }

    fn scenario(
        &self,
        scenario: &Scenario,
        use_case: &Key,
        subdomain: &Key,
    ) -> Result<(), ParseError> {
        let key = &scenario.key;
        for (slot, object) in scenario.objects.iter() {
            self.slot(slot, &object.key, KeyKind::ScenarioObject, Some(key))?;
            self.reference(&object.key, "class_key", &object.class_key, KeyKind::Class, Some(subdomain))?;
        }
        let mut pending = scenario.steps.iter().collect::<Vec<_>>();
        while let Some(step) = pending.pop() {
            match step {
                Step::Sequence { statements } | Step::Loop { statements, .. } => {
                    pending.extend(statements.iter())
                }
                Step::Switch { cases } => {
                    pending.extend(cases.iter().flat_map(|case| case.statements.iter()))
                }
                Step::Leaf(leaf) => self.leaf(leaf, scenario, use_case, subdomain)?,
            }
        }
        Ok(())
    }

    /// Events and queries must belong to the class of the object receiving them.
    fn leaf(
        &self,
        leaf: &Leaf,
        owner: &Scenario,
        use_case: &Key,
        subdomain: &Key,
    ) -> Result<(), ParseError> {
        let scenario = &owner.key;
        let object = KeyKind::ScenarioObject;
        let within = Some(scenario);
        match leaf {
            Leaf::Event {
                from_object_key,
                to_object_key,
                event_key,
                ..
            } => {
                self.reference(scenario, "from_object_key", from_object_key, object, within)?;
                self.reference(scenario, "to_object_key", to_object_key, object, within)?;
                self.reference(
                    scenario,
                    "event_key",
                    event_key,
                    KeyKind::Event,
                    Some(receiver(owner, to_object_key, subdomain)),
                )
            }
            Leaf::Query {
                from_object_key,
                to_object_key,
                query_key,
                ..
            } => {
                self.reference(scenario, "from_object_key", from_object_key, object, within)?;
                self.reference(scenario, "to_object_key", to_object_key, object, within)?;
                self.reference(
                    scenario,
                    "query_key",
                    query_key,
                    KeyKind::Query,
                    Some(receiver(owner, to_object_key, subdomain)),
                )
            }
            Leaf::Scenario {
                from_object_key,
                to_object_key,
                scenario_key,
                ..
            } => {
                self.optional(scenario, "from_object_key", from_object_key.as_ref(), object, within)?;
                self.optional(scenario, "to_object_key", to_object_key.as_ref(), object, within)?;
                self.reference(
                    scenario,
                    "scenario_key",
                    scenario_key,
                    KeyKind::Scenario,
                    Some(use_case),
                )
            }
            Leaf::Delete {
                from_object_key, ..
            } => self.reference(scenario, "from_object_key", from_object_key, object, within),
        }
    }
}
