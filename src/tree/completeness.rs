//! Checks that a tree has enough structure to be useful, walking from the root to the leaves.
//! The first shortfall is reported.

use std::{collections::BTreeSet, path::Path};

use crate::{
    error::{ErrorCode, ParseError},
    parse::{Class, Model},
    tree::layout,
};

pub fn check(model: &Model, sentinel: &str) -> Result<(), ParseError> {
    let model_file = layout::entity_path(Path::new(""), layout::MODEL_FILE);
    if model.actors.is_empty() {
        return Err(ParseError::new(
            ErrorCode::NoActors,
            "the model has no actors; add at least one file under actors/",
            model_file,
        ));
    }
    if model.domains.is_empty() {
        return Err(ParseError::new(
            ErrorCode::NoDomains,
            "the model has no domains; add at least one directory under domains/",
            model_file,
        ));
    }
    for (domain_key, domain) in model.domains.iter() {
        let domain_dir = layout::domain_dir(domain_key);
        let domain_file = layout::entity_path(&domain_dir, layout::DOMAIN_FILE);
        match domain.subdomains.len() {
            0 => {
                return Err(ParseError::new(
                    ErrorCode::DomainNoSubdomains,
                    format!("domain '{domain_key}' has no subdomains"),
                    domain_file,
                ))
            }
            1 if !domain.subdomains.contains_key(sentinel) => {
                return Err(ParseError::new(
                    ErrorCode::SingleSubdomainNotDefault,
                    format!(
                        "domain '{domain_key}' has a single subdomain, which must be named '{sentinel}'"
                    ),
                    domain_file,
                ))
            }
            n if n > 1 && domain.subdomains.contains_key(sentinel) => {
                return Err(ParseError::new(
                    ErrorCode::DefaultSubdomainAmongMany,
                    format!(
                        "domain '{domain_key}' has {n} subdomains, so none may be named '{sentinel}'"
                    ),
                    domain_file,
                ))
            }
            _ => {}
        }
        for (subdomain_key, subdomain) in domain.subdomains.iter() {
            let subdomain_dir = layout::subdomain_dir(domain_key, subdomain_key);
            let subdomain_file = layout::entity_path(&subdomain_dir, layout::SUBDOMAIN_FILE);
            if subdomain.classes.len() < 2 {
                return Err(ParseError::new(
                    ErrorCode::SubdomainTooFewClasses,
                    format!(
                        "subdomain '{domain_key}/{subdomain_key}' has {} classes but needs at least 2",
                        subdomain.classes.len()
                    ),
                    subdomain_file,
                ));
            }
            if subdomain.class_associations.is_empty() {
                return Err(ParseError::new(
                    ErrorCode::SubdomainNoAssociations,
                    format!("subdomain '{domain_key}/{subdomain_key}' has no associations"),
                    subdomain_file,
                ));
            }
            for (class_key, class) in subdomain.classes.iter() {
                let class_dir = layout::class_dir(domain_key, subdomain_key, class_key);
                check_class(class_key, class, &class_dir)?;
            }
        }
    }
    Ok(())
}

fn check_class(class_key: &str, class: &Class, class_dir: &Path) -> Result<(), ParseError> {
    let class_file = layout::entity_path(class_dir, layout::CLASS_FILE);
    if class.attributes.is_empty() {
        return Err(ParseError::new(
            ErrorCode::ClassNoAttributes,
            format!("class '{class_key}' has no attributes"),
            class_file,
        )
        .with_field("attributes"));
    }
    let Some(state_machine) = &class.state_machine else {
        return Err(ParseError::new(
            ErrorCode::ClassNoStateMachine,
            format!("class '{class_key}' has no state machine"),
            layout::entity_path(class_dir, layout::STATE_MACHINE_FILE),
        ));
    };
    if state_machine.transitions.is_empty() {
        return Err(ParseError::new(
            ErrorCode::StateMachineNoTransitions,
            format!("the state machine of class '{class_key}' has no transitions"),
            layout::entity_path(class_dir, layout::STATE_MACHINE_FILE),
        )
        .with_field("transitions"));
    }
    let used = state_machine
        .states
        .values()
        .flat_map(|state| state.actions.iter().map(|a| a.action_key.as_str()))
        .chain(
            state_machine
                .transitions
                .iter()
                .filter_map(|t| t.action_key.as_deref()),
        )
        .collect::<BTreeSet<_>>();
    if let Some(unused) = class.actions.keys().find(|key| !used.contains(key.as_str())) {
        return Err(ParseError::new(
            ErrorCode::ActionUnreferenced,
            format!(
                "action '{unused}' of class '{class_key}' is not run by any state or transition"
            ),
            layout::collection_path(class_dir, &layout::ACTIONS, unused),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;
    use crate::tests::helpers::minimal_tree;

    #[test]
    fn test_minimal_tree_is_complete() {
        assert!(check(&minimal_tree(), "default").is_ok());
    }

    #[test]
    fn test_no_actors_first() {
        let mut tree = minimal_tree();
        tree.actors.clear();
        // A cross-reference problem elsewhere must not hide the missing actors.
        tree.domains
            .get_mut("orders")
            .and_then(|d| d.subdomains.get_mut("default"))
            .and_then(|s| s.classes.get_mut("book_order"))
            .unwrap()
            .actor_key = Some("nobody".to_string());
        let err = check(&tree, "default").unwrap_err();
        assert_eq!(err.code, ErrorCode::NoActors);
    }

    #[test]
    fn test_subdomain_naming() {
        let mut tree = minimal_tree();
        let domain = tree.domains.get_mut("orders").unwrap();
        let subdomain = domain.subdomains.remove("default").unwrap();
        domain.subdomains.insert("sales".to_string(), subdomain.clone());
        assert_eq!(
            check(&tree, "default").unwrap_err().code,
            ErrorCode::SingleSubdomainNotDefault
        );

        let domain = tree.domains.get_mut("orders").unwrap();
        domain.subdomains.insert("default".to_string(), subdomain);
        assert_eq!(
            check(&tree, "default").unwrap_err().code,
            ErrorCode::DefaultSubdomainAmongMany
        );
    }

    #[test]
    fn test_class_shortfalls() {
        let mut tree = minimal_tree();
        let class = tree
            .domains
            .get_mut("orders")
            .and_then(|d| d.subdomains.get_mut("default"))
            .and_then(|s| s.classes.get_mut("book_order"))
            .unwrap();
        class.state_machine.as_mut().unwrap().transitions.clear();
        let err = check(&tree, "default").unwrap_err();
        assert_eq!(err.code, ErrorCode::StateMachineNoTransitions);
        assert_eq!(
            err.file,
            Path::new("domains/orders/subdomains/default/classes/book_order/state_machine.json")
        );
    }

    #[test]
    fn test_unreferenced_action() {
        let mut tree = minimal_tree();
        let class = tree
            .domains
            .get_mut("orders")
            .and_then(|d| d.subdomains.get_mut("default"))
            .and_then(|s| s.classes.get_mut("book_order"))
            .unwrap();
        let action = class.actions["notify"].clone();
        class.actions.insert("archive".to_string(), action);
        let err = check(&tree, "default").unwrap_err();
        assert_eq!(err.code, ErrorCode::ActionUnreferenced);
        assert!(err.message.contains("archive"));
    }

    #[test]
    fn test_too_few_classes() {
        let mut tree = minimal_tree();
        tree.domains
            .get_mut("orders")
            .and_then(|d| d.subdomains.get_mut("default"))
            .unwrap()
            .classes
            .remove("book_order_line");
        assert_eq!(
            check(&tree, "default").unwrap_err().code,
            ErrorCode::SubdomainTooFewClasses
        );
    }
}
