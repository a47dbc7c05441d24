//! Shared test utilities for model tree testing

use serde_json::{json, Value};

use crate::{
    config::TreeConfig,
    parse::{Model, ParseTree, SchemaRegistry, Subdomain},
    tree::{JsonSource, TreeReader},
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// The smallest tree that passes every validation pass, as a JSON tree document:
///
/// one actor, one domain with a `default` subdomain holding two classes and one association,
/// each class with one attribute, a one-transition state machine and a referenced action.
pub fn minimal_tree_json() -> Value {
    json!({
        "model.json": { "name": "Bookstore", "details": "Sells books online." },
        "actors": {
            "customer.actor.json": { "name": "Customer", "actor_type": "person" }
        },
        "domains": {
            "orders": {
                "domain.json": { "name": "Orders" },
                "subdomains": {
                    "default": {
                        "subdomain.json": { "name": "Default" },
                        "associations": {
                            "book_order--book_order_line--order_lines.assoc.json": {
                                "name": "Order lines",
                                "from_class_key": "book_order",
                                "from_multiplicity": "1",
                                "to_class_key": "book_order_line",
                                "to_multiplicity": "1..*"
                            }
                        },
                        "classes": {
                            "book_order": {
                                "class.json": {
                                    "name": "Book order",
                                    "attributes": {
                                        "placed_on": { "name": "Placed on", "data_type_rules": "date" }
                                    },
                                    "indexes": [["placed_on"]]
                                },
                                "state_machine.json": {
                                    "states": {
                                        "open": {
                                            "name": "Open",
                                            "actions": [ { "action_key": "notify", "when": "entry" } ]
                                        }
                                    },
                                    "events": { "place": { "name": "Place" } },
                                    "transitions": [ { "to_state_key": "open", "event_key": "place" } ]
                                },
                                "actions": {
                                    "notify.json": { "name": "Notify customer" }
                                }
                            },
                            "book_order_line": {
                                "class.json": {
                                    "name": "Book order line",
                                    "attributes": {
                                        "quantity": { "name": "Quantity", "data_type_rules": "unconstrained" }
                                    }
                                },
                                "state_machine.json": {
                                    "states": { "added": { "name": "Added" } },
                                    "events": { "add": { "name": "Add" } },
                                    "transitions": [
                                        { "to_state_key": "added", "event_key": "add", "action_key": "reserve" }
                                    ]
                                },
                                "actions": {
                                    "reserve.json": { "name": "Reserve stock" }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}

/// [`minimal_tree_json`] assembled into a parse tree, without the tree-level passes.
pub fn minimal_tree() -> ParseTree {
    init_logging();
    let document = minimal_tree_json();
    let registry = SchemaRegistry::new();
    let config = TreeConfig::default();
    let source = JsonSource::new(&document, config.skip_hidden);
    TreeReader::new(&source, &registry, &config)
        .assemble()
        .expect("the minimal tree assembles")
}

/// The `orders/default` subdomain of the minimal tree.
pub fn subdomain_mut(tree: &mut Model) -> &mut Subdomain {
    tree.domains
        .get_mut("orders")
        .and_then(|domain| domain.subdomains.get_mut("default"))
        .expect("the minimal tree has orders/default")
}
