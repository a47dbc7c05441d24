//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; later calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

fn logic(description: &str, specification: &str) -> Value {
    json!({
        "description": description,
        "notation": "tla_plus",
        "specification": specification
    })
}

/// Directory of a class with one attribute, one state, one event and an initial transition.
fn simple_class(name: &str, attribute: &str, state: &str, event: &str) -> Value {
    json!({
        "class.json": {
            "name": name,
            "attributes": { attribute: { "name": attribute, "data_type_rules": "string" } }
        },
        "state_machine.json": {
            "states": { state: { "name": state } },
            "events": { event: { "name": event } },
            "transitions": [ { "to_state_key": state, "event_key": event } ]
        }
    })
}

/// A model tree exercising every entity kind, as one JSON tree document.
///
/// - actors `customer` and `member`, with `member` a specialization of `customer`
/// - domain `orders` with its single `default` subdomain: classes, a class generalization,
///   guards, queries, use cases with shares and a use case generalization, and scenarios with
///   every step and leaf kind
/// - domain `catalog` split into subdomains `titles` and `inventory`, with a domain-level
///   association between them
/// - a model-level association from `orders` into `catalog`
///
/// Some files use a `.yaml` name so the tree also exercises the YAML reader once on disk.
#[allow(dead_code)]
pub fn rich_tree_json() -> Value {
    json!({
        "model.json": {
            "name": "Bookstore",
            "details": "Sells books online and in store.",
            "invariants": [ logic("Stock is never negative", "\\A c \\in Copies: c.count >= 0") ]
        },
        "actors": {
            "customer.actor.json": { "name": "Customer", "actor_type": "person" },
            "member.actor.yaml": { "name": "Member", "actor_type": "person", "details": "Pays a yearly fee." }
        },
        "generalizations": {
            "customers.agen.json": {
                "name": "Customers",
                "superclass_key": "customer",
                "subclass_keys": ["member"],
                "is_complete": false
            }
        },
        "global_functions": {
            "positive.func.json": {
                "name": "Positive",
                "parameters": ["value"],
                "logic": logic("The value is above zero", "value > 0")
            }
        },
        "domain_associations": {
            "orders_catalog.dassoc.json": {
                "problem_domain_key": "orders",
                "solution_domain_key": "catalog"
            }
        },
        "associations": {
            "orders.default.book_order_line--catalog.titles.title--line_title.assoc.json": {
                "name": "Line title",
                "from_class_key": "orders/default/book_order_line",
                "from_multiplicity": "*",
                "to_class_key": "catalog/titles/title",
                "to_multiplicity": "1"
            }
        },
        "domains": {
            "orders": orders_domain(),
            "catalog": catalog_domain()
        }
    })
}

fn orders_domain() -> Value {
    json!({
        "domain.json": { "name": "Orders", "realized": false },
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
                    },
                    "shopper--book_order--places.assoc.yaml": {
                        "name": "Places",
                        "from_class_key": "shopper",
                        "from_multiplicity": "1",
                        "to_class_key": "book_order",
                        "to_multiplicity": "0..*"
                    }
                },
                "generalizations": {
                    "order_kinds.gen.json": {
                        "name": "Order kinds",
                        "superclass_key": "book_order",
                        "subclass_keys": ["rush_order"],
                        "is_complete": true,
                        "is_static": true
                    },
                    "checkouts.ucgen.json": {
                        "name": "Checkouts",
                        "superclass_key": "place_order",
                        "subclass_keys": ["express_checkout"]
                    }
                },
                "classes": {
                    "book_order": {
                        "class.json": {
                            "name": "Book order",
                            "attributes": {
                                "number": { "name": "Number", "data_type_rules": "integer" },
                                "placed_on": { "name": "Placed on", "data_type_rules": "date", "nullable": true }
                            },
                            "indexes": [["number"], ["number", "placed_on"]]
                        },
                        "state_machine.json": {
                            "states": {
                                "open": {
                                    "name": "Open",
                                    "actions": [ { "action_key": "notify", "when": "entry" } ]
                                },
                                "closed": { "name": "Closed" }
                            },
                            "events": {
                                "place": { "name": "Place" },
                                "pay": { "name": "Pay", "parameters": [ { "name": "amount", "data_type_rules": "money" } ] }
                            },
                            "guards": {
                                "paid_in_full": { "name": "Paid in full", "logic": logic("The amount covers the total", "amount >= total") }
                            },
                            "transitions": [
                                { "to_state_key": "open", "event_key": "place" },
                                { "from_state_key": "open", "to_state_key": "closed", "event_key": "pay", "guard_key": "paid_in_full", "action_key": "archive" },
                                { "from_state_key": "closed", "event_key": "pay" }
                            ]
                        },
                        "actions": {
                            "notify.json": { "name": "Notify customer" },
                            "archive.yaml": {
                                "name": "Archive",
                                "guarantees": [ logic("The order is read only", "read_only' = TRUE") ]
                            }
                        },
                        "queries": {
                            "total.json": {
                                "name": "Total",
                                "requires": [ logic("The order has lines", "lines # {}") ]
                            }
                        }
                    },
                    "book_order_line": simple_class("Book order line", "quantity", "added", "add"),
                    "rush_order": simple_class("Rush order", "deadline", "rushed", "rush"),
                    "shopper": {
                        "class.json": {
                            "name": "Shopper",
                            "actor_key": "customer",
                            "attributes": { "email": { "name": "Email" } }
                        },
                        "state_machine.json": {
                            "states": { "browsing": { "name": "Browsing" } },
                            "events": { "arrive": { "name": "Arrive" } },
                            "transitions": [ { "to_state_key": "browsing", "event_key": "arrive" } ]
                        }
                    }
                },
                "use_cases": {
                    "browse": {
                        "use_case.json": { "name": "Browse", "level": "mud", "read_only": true }
                    },
                    "express_checkout": {
                        "use_case.json": { "name": "Express checkout", "level": "sea" }
                    },
                    "place_order": {
                        "use_case.json": {
                            "name": "Place order",
                            "level": "sea",
                            "actors": { "shopper": {} },
                            "shares": { "browse": { "share_type": "include" } }
                        },
                        "scenarios": {
                            "happy_path.scenario.json": {
                                "name": "Happy path",
                                "objects": {
                                    "buyer": { "object_number": 1, "name": "Buyer", "class_key": "shopper" },
                                    "order": { "object_number": 2, "name_style": "unnamed", "class_key": "book_order" }
                                },
                                "steps": {
                                    "step_type": "sequence",
                                    "statements": [
                                        { "step_type": "leaf", "leaf_type": "event", "from_object_key": "buyer", "to_object_key": "order", "event_key": "place" },
                                        { "step_type": "leaf", "leaf_type": "query", "from_object_key": "buyer", "to_object_key": "order", "query_key": "total" },
                                        {
                                            "step_type": "loop",
                                            "condition": "more books wanted",
                                            "statements": [
                                                { "step_type": "leaf", "leaf_type": "scenario", "from_object_key": "buyer", "scenario_key": "add_line" }
                                            ]
                                        },
                                        {
                                            "step_type": "switch",
                                            "cases": [
                                                {
                                                    "condition": "paid",
                                                    "statements": [
                                                        { "step_type": "leaf", "leaf_type": "event", "description": "pay up", "from_object_key": "buyer", "to_object_key": "order", "event_key": "pay" }
                                                    ]
                                                },
                                                {
                                                    "condition": "abandoned",
                                                    "statements": [
                                                        { "step_type": "leaf", "leaf_type": "delete", "from_object_key": "order" }
                                                    ]
                                                }
                                            ]
                                        }
                                    ]
                                }
                            },
                            "add_line.scenario.yaml": { "name": "Add a line" }
                        }
                    }
                }
            }
        }
    })
}

fn catalog_domain() -> Value {
    json!({
        "domain.json": { "name": "Catalog", "realized": true },
        "associations": {
            "titles.title--inventory.copy--copies.assoc.json": {
                "name": "Copies",
                "from_class_key": "titles/title",
                "from_multiplicity": "1",
                "to_class_key": "inventory/copy",
                "to_multiplicity": "0..*"
            }
        },
        "subdomains": {
            "titles": {
                "subdomain.json": { "name": "Titles" },
                "associations": {
                    "title--author--written_by.assoc.json": {
                        "name": "Written by",
                        "from_class_key": "title",
                        "from_multiplicity": "*",
                        "to_class_key": "author",
                        "to_multiplicity": "1..*",
                        "association_class_key": "credit"
                    }
                },
                "classes": {
                    "title": simple_class("Title", "isbn", "listed", "list"),
                    "author": simple_class("Author", "full_name", "known", "sign"),
                    "credit": simple_class("Credit", "role", "credited", "credit")
                }
            },
            "inventory": {
                "subdomain.json": { "name": "Inventory" },
                "associations": {
                    "copy--shelf--stored_on.assoc.json": {
                        "name": "Stored on",
                        "from_class_key": "copy",
                        "from_multiplicity": "*",
                        "to_class_key": "shelf",
                        "to_multiplicity": "0..1"
                    }
                },
                "classes": {
                    "copy": simple_class("Copy", "barcode", "shelved", "receive"),
                    "shelf": simple_class("Shelf", "label", "mounted", "mount")
                }
            }
        }
    })
}

/// Lay a JSON tree document out as files below `root`. Objects whose name carries a
/// metadata extension become files, written as YAML when the extension says so.
#[allow(dead_code)]
pub fn write_tree_document(root: &Path, document: &Value) {
    std::fs::create_dir_all(root).unwrap();
    let Value::Object(entries) = document else {
        panic!("tree document directories must be objects");
    };
    for (name, value) in entries {
        let path = root.join(name);
        let extension = Path::new(name).extension().and_then(|ext| ext.to_str());
        match extension {
            Some("json") => {
                std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap()
            }
            Some("yaml") | Some("yml") => {
                std::fs::write(&path, serde_yaml::to_string(value).unwrap()).unwrap()
            }
            _ => write_tree_document(&path, value),
        }
    }
}

/// Write [`rich_tree_json`] below `<temp_dir>/model` and return that path.
#[allow(dead_code)]
pub fn create_rich_tree(temp_dir: &TempDir) -> PathBuf {
    let root = temp_dir.path().join("model");
    write_tree_document(&root, &rich_tree_json());
    root
}
