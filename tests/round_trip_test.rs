//! Round-trip tests
//!
//! Converts the rich fixture tree to the canonical model and back, and writes it out as files
//! in both metadata formats, expecting the identical parse tree every time.

use std::path::Path;
use tempfile::tempdir;
use test_log::test;

use reqmodel_core::{
    canonical::{Leaf, Model, Multiplicity, Step, TransitionPath},
    config::{MetadataFormat, TreeConfig, CONFIG_FILE_NAME},
    from_canonical,
    key::Key,
    read_tree, read_tree_json, to_canonical, write_tree, write_tree_json, ErrorCode, ModelError,
};

mod common;
use common::{create_rich_tree, init_logging, rich_tree_json, write_tree_document};

fn key(text: &str) -> Key {
    text.parse().unwrap()
}

fn rich_model() -> Model {
    init_logging();
    let tree = read_tree_json(&rich_tree_json()).unwrap();
    to_canonical(&tree, "bookstore").unwrap()
}

#[test]
fn test_canonical_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let tree = read_tree(create_rich_tree(&temp))?;
    let model = to_canonical(&tree, "bookstore")?;
    tracing::info!("converted model with {} domains", model.domains.len());
    assert_eq!(from_canonical(&model)?, tree);
    Ok(())
}

#[test]
fn test_canonical_keys_and_back_references() {
    let model = rich_model();
    assert_eq!(model.key, "bookstore");

    let customer = &model.actors[&key("actor/customer")];
    let member = &model.actors[&key("actor/member")];
    assert_eq!(customer.superclass_of_key, Some(key("agen/customers")));
    assert_eq!(member.subclass_of_key, Some(key("agen/customers")));

    let association = &model.domain_associations[&key("dassoc/orders_catalog")];
    assert_eq!(association.problem_domain_key, key("domain/orders"));
    assert_eq!(association.solution_domain_key, key("domain/catalog"));

    let line_title = model
        .class_associations
        .values()
        .next()
        .expect("one model-level association");
    assert_eq!(
        line_title.from_class_key,
        key("domain/orders/subdomain/default/class/book_order_line")
    );
    assert_eq!(line_title.to_class_key, key("domain/catalog/subdomain/titles/class/title"));
    assert_eq!(line_title.from_multiplicity, Multiplicity::Any);

    let catalog = &model.domains[&key("domain/catalog")];
    let copies = catalog
        .class_associations
        .values()
        .next()
        .expect("one domain-level association");
    assert_eq!(
        copies.to_class_key,
        key("domain/catalog/subdomain/inventory/class/copy")
    );
    let titles = &catalog.subdomains[&key("domain/catalog/subdomain/titles")];
    let written_by = titles.class_associations.values().next().unwrap();
    assert_eq!(
        written_by.association_class_key,
        Some(key("domain/catalog/subdomain/titles/class/credit"))
    );
}

#[test]
fn test_canonical_state_machine_and_scenarios() {
    let model = rich_model();
    let orders = &model.domains[&key("domain/orders")].subdomains
        [&key("domain/orders/subdomain/default")];

    let order = &orders.classes[&key("domain/orders/subdomain/default/class/book_order")];
    assert_eq!(
        order.superclass_of_key,
        Some(key("domain/orders/subdomain/default/cgen/order_kinds"))
    );
    let number = &order.attributes[&key("domain/orders/subdomain/default/class/book_order/attribute/number")];
    assert_eq!(number.index_nums, vec![0, 1]);

    let closing = &order.transitions
        [&key("domain/orders/subdomain/default/class/book_order/transition/transition_1")];
    assert!(matches!(&closing.path, TransitionPath::Between { from, to }
        if from.name() == "open" && to.name() == "closed"));
    assert_eq!(
        closing.guard_key.as_ref().map(|k| k.name()),
        Some("paid_in_full")
    );
    let last = &order.transitions
        [&key("domain/orders/subdomain/default/class/book_order/transition/transition_2")];
    assert!(matches!(&last.path, TransitionPath::Final { from } if from.name() == "closed"));

    let place_order =
        &orders.use_cases[&key("domain/orders/subdomain/default/usecase/place_order")];
    assert_eq!(
        place_order.superclass_of_key,
        Some(key("domain/orders/subdomain/default/ucgen/checkouts"))
    );
    assert!(place_order
        .actors
        .contains_key(&key("domain/orders/subdomain/default/class/shopper")));

    let happy_path = &place_order.scenarios
        [&key("domain/orders/subdomain/default/usecase/place_order/scenario/happy_path")];
    let Some(Step::Sequence { statements }) = &happy_path.steps else {
        panic!("happy path starts with a sequence");
    };
    let Step::Leaf(Leaf::Event {
        from_object_key,
        event_key,
        ..
    }) = &statements[0]
    else {
        panic!("the first statement is an event");
    };
    assert_eq!(
        *from_object_key,
        key("domain/orders/subdomain/default/usecase/place_order/scenario/happy_path/sobject/buyer")
    );
    assert_eq!(
        *event_key,
        key("domain/orders/subdomain/default/class/book_order/event/place")
    );
}

#[test]
fn test_written_tree_reads_back() -> Result<(), Box<dyn std::error::Error>> {
    let tree = read_tree_json(&rich_tree_json())?;
    let temp = tempdir()?;
    let out = temp.path().join("out");
    write_tree(&tree, &out)?;

    assert!(out.join("model.json").is_file());
    assert!(out.join("actors/member.actor.json").is_file());
    assert!(out
        .join("domains/orders/subdomains/default/classes/book_order/actions/archive.json")
        .is_file());
    assert_eq!(read_tree(&out)?, tree);
    Ok(())
}

#[test]
fn test_written_yaml_tree_reads_back() -> Result<(), Box<dyn std::error::Error>> {
    let tree = read_tree_json(&rich_tree_json())?;
    let temp = tempdir()?;
    let out = temp.path().join("out");
    std::fs::create_dir_all(&out)?;
    let config = TreeConfig {
        format: MetadataFormat::Yaml,
        ..Default::default()
    };
    std::fs::write(out.join(CONFIG_FILE_NAME), config.to_toml_string()?)?;

    write_tree(&tree, &out)?;
    assert!(out.join("model.yaml").is_file());
    assert!(!out.join("model.json").exists());
    assert!(out
        .join(Path::new("domains/catalog/subdomains/titles/classes/title/state_machine.yaml"))
        .is_file());
    assert_eq!(read_tree(&out)?, tree);
    Ok(())
}

#[test]
fn test_configured_sentinel_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let text = serde_json::to_string(&rich_tree_json())?
        .replace("orders.default.", "orders.main.")
        .replace("orders/default/", "orders/main/");
    let mut document: serde_json::Value = serde_json::from_str(&text)?;
    let subdomains = document["domains"]["orders"]["subdomains"]
        .as_object_mut()
        .unwrap();
    let main = subdomains.remove("default").unwrap();
    subdomains.insert("main".to_string(), main);

    let temp = tempdir()?;
    let root = temp.path().join("model");
    write_tree_document(&root, &document);
    let config = TreeConfig {
        subdomain_sentinel: "main".to_string(),
        ..Default::default()
    };
    std::fs::write(root.join(CONFIG_FILE_NAME), config.to_toml_string()?)?;

    let tree = read_tree(&root)?;
    assert_eq!(tree.subdomain_sentinel, "main");
    let model = to_canonical(&tree, "bookstore")?;
    assert!(model.domains[&key("domain/orders")]
        .subdomains
        .contains_key(&key("domain/orders/subdomain/main")));
    assert_eq!(from_canonical(&model)?, tree);

    // Without the config file the same directory breaks the sentinel rule.
    std::fs::remove_file(root.join(CONFIG_FILE_NAME))?;
    let err = read_tree(&root).unwrap_err();
    assert_eq!(err.code, ErrorCode::SingleSubdomainNotDefault);
    Ok(())
}

#[test]
fn test_tree_document_round_trip()-> Result<(), Box<dyn std::error::Error>> {
    let tree = read_tree_json(&rich_tree_json())?;
    let document = write_tree_json(&tree)?;
    assert!(document["domains"]["orders"]["subdomains"]["default"]["classes"]["book_order"]
        ["state_machine.json"]
        .is_object());
    assert_eq!(read_tree_json(&document)?, tree);
    Ok(())
}

#[test]
fn test_write_then_convert_everything() -> Result<(), Box<dyn std::error::Error>> {
    let model = rich_model();
    let temp = tempdir()?;
    let out = temp.path().join("out");
    write_tree(&from_canonical(&model)?, &out)?;
    assert_eq!(to_canonical(&read_tree(&out)?, "bookstore")?, model);
    Ok(())
}

#[test]
fn test_broken_canonical_model_is_refused() {
    let mut model = rich_model();
    let orders = model
        .domains
        .get_mut(&key("domain/orders"))
        .and_then(|domain| domain.subdomains.get_mut(&key("domain/orders/subdomain/default")))
        .unwrap();
    let place_order = orders
        .use_cases
        .get_mut(&key("domain/orders/subdomain/default/usecase/place_order"))
        .unwrap();
    place_order.shares.clear();
    place_order.shares.insert(
        key("domain/orders/subdomain/default/usecase/refund"),
        reqmodel_core::canonical::UseCaseShared {
            share_type: reqmodel_core::parse::ShareType::Extend,
            uml_comment: String::new(),
        },
    );

    let err = from_canonical(&model).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::CanonicalReferenceUnresolved));
    let ModelError::Parse(parse) = err else {
        panic!("expected a diagnostic");
    };
    assert_eq!(
        parse.field.as_deref(),
        Some("shares")
    );
}

const HAPPY_PATH: &str = "domain/orders/subdomain/default/usecase/place_order/scenario/happy_path";

/// Leaf statement `idx` of the happy path's top-level sequence.
fn happy_path_leaf(model: &mut Model, idx: usize) -> &mut Leaf {
    let scenario = model
        .domains
        .get_mut(&key("domain/orders"))
        .and_then(|domain| domain.subdomains.get_mut(&key("domain/orders/subdomain/default")))
        .and_then(|orders| {
            orders
                .use_cases
                .get_mut(&key("domain/orders/subdomain/default/usecase/place_order"))
        })
        .and_then(|use_case| use_case.scenarios.get_mut(&key(HAPPY_PATH)))
        .unwrap();
    let Some(Step::Sequence { statements }) = scenario.steps.as_mut() else {
        panic!("happy path starts with a sequence");
    };
    let Step::Leaf(leaf) = &mut statements[idx] else {
        panic!("statement {idx} is a leaf");
    };
    leaf
}

#[test]
fn test_scenario_leaf_must_target_the_receiving_class() {
    // The order receives an event that only the shopper knows.
    let mut model = rich_model();
    let Leaf::Event { event_key, .. } = happy_path_leaf(&mut model, 0) else {
        panic!("the first statement is an event");
    };
    *event_key = key("domain/orders/subdomain/default/class/shopper/event/arrive");
    let err = from_canonical(&model).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::CanonicalReferenceOutOfScope));
    let ModelError::Parse(parse) = err else {
        panic!("expected a diagnostic");
    };
    assert_eq!(parse.field.as_deref(), Some("event_key"));

    // The shopper is asked for the order's total.
    let mut model = rich_model();
    let Leaf::Query { to_object_key, .. } = happy_path_leaf(&mut model, 1) else {
        panic!("the second statement is a query");
    };
    *to_object_key = key(&format!("{HAPPY_PATH}/sobject/buyer"));
    let err = from_canonical(&model).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::CanonicalReferenceOutOfScope));
}
