//! Names of the files and directories that make up a model tree.
//!
//! ```text
//! model.json
//! actors/<key>.actor.json
//! generalizations/<key>.agen.json
//! global_functions/<key>.func.json
//! domain_associations/<key>.dassoc.json
//! associations/<d.s.c>--<d.s.c>--<name>.assoc.json
//! domains/<key>/domain.json
//! domains/<key>/associations/<s.c>--<s.c>--<name>.assoc.json
//! domains/<key>/subdomains/<key>/subdomain.json
//!     associations/<c>--<c>--<name>.assoc.json
//!     generalizations/<key>.gen.json
//!     generalizations/<key>.ucgen.json
//!     classes/<key>/class.json
//!     classes/<key>/state_machine.json
//!     classes/<key>/actions/<key>.json
//!     classes/<key>/queries/<key>.json
//!     use_cases/<key>/use_case.json
//!     use_cases/<key>/scenarios/<key>.scenario.json
//! ```
//!
//! Every `.json` file may instead be written as `.yaml` or `.yml`.

use std::path::{Path, PathBuf};

use crate::key::{Key, KeyKind};

pub const MODEL_FILE: &str = "model";
pub const DOMAIN_FILE: &str = "domain";
pub const SUBDOMAIN_FILE: &str = "subdomain";
pub const CLASS_FILE: &str = "class";
pub const STATE_MACHINE_FILE: &str = "state_machine";
pub const USE_CASE_FILE: &str = "use_case";

pub const DOMAINS_DIR: &str = "domains";
pub const SUBDOMAINS_DIR: &str = "subdomains";
pub const CLASSES_DIR: &str = "classes";
pub const USE_CASES_DIR: &str = "use_cases";

/// A directory of single-file entities sharing a filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collection {
    pub dir: &'static str,
    /// Suffix between the key and the format extension, including its leading dot. Empty
    /// when the file is just `<key>.<ext>`.
    pub suffix: &'static str,
}

impl Collection {
    pub fn file_name(&self, stem: &str, ext: &str) -> String {
        format!("{stem}{}.{ext}", self.suffix)
    }
}

pub const ACTORS: Collection = Collection {
    dir: "actors",
    suffix: ".actor",
};
pub const ACTOR_GENERALIZATIONS: Collection = Collection {
    dir: "generalizations",
    suffix: ".agen",
};
pub const GLOBAL_FUNCTIONS: Collection = Collection {
    dir: "global_functions",
    suffix: ".func",
};
pub const DOMAIN_ASSOCIATIONS: Collection = Collection {
    dir: "domain_associations",
    suffix: ".dassoc",
};
pub const ASSOCIATIONS: Collection = Collection {
    dir: "associations",
    suffix: ".assoc",
};
/// Alternative directory name accepted for associations when reading.
pub const CLASS_ASSOCIATIONS_ALIAS: Collection = Collection {
    dir: "class_associations",
    suffix: ".assoc",
};
pub const CLASS_GENERALIZATIONS: Collection = Collection {
    dir: "generalizations",
    suffix: ".gen",
};
pub const USE_CASE_GENERALIZATIONS: Collection = Collection {
    dir: "generalizations",
    suffix: ".ucgen",
};
pub const ACTIONS: Collection = Collection {
    dir: "actions",
    suffix: "",
};
pub const QUERIES: Collection = Collection {
    dir: "queries",
    suffix: "",
};
pub const SCENARIOS: Collection = Collection {
    dir: "scenarios",
    suffix: ".scenario",
};

pub const ALL_COLLECTIONS: &[Collection] = &[
    ACTORS,
    ACTOR_GENERALIZATIONS,
    GLOBAL_FUNCTIONS,
    DOMAIN_ASSOCIATIONS,
    ASSOCIATIONS,
    CLASS_ASSOCIATIONS_ALIAS,
    CLASS_GENERALIZATIONS,
    USE_CASE_GENERALIZATIONS,
    ACTIONS,
    QUERIES,
    SCENARIOS,
];

/// Relative directory of a domain.
pub fn domain_dir(domain: &str) -> PathBuf {
    Path::new(DOMAINS_DIR).join(domain)
}

pub fn subdomain_dir(domain: &str, subdomain: &str) -> PathBuf {
    domain_dir(domain).join(SUBDOMAINS_DIR).join(subdomain)
}

pub fn class_dir(domain: &str, subdomain: &str, class: &str) -> PathBuf {
    subdomain_dir(domain, subdomain).join(CLASSES_DIR).join(class)
}

pub fn use_case_dir(domain: &str, subdomain: &str, use_case: &str) -> PathBuf {
    subdomain_dir(domain, subdomain)
        .join(USE_CASES_DIR)
        .join(use_case)
}

/// Path used to refer to an entity file in diagnostics raised after the tree is assembled,
/// when the on-disk extension is no longer known.
pub fn entity_path(dir: &Path, file_stem: &str) -> PathBuf {
    dir.join(format!("{file_stem}.json"))
}

pub fn collection_path(dir: &Path, collection: &Collection, stem: &str) -> PathBuf {
    dir.join(collection.dir).join(collection.file_name(stem, "json"))
}

/// The file an entity with this canonical key is stored in, relative to the tree root.
///
/// Entities held inside another entity's file (attributes, state machine parts, scenario
/// objects) map to that file.
pub fn file_of(key: &Key) -> PathBuf {
    let mut dir = PathBuf::new();
    let mut file = entity_path(&dir, MODEL_FILE);
    for (kind, name) in key.segments() {
        file = match kind {
            KeyKind::Domain => {
                dir = dir.join(DOMAINS_DIR).join(name);
                entity_path(&dir, DOMAIN_FILE)
            }
            KeyKind::Subdomain => {
                dir = dir.join(SUBDOMAINS_DIR).join(name);
                entity_path(&dir, SUBDOMAIN_FILE)
            }
            KeyKind::Class => {
                dir = dir.join(CLASSES_DIR).join(name);
                entity_path(&dir, CLASS_FILE)
            }
            KeyKind::UseCase => {
                dir = dir.join(USE_CASES_DIR).join(name);
                entity_path(&dir, USE_CASE_FILE)
            }
            KeyKind::Attribute => file,
            KeyKind::State | KeyKind::Event | KeyKind::Guard | KeyKind::Transition => {
                entity_path(&dir, STATE_MACHINE_FILE)
            }
            KeyKind::ScenarioObject => file,
            KeyKind::Actor => collection_path(&dir, &ACTORS, name),
            KeyKind::ActorGeneralization => collection_path(&dir, &ACTOR_GENERALIZATIONS, name),
            KeyKind::GlobalFunction => collection_path(&dir, &GLOBAL_FUNCTIONS, name),
            KeyKind::DomainAssociation => collection_path(&dir, &DOMAIN_ASSOCIATIONS, name),
            KeyKind::ClassAssociation => collection_path(&dir, &ASSOCIATIONS, name),
            KeyKind::ClassGeneralization => collection_path(&dir, &CLASS_GENERALIZATIONS, name),
            KeyKind::UseCaseGeneralization => {
                collection_path(&dir, &USE_CASE_GENERALIZATIONS, name)
            }
            KeyKind::Action => collection_path(&dir, &ACTIONS, name),
            KeyKind::Query => collection_path(&dir, &QUERIES, name),
            KeyKind::Scenario => collection_path(&dir, &SCENARIOS, name),
        };
    }
    file
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_file_of_key() {
        let key: Key = "domain/orders/subdomain/default/class/book/state/open"
            .parse()
            .unwrap();
        assert_eq!(
            file_of(&key),
            PathBuf::from("domains/orders/subdomains/default/classes/book/state_machine.json")
        );
        let key: Key = "domain/orders/subdomain/default/class/book/attribute/title"
            .parse()
            .unwrap();
        assert_eq!(
            file_of(&key),
            PathBuf::from("domains/orders/subdomains/default/classes/book/class.json")
        );
        let key: Key = "actor/alice".parse().unwrap();
        assert_eq!(file_of(&key), PathBuf::from("actors/alice.actor.json"));
        let key: Key = "domain/orders/cassoc/a.b--c.d--e".parse().unwrap();
        assert_eq!(
            file_of(&key),
            PathBuf::from("domains/orders/associations/a.b--c.d--e.assoc.json")
        );
    }

    #[test]
    fn test_paths() {
        assert_eq!(
            class_dir("orders", "default", "book"),
            PathBuf::from("domains/orders/subdomains/default/classes/book")
        );
        assert_eq!(
            collection_path(Path::new(""), &ACTORS, "alice"),
            PathBuf::from("actors/alice.actor.json")
        );
        assert_eq!(ACTIONS.file_name("ship", "yaml"), "ship.yaml");
    }
}
