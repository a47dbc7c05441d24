//! Lays a parse tree out as files, the inverse of [`crate::tree::reader`].
//!
//! Every record is written without its child maps; children go to the directories next to
//! it, named the way the reader expects to find them.

use serde::Serialize;
use serde_json::{Map, Value};
use std::{
    collections::BTreeMap,
    fs,
    path::{Component, Path, PathBuf},
};

use crate::{
    config::{MetadataFormat, TreeConfig},
    error::ModelError,
    key::{association_segment_count, validate_name, AssociationName, KeyKind},
    parse::{encode, Class, Domain, ParseTree, Subdomain, UseCase},
    tree::layout::{self, Collection},
};

/// Write access to a model tree. Paths are relative to the tree root.
pub trait TreeSink {
    /// Extension given to written entity files.
    fn extension(&self) -> &'static str;

    fn put(&mut self, file: &Path, value: Value) -> Result<(), ModelError>;
}

/// Writes entity files below a root directory, creating directories as needed.
///
/// A file already holding the same entity in another format is removed, so a directory can
/// be rewritten in a new format.
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
    format: MetadataFormat,
    pretty: bool,
}

impl FsSink {
    pub fn new<P: AsRef<Path>>(root: P, config: &TreeConfig) -> Self {
        FsSink {
            root: root.as_ref().to_path_buf(),
            format: config.format,
            pretty: config.pretty,
        }
    }
}

impl TreeSink for FsSink {
    fn extension(&self) -> &'static str {
        self.format.extension()
    }

    fn put(&mut self, file: &Path, value: Value) -> Result<(), ModelError> {
        let full = self.root.join(file);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        let stale = MetadataFormat::ALL
            .into_iter()
            .filter(|format| *format != self.format)
            .flat_map(|format| format.extensions().iter())
            .map(|ext| full.with_extension(ext));
        for sibling in stale {
            if sibling.is_file() {
                fs::remove_file(&sibling)?;
                tracing::debug!("[FsSink::put] removed {:?}", sibling);
            }
        }
        fs::write(&full, encode(&value, self.format, self.pretty)?)?;
        tracing::debug!("[FsSink::put] wrote {:?}", full);
        Ok(())
    }
}

/// Collects a tree into one JSON document shaped like the directory tree, the form read by
/// [`crate::tree::JsonSource`].
#[derive(Debug, Clone, Default)]
pub struct JsonSink {
    root: Map<String, Value>,
}

impl JsonSink {
    pub fn new() -> Self {
        JsonSink::default()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }
}

impl TreeSink for JsonSink {
    fn extension(&self) -> &'static str {
        MetadataFormat::Json.extension()
    }

    fn put(&mut self, file: &Path, value: Value) -> Result<(), ModelError> {
        let names = file
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy().to_string()),
                _ => None,
            })
            .collect::<Vec<_>>();
        let Some((file_name, dirs)) = names.split_last() else {
            return Err(ModelError::Io(format!("cannot write to {file:?}")));
        };
        let mut current = &mut self.root;
        for dir in dirs {
            let entry = current
                .entry(dir.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            current = match entry {
                Value::Object(map) => map,
                _ => return Err(ModelError::Io(format!("'{dir}' in {file:?} is a file"))),
            };
        }
        current.insert(file_name.clone(), value);
        Ok(())
    }
}

/// Writes a parse tree through a [`TreeSink`].
pub struct TreeWriter<'a, S: TreeSink> {
    sink: &'a mut S,
}

impl<'a, S: TreeSink> TreeWriter<'a, S> {
    pub fn new(sink: &'a mut S) -> Self {
        TreeWriter { sink }
    }

    #[tracing::instrument(skip_all)]
    pub fn write(&mut self, tree: &ParseTree) -> Result<(), ModelError> {
        let root = PathBuf::new();
        self.put_file(&root, layout::MODEL_FILE, tree)?;
        self.put_collection(&root, &layout::ACTORS, &tree.actors)?;
        self.put_collection(
            &root,
            &layout::ACTOR_GENERALIZATIONS,
            &tree.actor_generalizations,
        )?;
        self.put_collection(&root, &layout::GLOBAL_FUNCTIONS, &tree.global_functions)?;
        self.put_collection(
            &root,
            &layout::DOMAIN_ASSOCIATIONS,
            &tree.domain_associations,
        )?;
        self.put_associations(&root, None, &tree.class_associations)?;
        for (key, domain) in tree.domains.iter() {
            validate_name(key)?;
            self.put_domain(key, domain)?;
        }
        tracing::info!(
            "[TreeWriter::write] wrote model '{}' with {} domains",
            tree.name,
            tree.domains.len()
        );
        Ok(())
    }

    fn put_domain(&mut self, key: &str, domain: &Domain) -> Result<(), ModelError> {
        let dir = layout::domain_dir(key);
        self.put_file(&dir, layout::DOMAIN_FILE, domain)?;
        self.put_associations(&dir, Some(KeyKind::Domain), &domain.class_associations)?;
        for (subdomain_key, subdomain) in domain.subdomains.iter() {
            validate_name(subdomain_key)?;
            self.put_subdomain(&layout::subdomain_dir(key, subdomain_key), subdomain)?;
        }
        Ok(())
    }

    fn put_subdomain(&mut self, dir: &Path, subdomain: &Subdomain) -> Result<(), ModelError> {
        self.put_file(dir, layout::SUBDOMAIN_FILE, subdomain)?;
        self.put_collection(dir, &layout::CLASS_GENERALIZATIONS, &subdomain.generalizations)?;
        self.put_collection(
            dir,
            &layout::USE_CASE_GENERALIZATIONS,
            &subdomain.use_case_generalizations,
        )?;
        self.put_associations(
            dir,
            Some(KeyKind::Subdomain),
            &subdomain.class_associations,
        )?;
        for (key, class) in subdomain.classes.iter() {
            validate_name(key)?;
            self.put_class(&dir.join(layout::CLASSES_DIR).join(key), class)?;
        }
        for (key, use_case) in subdomain.use_cases.iter() {
            validate_name(key)?;
            self.put_use_case(&dir.join(layout::USE_CASES_DIR).join(key), use_case)?;
        }
        Ok(())
    }

    fn put_class(&mut self, dir: &Path, class: &Class) -> Result<(), ModelError> {
        self.put_file(dir, layout::CLASS_FILE, class)?;
        if let Some(state_machine) = &class.state_machine {
            self.put_file(dir, layout::STATE_MACHINE_FILE, state_machine)?;
        }
        self.put_collection(dir, &layout::ACTIONS, &class.actions)?;
        self.put_collection(dir, &layout::QUERIES, &class.queries)
    }

    fn put_use_case(&mut self, dir: &Path, use_case: &UseCase) -> Result<(), ModelError> {
        self.put_file(dir, layout::USE_CASE_FILE, use_case)?;
        self.put_collection(dir, &layout::SCENARIOS, &use_case.scenarios)
    }

    fn put_file<T: Serialize>(
        &mut self,
        dir: &Path,
        stem: &str,
        entity: &T,
    ) -> Result<(), ModelError> {
        let file = dir.join(format!("{stem}.{}", self.sink.extension()));
        self.sink.put(&file, serde_json::to_value(entity)?)
    }

    fn put_collection<T: Serialize>(
        &mut self,
        dir: &Path,
        collection: &Collection,
        entities: &BTreeMap<String, T>,
    ) -> Result<(), ModelError> {
        let collection_dir = dir.join(collection.dir);
        for (key, entity) in entities.iter() {
            validate_name(key)?;
            let file = collection_dir.join(collection.file_name(key, self.sink.extension()));
            self.sink.put(&file, serde_json::to_value(entity)?)?;
        }
        Ok(())
    }

    /// Association names must be valid compound names for the level they are written at.
    fn put_associations<T: Serialize>(
        &mut self,
        dir: &Path,
        owner: Option<KeyKind>,
        associations: &BTreeMap<String, T>,
    ) -> Result<(), ModelError> {
        let segments = association_segment_count(owner);
        let collection_dir = dir.join(layout::ASSOCIATIONS.dir);
        for (name, association) in associations.iter() {
            AssociationName::parse(name, segments)?;
            let file = collection_dir.join(
                layout::ASSOCIATIONS.file_name(name, self.sink.extension()),
            );
            self.sink.put(&file, serde_json::to_value(association)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyError;
    use crate::tests::helpers::{init_logging, minimal_tree, minimal_tree_json};
    use test_log::test;

    #[test]
    fn test_json_sink_reproduces_the_tree_document() {
        init_logging();
        let mut sink = JsonSink::new();
        TreeWriter::new(&mut sink).write(&minimal_tree()).unwrap();
        assert_eq!(sink.into_value(), minimal_tree_json());
    }

    #[test]
    fn test_fs_sink_lays_out_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FsSink::new(dir.path(), &TreeConfig::default());
        TreeWriter::new(&mut sink).write(&minimal_tree()).unwrap();
        let class_dir = dir
            .path()
            .join("domains/orders/subdomains/default/classes/book_order");
        assert!(dir.path().join("model.json").is_file());
        assert!(dir.path().join("actors/customer.actor.json").is_file());
        assert!(class_dir.join("class.json").is_file());
        assert!(class_dir.join("state_machine.json").is_file());
        assert!(class_dir.join("actions/notify.json").is_file());
        assert!(dir
            .path()
            .join("domains/orders/subdomains/default/associations")
            .join("book_order--book_order_line--order_lines.assoc.json")
            .is_file());
        let text = fs::read_to_string(class_dir.join("class.json")).unwrap();
        assert!(!text.contains("state_machine"));
    }

    #[test]
    fn test_yaml_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = TreeConfig {
            format: MetadataFormat::Yaml,
            ..Default::default()
        };
        let mut sink = FsSink::new(dir.path(), &config);
        TreeWriter::new(&mut sink).write(&minimal_tree()).unwrap();
        let text = fs::read_to_string(dir.path().join("model.yaml")).unwrap();
        assert!(text.contains("name:"));
    }

    #[test]
    fn test_rewrite_in_another_format_replaces_files() {
        let dir = tempfile::tempdir().unwrap();
        let tree = crate::read_tree_json(&minimal_tree_json()).unwrap();
        let mut sink = FsSink::new(dir.path(), &TreeConfig::default());
        TreeWriter::new(&mut sink).write(&tree).unwrap();

        let config = TreeConfig {
            format: MetadataFormat::Yaml,
            ..Default::default()
        };
        let mut sink = FsSink::new(dir.path(), &config);
        TreeWriter::new(&mut sink).write(&tree).unwrap();
        assert!(dir.path().join("model.yaml").is_file());
        assert!(!dir.path().join("model.json").exists());
        assert!(!dir.path().join("actors/customer.actor.json").exists());
        assert_eq!(crate::read_tree(dir.path()).unwrap(), tree);
    }

    #[test]
    fn test_invalid_association_name_is_rejected() {
        let mut tree = minimal_tree();
        let association = tree.domains["orders"].subdomains["default"]
            .class_associations
            .values()
            .next()
            .cloned()
            .unwrap();
        tree.domains
            .get_mut("orders")
            .unwrap()
            .class_associations
            .insert("book_order--book_order_line--lines".to_string(), association);
        let mut sink = JsonSink::new();
        let err = TreeWriter::new(&mut sink).write(&tree).unwrap_err();
        assert!(matches!(err, ModelError::Key(KeyError::SegmentCount { .. })));
    }
}
