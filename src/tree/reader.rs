use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use crate::{
    config::{MetadataFormat, TreeConfig},
    error::{ErrorCode, ParseError},
    parse::{
        parse_entity, Class, ClassAssociation, Domain, Entity, Model, ParseTree, SchemaRegistry,
        StateMachine, Subdomain, UseCase,
    },
    tree::{
        filename::{association_name, is_claimed, match_entry, match_file, simple_key},
        layout::{self, Collection},
        scope::{Scope, REFERENCE_SEPARATOR},
        source::{Entry, TreeSource},
    },
};

/// Reconstructs a parse tree from a [`TreeSource`].
///
/// Each subtree is built completely and handed back by value; a parent fills its child maps
/// once every child has been read. The first failure aborts the whole read.
pub struct TreeReader<'a, S: TreeSource> {
    source: &'a S,
    registry: &'a SchemaRegistry,
    config: &'a TreeConfig,
}

impl<'a, S: TreeSource> TreeReader<'a, S> {
    pub fn new(source: &'a S, registry: &'a SchemaRegistry, config: &'a TreeConfig) -> Self {
        TreeReader {
            source,
            registry,
            config,
        }
    }

    /// Read and fully validate the tree: assembly, then completeness, then cross-references.
    #[tracing::instrument(skip(self))]
    pub fn read(&self) -> Result<ParseTree, ParseError> {
        let tree = self.assemble()?;
        super::validate(&tree, &tree.subdomain_sentinel)?;
        tracing::info!(
            "[TreeReader::read] read model '{}' with {} actors and {} domains",
            tree.name,
            tree.actors.len(),
            tree.domains.len()
        );
        Ok(tree)
    }

    /// Read every file of the tree without the tree-level validation passes.
    pub fn assemble(&self) -> Result<ParseTree, ParseError> {
        let root = PathBuf::new();
        let entries = self.source.entries(&root)?;
        let mut model: Model = self.read_required(&root, &entries, layout::MODEL_FILE)?;
        model.subdomain_sentinel = self.config.subdomain_sentinel.clone();
        model.actors = self.read_collection(&root, &layout::ACTORS)?;
        model.actor_generalizations =
            self.read_collection(&root, &layout::ACTOR_GENERALIZATIONS)?;
        model.global_functions = self.read_collection(&root, &layout::GLOBAL_FUNCTIONS)?;
        model.domain_associations = self.read_collection(&root, &layout::DOMAIN_ASSOCIATIONS)?;
        model.class_associations = self.read_associations(&root, &Scope::Model)?;
        model.domains = self.read_dirs(&root.join(layout::DOMAINS_DIR), |key, dir| {
            self.read_domain(key, dir)
        })?;
        Ok(model)
    }

    fn read_domain(&self, key: &str, dir: &Path) -> Result<Domain, ParseError> {
        tracing::debug!("[TreeReader::read_domain] reading domain '{key}'");
        let entries = self.source.entries(dir)?;
        let mut domain: Domain = self.read_required(dir, &entries, layout::DOMAIN_FILE)?;
        domain.class_associations = self.read_associations(dir, &Scope::domain(key))?;
        domain.subdomains = self.read_dirs(&dir.join(layout::SUBDOMAINS_DIR), |name, path| {
            self.read_subdomain(key, name, path)
        })?;
        Ok(domain)
    }

    fn read_subdomain(
        &self,
        domain: &str,
        key: &str,
        dir: &Path,
    ) -> Result<Subdomain, ParseError> {
        tracing::debug!("[TreeReader::read_subdomain] reading subdomain '{domain}/{key}'");
        let entries = self.source.entries(dir)?;
        let mut subdomain: Subdomain =
            self.read_required(dir, &entries, layout::SUBDOMAIN_FILE)?;
        subdomain.classes =
            self.read_dirs(&dir.join(layout::CLASSES_DIR), |_, path| self.read_class(path))?;
        subdomain.generalizations = self.read_collection(dir, &layout::CLASS_GENERALIZATIONS)?;
        subdomain.use_case_generalizations =
            self.read_collection(dir, &layout::USE_CASE_GENERALIZATIONS)?;
        subdomain.class_associations =
            self.read_associations(dir, &Scope::subdomain(domain, key))?;
        subdomain.use_cases = self.read_dirs(&dir.join(layout::USE_CASES_DIR), |_, path| {
            self.read_use_case(path)
        })?;
        Ok(subdomain)
    }

    fn read_class(&self, dir: &Path) -> Result<Class, ParseError> {
        let entries = self.source.entries(dir)?;
        let mut class: Class = self.read_required(dir, &entries, layout::CLASS_FILE)?;
        class.state_machine = match self.find_file(dir, &entries, layout::STATE_MACHINE_FILE)? {
            Some((file, format)) => Some(self.parse_file::<StateMachine>(&file, format)?),
            None => None,
        };
        class.actions = self.read_collection(dir, &layout::ACTIONS)?;
        class.queries = self.read_collection(dir, &layout::QUERIES)?;
        Ok(class)
    }

    fn read_use_case(&self, dir: &Path) -> Result<UseCase, ParseError> {
        let entries = self.source.entries(dir)?;
        let mut use_case: UseCase = self.read_required(dir, &entries, layout::USE_CASE_FILE)?;
        use_case.scenarios = self.read_collection(dir, &layout::SCENARIOS)?;
        Ok(use_case)
    }

    fn parse_file<T: Entity>(&self, file: &Path, format: MetadataFormat) -> Result<T, ParseError> {
        let raw = self.source.read(file)?;
        parse_entity(self.registry, &raw, file, format)
    }

    /// Locate `<stem>.<ext>` among `entries`, rejecting the same file in two formats.
    fn find_file(
        &self,
        dir: &Path,
        entries: &[Entry],
        stem: &str,
    ) -> Result<Option<(PathBuf, MetadataFormat)>, ParseError> {
        let mut matches = entries
            .iter()
            .filter(|entry| !entry.is_dir)
            .filter_map(|entry| match_file(&entry.name, stem).map(|format| (entry, format)));
        let Some((entry, format)) = matches.next() else {
            return Ok(None);
        };
        if let Some((other, _)) = matches.next() {
            return Err(duplicate(&dir.join(&other.name), stem));
        }
        Ok(Some((dir.join(&entry.name), format)))
    }

    fn read_required<T: Entity>(
        &self,
        dir: &Path,
        entries: &[Entry],
        stem: &str,
    ) -> Result<T, ParseError> {
        match self.find_file(dir, entries, stem)? {
            Some((file, format)) => self.parse_file(&file, format),
            None => {
                let file = layout::entity_path(dir, stem);
                Err(ParseError::new(
                    ErrorCode::TreeRootMissing,
                    format!("required file {} is missing", file.display()),
                    file,
                ))
            }
        }
    }

    fn read_collection<T: Entity>(
        &self,
        dir: &Path,
        collection: &Collection,
    ) -> Result<BTreeMap<String, T>, ParseError> {
        let collection_dir = dir.join(collection.dir);
        let mut found = BTreeMap::new();
        for entry in self.source.entries(&collection_dir)? {
            let Some((stem, format)) = (!entry.is_dir)
                .then(|| match_entry(&entry.name, collection))
                .flatten()
            else {
                if !is_claimed(collection.dir, &entry.name) {
                    tracing::warn!(
                        "[TreeReader::read_collection] ignoring {:?}: no {}*{} entry",
                        collection_dir.join(&entry.name),
                        collection.dir,
                        collection.suffix
                    );
                }
                continue;
            };
            let file = collection_dir.join(&entry.name);
            let key = simple_key(&stem, &file)?;
            if found.contains_key(&key) {
                return Err(duplicate(&file, &key));
            }
            let entity = self.parse_file::<T>(&file, format)?;
            found.insert(key, entity);
        }
        Ok(found)
    }

    fn read_associations(
        &self,
        dir: &Path,
        scope: &Scope,
    ) -> Result<BTreeMap<String, ClassAssociation>, ParseError> {
        let mut found = BTreeMap::new();
        for collection in [layout::ASSOCIATIONS, layout::CLASS_ASSOCIATIONS_ALIAS] {
            let collection_dir = dir.join(collection.dir);
            for entry in self.source.entries(&collection_dir)? {
                let file = collection_dir.join(&entry.name);
                let Some((stem, format)) = (!entry.is_dir)
                    .then(|| match_entry(&entry.name, &collection))
                    .flatten()
                else {
                    tracing::warn!(
                        "[TreeReader::read_associations] ignoring {:?}: not an association file",
                        file
                    );
                    continue;
                };
                let name = association_name(&stem, scope.segments(), &file)?;
                if found.contains_key(&stem) {
                    return Err(duplicate(&file, &stem));
                }
                let association = self.parse_file::<ClassAssociation>(&file, format)?;
                for (reference, expected, field) in [
                    (&association.from_class_key, &name.from, "from_class_key"),
                    (&association.to_class_key, &name.to, "to_class_key"),
                ] {
                    let segments = reference.split(REFERENCE_SEPARATOR).collect::<Vec<_>>();
                    if segments != *expected {
                        return Err(ParseError::new(
                            ErrorCode::AssociationFilenameMismatch,
                            format!(
                                "'{field}' is '{reference}' but the file name names '{}'",
                                expected.join(&REFERENCE_SEPARATOR.to_string())
                            ),
                            &file,
                        )
                        .with_field(field));
                    }
                }
                found.insert(stem, association);
            }
        }
        Ok(found)
    }

    /// Read each subdirectory of `dir` as one keyed child.
    fn read_dirs<T>(
        &self,
        dir: &Path,
        mut read: impl FnMut(&str, &Path) -> Result<T, ParseError>,
    ) -> Result<BTreeMap<String, T>, ParseError> {
        let mut found = BTreeMap::new();
        for entry in self.source.entries(dir)? {
            let path = dir.join(&entry.name);
            if !entry.is_dir {
                tracing::warn!("[TreeReader::read_dirs] ignoring file {:?}", path);
                continue;
            }
            let key = simple_key(&entry.name, &path)?;
            let child = read(&key, &path)?;
            found.insert(key, child);
        }
        Ok(found)
    }
}

fn duplicate(file: &Path, key: &str) -> ParseError {
    ParseError::new(
        ErrorCode::DuplicateEntry,
        format!("'{key}' is defined more than once"),
        file,
    )
}
