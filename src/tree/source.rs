//! Where a model tree is read from: a directory on disk or one JSON document shaped like it.

use serde_json::{Map, Value};
use std::{
    fs,
    path::{Component, Path, PathBuf},
};
use walkdir::WalkDir;

use crate::{
    config::MetadataFormat,
    error::{ErrorCode, ParseError},
};

/// One entry of a tree directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
}

/// Read access to a model tree. Paths are relative to the tree root.
pub trait TreeSource {
    /// Entries of `dir` sorted by name. A directory that does not exist has no entries.
    fn entries(&self, dir: &Path) -> Result<Vec<Entry>, ParseError>;

    fn read(&self, file: &Path) -> Result<Vec<u8>, ParseError>;
}

fn read_failed(path: &Path, message: impl std::fmt::Display) -> ParseError {
    ParseError::new(
        ErrorCode::TreeReadFailed,
        format!("could not read {}: {message}", path.display()),
        path,
    )
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// A model tree stored as directories and files.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
    skip_hidden: bool,
}

impl FsSource {
    pub fn new<P: AsRef<Path>>(root: P, skip_hidden: bool) -> Self {
        FsSource {
            root: root.as_ref().to_path_buf(),
            skip_hidden,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TreeSource for FsSource {
    fn entries(&self, dir: &Path) -> Result<Vec<Entry>, ParseError> {
        let full = self.root.join(dir);
        if !full.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in WalkDir::new(&full)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|err| read_failed(dir, err))?;
            let Some(name) = entry.file_name().to_str() else {
                tracing::warn!(
                    "[FsSource::entries] skipping entry with a non UTF-8 name: {:?}",
                    entry.path()
                );
                continue;
            };
            if self.skip_hidden && is_hidden(name) {
                tracing::debug!("[FsSource::entries] skipping hidden entry {:?}", entry.path());
                continue;
            }
            entries.push(Entry {
                name: name.to_string(),
                is_dir: entry.file_type().is_dir(),
            });
        }
        Ok(entries)
    }

    fn read(&self, file: &Path) -> Result<Vec<u8>, ParseError> {
        fs::read(self.root.join(file)).map_err(|err| read_failed(file, err))
    }
}

/// A model tree held in one JSON document. Directories are objects keyed by entry name and
/// files are keys with a metadata extension whose value is the entity object.
#[derive(Debug, Clone, Copy)]
pub struct JsonSource<'a> {
    root: &'a Value,
    skip_hidden: bool,
}

impl<'a> JsonSource<'a> {
    pub fn new(root: &'a Value, skip_hidden: bool) -> Self {
        JsonSource { root, skip_hidden }
    }

    fn dir(&self, dir: &Path) -> Result<Option<&'a Map<String, Value>>, ParseError> {
        let mut current = self
            .root
            .as_object()
            .ok_or_else(|| read_failed(dir, "the tree document is not an object"))?;
        for component in dir.components() {
            let Component::Normal(name) = component else {
                continue;
            };
            let name = name.to_string_lossy();
            match current.get(name.as_ref()) {
                None => return Ok(None),
                Some(Value::Object(map)) => current = map,
                Some(_) => return Err(read_failed(dir, format!("'{name}' is not a directory"))),
            }
        }
        Ok(Some(current))
    }
}

pub(crate) fn is_file_name(name: &str) -> bool {
    name.rsplit_once('.')
        .and_then(|(_, ext)| MetadataFormat::from_extension(ext))
        .is_some()
}

impl TreeSource for JsonSource<'_> {
    fn entries(&self, dir: &Path) -> Result<Vec<Entry>, ParseError> {
        let Some(map) = self.dir(dir)? else {
            return Ok(Vec::new());
        };
        let mut entries = map
            .iter()
            .filter(|(name, _)| !(self.skip_hidden && is_hidden(name)))
            .map(|(name, value)| Entry {
                name: name.clone(),
                is_dir: value.is_object() && !is_file_name(name),
            })
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read(&self, file: &Path) -> Result<Vec<u8>, ParseError> {
        let parent = file.parent().unwrap_or(Path::new(""));
        let name = file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let value = self
            .dir(parent)?
            .and_then(|map| map.get(&name))
            .ok_or_else(|| read_failed(file, "no such file in the tree document"))?;
        serde_json::to_vec(value).map_err(|err| read_failed(file, err))
    }
}
