//! Scope levels and the textual class references used at each of them.
//!
//! An association stored in a subdomain names classes by their bare key, one stored in a
//! domain by `subdomain/class` and one stored at model level by `domain/subdomain/class`. The
//! filename of the association uses the same segments joined with dots.

use std::fmt::{self, Display, Formatter};

use crate::key::{Key, KeyError, KeyKind, ENDPOINT_SEPARATOR};

/// Separator of segments in a class reference inside an association file.
pub const REFERENCE_SEPARATOR: char = '/';

/// Fully qualified position of a class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassPath {
    pub domain: String,
    pub subdomain: String,
    pub class: String,
}

impl ClassPath {
    pub fn new(domain: &str, subdomain: &str, class: &str) -> Self {
        ClassPath {
            domain: domain.to_string(),
            subdomain: subdomain.to_string(),
            class: class.to_string(),
        }
    }

    pub fn key(&self) -> Result<Key, KeyError> {
        let domain = Key::new(KeyKind::Domain, None, &self.domain)?;
        let subdomain = Key::new(KeyKind::Subdomain, Some(&domain), &self.subdomain)?;
        Key::new(KeyKind::Class, Some(&subdomain), &self.class)
    }

    pub fn from_key(key: &Key) -> Option<ClassPath> {
        if key.kind() != KeyKind::Class {
            return None;
        }
        Some(ClassPath::new(
            key.ancestor_name(KeyKind::Domain)?,
            key.ancestor_name(KeyKind::Subdomain)?,
            key.name(),
        ))
    }
}

impl Display for ClassPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.domain, self.subdomain, self.class)
    }
}

/// The level of the tree an association or reference lives at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Model,
    Domain { domain: String },
    Subdomain { domain: String, subdomain: String },
}

impl Scope {
    pub fn domain(domain: &str) -> Self {
        Scope::Domain {
            domain: domain.to_string(),
        }
    }

    pub fn subdomain(domain: &str, subdomain: &str) -> Self {
        Scope::Subdomain {
            domain: domain.to_string(),
            subdomain: subdomain.to_string(),
        }
    }

    /// Number of segments in a class reference at this scope.
    pub fn segments(&self) -> usize {
        match self {
            Scope::Model => 3,
            Scope::Domain { .. } => 2,
            Scope::Subdomain { .. } => 1,
        }
    }

    /// Canonical key of the entity owning this scope, `None` for the model root.
    pub fn owner_key(&self) -> Result<Option<Key>, KeyError> {
        Ok(match self {
            Scope::Model => None,
            Scope::Domain { domain } => Some(Key::new(KeyKind::Domain, None, domain)?),
            Scope::Subdomain { domain, subdomain } => {
                let domain = Key::new(KeyKind::Domain, None, domain)?;
                Some(Key::new(KeyKind::Subdomain, Some(&domain), subdomain)?)
            }
        })
    }

    /// Scope owned by `key` (`None` is the model root).
    pub fn from_owner(key: Option<&Key>) -> Option<Scope> {
        match key {
            None => Some(Scope::Model),
            Some(key) => match key.kind() {
                KeyKind::Domain => Some(Scope::domain(key.name())),
                KeyKind::Subdomain => Some(Scope::subdomain(
                    key.ancestor_name(KeyKind::Domain)?,
                    key.name(),
                )),
                _ => None,
            },
        }
    }

    /// Resolve already split reference segments against this scope.
    pub fn resolve_segments(&self, parts: &[&str]) -> Option<ClassPath> {
        if parts.len() != self.segments() {
            return None;
        }
        Some(match (self, parts) {
            (Scope::Model, [domain, subdomain, class]) => ClassPath::new(domain, subdomain, class),
            (Scope::Domain { domain }, [subdomain, class]) => {
                ClassPath::new(domain, subdomain, class)
            }
            (Scope::Subdomain { domain, subdomain }, [class]) => {
                ClassPath::new(domain, subdomain, class)
            }
            _ => return None,
        })
    }

    /// Resolve a `/`-joined class reference to a full class position.
    pub fn resolve(&self, reference: &str) -> Option<ClassPath> {
        let parts = reference.split(REFERENCE_SEPARATOR).collect::<Vec<_>>();
        self.resolve_segments(&parts)
    }

    /// Segments naming `path` relative to this scope, `None` when it lies outside it.
    pub fn relative_segments(&self, path: &ClassPath) -> Option<Vec<String>> {
        match self {
            Scope::Model => Some(vec![
                path.domain.clone(),
                path.subdomain.clone(),
                path.class.clone(),
            ]),
            Scope::Domain { domain } if *domain == path.domain => {
                Some(vec![path.subdomain.clone(), path.class.clone()])
            }
            Scope::Subdomain { domain, subdomain }
                if *domain == path.domain && *subdomain == path.subdomain =>
            {
                Some(vec![path.class.clone()])
            }
            _ => None,
        }
    }

    /// The textual reference to `path` used inside association files at this scope.
    pub fn reference(&self, path: &ClassPath) -> Option<String> {
        self.relative_segments(path)
            .map(|parts| parts.join(&REFERENCE_SEPARATOR.to_string()))
    }

    /// The dot-joined endpoint used in association filenames at this scope.
    pub fn endpoint(&self, path: &ClassPath) -> Option<String> {
        self.relative_segments(path)
            .map(|parts| parts.join(&ENDPOINT_SEPARATOR.to_string()))
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Model => f.write_str("model"),
            Scope::Domain { domain } => write!(f, "domain {domain}"),
            Scope::Subdomain { domain, subdomain } => write!(f, "subdomain {domain}/{subdomain}"),
        }
    }
}
