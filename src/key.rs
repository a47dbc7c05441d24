//! [crate::key] contains [Key], the typed hierarchical identifier every model entity owns, and
//! the key-name grammar shared by file names, directory names and map keys inside files.
//!
//! A key is a path of `(kind, name)` segments reflecting the entity's position in the tree, for
//! example `domain/orders/subdomain/default/class/order`. Keys are compared and hashed by their
//! full path and are the only way canonical entities reference each other.
use enumset::{EnumSet, EnumSetType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use thiserror::Error;

/// The authoritative key-name grammar.
pub static KEY_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(_[a-z0-9]+)*$").expect("key name pattern is a valid regex")
});

/// Separates the three parts of a class association name: `{from}--{to}--{name}`.
pub const ASSOCIATION_SEPARATOR: &str = "--";

/// Separates the path segments of an association endpoint inside an association name.
pub const ENDPOINT_SEPARATOR: char = '.';

/// One rule of the key-name grammar. Validation reports the full set of broken rules.
#[derive(EnumSetType, Debug, Serialize, Deserialize)]
#[enumset(serialize_repr = "list")]
pub enum NameRule {
    Empty,
    Uppercase,
    Hyphen,
    Space,
    Dot,
    LeadingDigit,
    LeadingUnderscore,
    TrailingUnderscore,
    DoubleUnderscore,
    OtherCharacter,
}

impl NameRule {
    pub fn describe(self) -> &'static str {
        match self {
            NameRule::Empty => "must not be empty",
            NameRule::Uppercase => "must not contain uppercase letters",
            NameRule::Hyphen => "must not contain hyphens (use underscores between words)",
            NameRule::Space => "must not contain whitespace",
            NameRule::Dot => "must not contain dots",
            NameRule::LeadingDigit => "must start with a letter, not a digit",
            NameRule::LeadingUnderscore => "must not start with an underscore",
            NameRule::TrailingUnderscore => "must not end with an underscore",
            NameRule::DoubleUnderscore => "must not contain consecutive underscores",
            NameRule::OtherCharacter => {
                "may only contain lowercase ASCII letters, digits and underscores"
            }
        }
    }
}

fn describe_rules(rules: &EnumSet<NameRule>) -> String {
    rules
        .iter()
        .map(NameRule::describe)
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_parent(parent: &Option<String>) -> String {
    match parent {
        Some(parent) => format!("'{parent}'"),
        None => "no parent".to_string(),
    }
}

fn describe_parent_kind(parent: &Option<KeyKind>) -> String {
    match parent {
        Some(kind) => format!("a {kind} key"),
        None => "the model root".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid key '{name}': {}", describe_rules(.rules))]
    InvalidFormat {
        name: String,
        rules: EnumSet<NameRule>,
    },
    #[error("key '{key}' has {} but {} was expected", describe_parent(.found), describe_parent(.expected))]
    ParentMismatch {
        key: String,
        found: Option<String>,
        expected: Option<String>,
    },
    #[error("a {kind} key cannot be placed under {}", describe_parent_kind(.parent))]
    IllegalParent {
        kind: KeyKind,
        parent: Option<KeyKind>,
    },
    #[error("expected a {expected} key but found '{key}'")]
    WrongKind { expected: KeyKind, key: String },
    #[error("association name '{name}' must have the shape {{from}}--{{to}}--{{name}}")]
    AssociationShape { name: String },
    #[error(
        "association endpoint '{endpoint}' has {found} segment(s) but {expected} are required at this level"
    )]
    SegmentCount {
        endpoint: String,
        expected: usize,
        found: usize,
    },
    #[error("malformed key '{0}'")]
    Malformed(String),
}

/// Returns true iff `name` satisfies the key-name grammar.
pub fn is_valid_key(name: &str) -> bool {
    KEY_NAME_PATTERN.is_match(name)
}

/// Compute every grammar rule `name` breaks. The set is empty iff the name is valid.
pub fn name_violations(name: &str) -> EnumSet<NameRule> {
    if is_valid_key(name) {
        return EnumSet::empty();
    }
    let mut rules = EnumSet::empty();
    if name.is_empty() {
        rules |= NameRule::Empty;
        return rules;
    }
    for c in name.chars() {
        match c {
            'a'..='z' | '0'..='9' | '_' => {}
            'A'..='Z' => rules |= NameRule::Uppercase,
            '-' => rules |= NameRule::Hyphen,
            '.' => rules |= NameRule::Dot,
            c if c.is_whitespace() => rules |= NameRule::Space,
            _ => rules |= NameRule::OtherCharacter,
        }
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        rules |= NameRule::LeadingDigit;
    }
    if name.starts_with('_') {
        rules |= NameRule::LeadingUnderscore;
    }
    if name.len() > 1 && name.ends_with('_') {
        rules |= NameRule::TrailingUnderscore;
    }
    if name.contains("__") {
        rules |= NameRule::DoubleUnderscore;
    }
    if rules.is_empty() {
        // Anything the regex rejects that no named rule covers.
        rules |= NameRule::OtherCharacter;
    }
    rules
}

pub fn validate_name(name: &str) -> Result<(), KeyError> {
    let rules = name_violations(name);
    if rules.is_empty() {
        Ok(())
    } else {
        Err(KeyError::InvalidFormat {
            name: name.to_string(),
            rules,
        })
    }
}

/// The kind tag of one key segment. Each entity kind accepts keys of exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyKind {
    Actor,
    ActorGeneralization,
    GlobalFunction,
    Domain,
    DomainAssociation,
    Subdomain,
    Class,
    Attribute,
    ClassGeneralization,
    ClassAssociation,
    State,
    Event,
    Guard,
    Transition,
    Action,
    Query,
    UseCase,
    UseCaseGeneralization,
    Scenario,
    ScenarioObject,
}

impl KeyKind {
    pub fn all() -> &'static [KeyKind] {
        &[
            KeyKind::Actor,
            KeyKind::ActorGeneralization,
            KeyKind::GlobalFunction,
            KeyKind::Domain,
            KeyKind::DomainAssociation,
            KeyKind::Subdomain,
            KeyKind::Class,
            KeyKind::Attribute,
            KeyKind::ClassGeneralization,
            KeyKind::ClassAssociation,
            KeyKind::State,
            KeyKind::Event,
            KeyKind::Guard,
            KeyKind::Transition,
            KeyKind::Action,
            KeyKind::Query,
            KeyKind::UseCase,
            KeyKind::UseCaseGeneralization,
            KeyKind::Scenario,
            KeyKind::ScenarioObject,
        ]
    }

    /// The tag used for this kind in the string form of a key.
    pub fn tag(self) -> &'static str {
        match self {
            KeyKind::Actor => "actor",
            KeyKind::ActorGeneralization => "agen",
            KeyKind::GlobalFunction => "gfunc",
            KeyKind::Domain => "domain",
            KeyKind::DomainAssociation => "dassoc",
            KeyKind::Subdomain => "subdomain",
            KeyKind::Class => "class",
            KeyKind::Attribute => "attribute",
            KeyKind::ClassGeneralization => "cgen",
            KeyKind::ClassAssociation => "cassoc",
            KeyKind::State => "state",
            KeyKind::Event => "event",
            KeyKind::Guard => "guard",
            KeyKind::Transition => "transition",
            KeyKind::Action => "action",
            KeyKind::Query => "query",
            KeyKind::UseCase => "usecase",
            KeyKind::UseCaseGeneralization => "ucgen",
            KeyKind::Scenario => "scenario",
            KeyKind::ScenarioObject => "sobject",
        }
    }

    pub fn from_tag(tag: &str) -> Option<KeyKind> {
        KeyKind::all().iter().copied().find(|kind| kind.tag() == tag)
    }

    /// Whether a key of this kind may be placed under a parent of kind `parent` (`None` is the
    /// model root).
    pub fn allows_parent(self, parent: Option<KeyKind>) -> bool {
        use KeyKind::*;
        match self {
            Actor | ActorGeneralization | GlobalFunction | Domain | DomainAssociation => {
                parent.is_none()
            }
            Subdomain => parent == Some(Domain),
            Class | ClassGeneralization | UseCase | UseCaseGeneralization => {
                parent == Some(Subdomain)
            }
            Attribute | State | Event | Guard | Transition | Action | Query => {
                parent == Some(Class)
            }
            ClassAssociation => matches!(parent, None | Some(Domain) | Some(Subdomain)),
            Scenario => parent == Some(UseCase),
            ScenarioObject => parent == Some(Scenario),
        }
    }
}

impl Display for KeyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Number of path segments in an association endpoint stored under `parent`: one under a
/// subdomain, two under a domain and three at model level.
pub fn association_segment_count(parent: Option<KeyKind>) -> usize {
    match parent {
        Some(KeyKind::Subdomain) => 1,
        Some(KeyKind::Domain) => 2,
        _ => 3,
    }
}

/// The compound `{from}--{to}--{name}` name of a class association, where `from` and `to` are
/// dot-joined paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssociationName {
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub name: String,
}

impl AssociationName {
    /// Parse a compound association name whose endpoints must each have `segments` segments.
    pub fn parse(s: &str, segments: usize) -> Result<AssociationName, KeyError> {
        let parts = s.split(ASSOCIATION_SEPARATOR).collect::<Vec<_>>();
        let [from, to, name] = parts.as_slice() else {
            return Err(KeyError::AssociationShape {
                name: s.to_string(),
            });
        };
        let from = AssociationName::parse_endpoint(from, segments)?;
        let to = AssociationName::parse_endpoint(to, segments)?;
        validate_name(name)?;
        Ok(AssociationName {
            from,
            to,
            name: name.to_string(),
        })
    }

    fn parse_endpoint(endpoint: &str, segments: usize) -> Result<Vec<String>, KeyError> {
        let parts = endpoint
            .split(ENDPOINT_SEPARATOR)
            .map(str::to_string)
            .collect::<Vec<_>>();
        if parts.len() != segments {
            return Err(KeyError::SegmentCount {
                endpoint: endpoint.to_string(),
                expected: segments,
                found: parts.len(),
            });
        }
        for part in parts.iter() {
            validate_name(part)?;
        }
        Ok(parts)
    }
}

impl Display for AssociationName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.from.join("."),
            self.to.join("."),
            self.name,
            sep = ASSOCIATION_SEPARATOR
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct KeySegment {
    kind: KeyKind,
    name: String,
}

/// An immutable, typed path of `(kind, name)` segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    segments: Vec<KeySegment>,
}

impl Key {
    /// Build the key of a `kind` entity named `name` under `parent`.
    ///
    /// The name must satisfy the key-name grammar; class association names must instead be a
    /// valid [`AssociationName`] for the parent's scope level.
    pub fn new(kind: KeyKind, parent: Option<&Key>, name: &str) -> Result<Key, KeyError> {
        let parent_kind = parent.map(Key::kind);
        if !kind.allows_parent(parent_kind) {
            return Err(KeyError::IllegalParent {
                kind,
                parent: parent_kind,
            });
        }
        match kind {
            KeyKind::ClassAssociation => {
                AssociationName::parse(name, association_segment_count(parent_kind))?;
            }
            _ => validate_name(name)?,
        }
        let mut segments = parent.map(|p| p.segments.clone()).unwrap_or_default();
        segments.push(KeySegment {
            kind,
            name: name.to_string(),
        });
        Ok(Key { segments })
    }

    pub fn kind(&self) -> KeyKind {
        self.last().kind
    }

    pub fn name(&self) -> &str {
        &self.last().name
    }

    fn last(&self) -> &KeySegment {
        // Keys are only built through `new`, which always pushes a segment.
        &self.segments[self.segments.len() - 1]
    }

    /// The key formed by dropping the last segment.
    pub fn parent(&self) -> Option<Key> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(Key {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Check that this key's parent is exactly `expected`.
    pub fn validate_parent(&self, expected: Option<&Key>) -> Result<(), KeyError> {
        let found = self.parent();
        if found.as_ref() == expected {
            Ok(())
        } else {
            Err(KeyError::ParentMismatch {
                key: self.to_string(),
                found: found.map(|k| k.to_string()),
                expected: expected.map(|k| k.to_string()),
            })
        }
    }

    pub fn expect_kind(&self, expected: KeyKind) -> Result<(), KeyError> {
        if self.kind() == expected {
            Ok(())
        } else {
            Err(KeyError::WrongKind {
                expected,
                key: self.to_string(),
            })
        }
    }

    /// The nearest ancestor (or self) of the given kind.
    pub fn ancestor(&self, kind: KeyKind) -> Option<Key> {
        let idx = self.segments.iter().rposition(|s| s.kind == kind)?;
        Some(Key {
            segments: self.segments[..=idx].to_vec(),
        })
    }

    /// Name of the nearest ancestor (or self) of the given kind.
    pub fn ancestor_name(&self, kind: KeyKind) -> Option<&str> {
        self.segments
            .iter()
            .rev()
            .find(|s| s.kind == kind)
            .map(|s| s.name.as_str())
    }

    pub fn segments(&self) -> impl Iterator<Item = (KeyKind, &str)> {
        self.segments.iter().map(|s| (s.kind, s.name.as_str()))
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let rendered = self
            .segments
            .iter()
            .map(|s| format!("{}/{}", s.kind.tag(), s.name))
            .collect::<Vec<_>>()
            .join("/");
        f.write_str(&rendered)
    }
}

impl FromStr for Key {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s.split('/').collect::<Vec<_>>();
        if parts.is_empty() || parts.len() % 2 != 0 {
            return Err(KeyError::Malformed(s.to_string()));
        }
        let mut key: Option<Key> = None;
        for pair in parts.chunks(2) {
            let kind = KeyKind::from_tag(pair[0]).ok_or_else(|| KeyError::Malformed(s.to_string()))?;
            key = Some(Key::new(kind, key.as_ref(), pair[1])?);
        }
        key.ok_or_else(|| KeyError::Malformed(s.to_string()))
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Key::from_str(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn class_key() -> Key {
        let domain = Key::new(KeyKind::Domain, None, "orders").unwrap();
        let subdomain = Key::new(KeyKind::Subdomain, Some(&domain), "default").unwrap();
        Key::new(KeyKind::Class, Some(&subdomain), "order").unwrap()
    }

    #[test]
    fn test_valid_names() {
        for name in ["order", "book_order", "order2", "a1_b2_c3", "x"] {
            assert!(is_valid_key(name), "{name} should be valid");
            assert!(name_violations(name).is_empty());
            assert!(validate_name(name).is_ok());
        }
    }

    #[test]
    fn test_invalid_names_name_their_rule() {
        let cases = [
            ("Order", NameRule::Uppercase),
            ("book-order", NameRule::Hyphen),
            ("2order", NameRule::LeadingDigit),
            ("_order", NameRule::LeadingUnderscore),
            ("order_", NameRule::TrailingUnderscore),
            ("order__line", NameRule::DoubleUnderscore),
            ("order.line", NameRule::Dot),
            ("order line", NameRule::Space),
            ("", NameRule::Empty),
            ("ordér", NameRule::OtherCharacter),
        ];
        for (name, rule) in cases {
            assert!(!is_valid_key(name));
            let err = validate_name(name).unwrap_err();
            match &err {
                KeyError::InvalidFormat { rules, .. } => {
                    assert!(rules.contains(rule), "{name}: {rules:?} should contain {rule:?}")
                }
                other => panic!("unexpected error {other:?}"),
            }
            assert!(
                err.to_string().contains(rule.describe()),
                "message for {name} should name the rule: {err}"
            );
        }
    }

    #[test]
    fn test_all_violations_are_collected() {
        let rules = name_violations("_Book-order__");
        assert!(rules.contains(NameRule::LeadingUnderscore));
        assert!(rules.contains(NameRule::Uppercase));
        assert!(rules.contains(NameRule::Hyphen));
        assert!(rules.contains(NameRule::DoubleUnderscore));
        assert!(rules.contains(NameRule::TrailingUnderscore));
    }

    #[test]
    fn test_key_string_round_trip() {
        let key = class_key();
        assert_eq!(key.to_string(), "domain/orders/subdomain/default/class/order");
        let parsed: Key = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
        assert_eq!(parsed.kind(), KeyKind::Class);
        assert_eq!(parsed.name(), "order");
        assert_eq!(parsed.ancestor_name(KeyKind::Domain), Some("orders"));
    }

    #[test]
    fn test_parent_and_validate_parent() {
        let key = class_key();
        let parent = key.parent().unwrap();
        assert_eq!(parent.to_string(), "domain/orders/subdomain/default");
        assert!(key.validate_parent(Some(&parent)).is_ok());
        assert!(matches!(
            key.validate_parent(None),
            Err(KeyError::ParentMismatch { .. })
        ));
        let domain = parent.parent().unwrap();
        assert!(domain.parent().is_none());
        assert!(domain.validate_parent(None).is_ok());
    }

    #[test]
    fn test_illegal_parent_is_rejected() {
        let domain = Key::new(KeyKind::Domain, None, "orders").unwrap();
        assert!(matches!(
            Key::new(KeyKind::Class, Some(&domain), "order"),
            Err(KeyError::IllegalParent { .. })
        ));
        assert!(matches!(
            Key::new(KeyKind::Subdomain, None, "default"),
            Err(KeyError::IllegalParent { parent: None, .. })
        ));
    }

    #[test]
    fn test_expect_kind() {
        let key = class_key();
        assert!(key.expect_kind(KeyKind::Class).is_ok());
        assert!(matches!(
            key.expect_kind(KeyKind::Actor),
            Err(KeyError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_association_name_grammar() {
        let name = AssociationName::parse("book_order--book_order_line--order_lines", 1).unwrap();
        assert_eq!(name.from, vec!["book_order".to_string()]);
        assert_eq!(name.to, vec!["book_order_line".to_string()]);
        assert_eq!(name.name, "order_lines");
        assert_eq!(name.to_string(), "book_order--book_order_line--order_lines");

        let err = AssociationName::parse("book_order--book_order_line--order_lines", 2).unwrap_err();
        assert!(matches!(
            err,
            KeyError::SegmentCount {
                expected: 2,
                found: 1,
                ..
            }
        ));

        let name = AssociationName::parse("sales.order--billing.invoice--billed_by", 2).unwrap();
        assert_eq!(name.from, vec!["sales".to_string(), "order".to_string()]);

        assert!(matches!(
            AssociationName::parse("order--line", 1),
            Err(KeyError::AssociationShape { .. })
        ));
        assert!(matches!(
            AssociationName::parse("Order--line--lines", 1),
            Err(KeyError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_association_key_uses_scope_of_parent() {
        let domain = Key::new(KeyKind::Domain, None, "orders").unwrap();
        let key = Key::new(
            KeyKind::ClassAssociation,
            Some(&domain),
            "sales.order--billing.invoice--billed_by",
        )
        .unwrap();
        let parsed: Key = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
        assert!(Key::new(KeyKind::ClassAssociation, Some(&domain), "order--invoice--billed_by").is_err());
    }

    #[test]
    fn test_malformed_key_strings() {
        for s in ["", "class", "widget/x", "domain/Orders", "domain/orders/class"] {
            assert!(s.parse::<Key>().is_err(), "{s} should not parse");
        }
    }

    #[test]
    fn test_key_serde_as_string() {
        let key = class_key();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"domain/orders/subdomain/default/class/order\"");
        let back: Key = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
