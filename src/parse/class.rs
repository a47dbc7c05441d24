use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    error::{ErrorCode, ParseError},
    parse::{Action, Entity, FileKind, Logic, Query, Rules, StateMachine},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    /// Actor this class represents, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_key: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uml_comment: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Attribute>,
    /// Identifying attribute groups, each listing attribute keys. The canonical model keeps
    /// only which groups an attribute belongs to, so a converted tree lists each group's
    /// attributes in key order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<Vec<String>>,

    #[serde(skip)]
    pub state_machine: Option<StateMachine>,
    #[serde(skip)]
    pub actions: BTreeMap<String, Action>,
    #[serde(skip)]
    pub queries: BTreeMap<String, Query>,
}

impl Entity for Class {
    const KIND: FileKind = FileKind::Class;

    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(&self.name, ErrorCode::ClassNameRequired, "name")?;
        rules.optional(&self.actor_key, ErrorCode::ClassActorKeyBlank, "actor_key")?;
        for (key, attribute) in self.attributes.iter() {
            rules.map_key(key, "attributes")?;
            attribute
                .validate(rules)
                .map_err(|err| err.within(&format!("attributes.{key}")))?;
        }
        for (idx, index) in self.indexes.iter().enumerate() {
            let field = format!("indexes[{idx}]");
            rules.non_empty_items(
                index,
                ErrorCode::ClassIndexEmpty,
                ErrorCode::ClassIndexEntryBlank,
                &field,
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data_type_rules: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivation_policy: Option<Logic>,
    #[serde(default, skip_serializing_if = "crate::parse::is_false")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uml_comment: String,
}

impl Attribute {
    pub fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(&self.name, ErrorCode::AttributeNameRequired, "name")?;
        if let Some(policy) = &self.derivation_policy {
            policy
                .validate(rules)
                .map_err(|err| err.within("derivation_policy"))?;
        }
        Ok(())
    }
}

/// A relationship between two classes. Class references are `/`-joined paths whose length
/// depends on where the association is stored: `class` in a subdomain, `subdomain/class` in a
/// domain and `domain/subdomain/class` at model level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassAssociation {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    pub from_class_key: String,
    pub from_multiplicity: String,
    pub to_class_key: String,
    pub to_multiplicity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub association_class_key: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uml_comment: String,
}

impl Entity for ClassAssociation {
    const KIND: FileKind = FileKind::ClassAssociation;

    fn validate(&self, rules: &Rules<'_>) -> Result<(), ParseError> {
        rules.required(&self.name, ErrorCode::AssociationNameRequired, "name")?;
        rules.required(
            &self.from_class_key,
            ErrorCode::AssociationFromClassRequired,
            "from_class_key",
        )?;
        rules.required(
            &self.to_class_key,
            ErrorCode::AssociationToClassRequired,
            "to_class_key",
        )?;
        rules.optional(
            &self.association_class_key,
            ErrorCode::AssociationClassBlank,
            "association_class_key",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::MetadataFormat,
        parse::{parse_entity, SchemaRegistry},
    };
    use std::path::Path;
    use test_log::test;

    fn parse_class(raw: &str) -> Result<Class, ParseError> {
        parse_entity(
            &SchemaRegistry::new(),
            raw.as_bytes(),
            Path::new("classes/book/class.json"),
            MetadataFormat::Json,
        )
    }

    #[test]
    fn test_attribute_name_nested_path() {
        let err = parse_class(
            r#"{ "name": "Book", "attributes": { "title": { "name": "" } } }"#,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::AttributeNameRequired);
        assert_eq!(err.field.as_deref(), Some("attributes.title.name"));
    }

    #[test]
    fn test_derivation_policy_nested_path() {
        let err = parse_class(
            r#"{ "name": "Book", "attributes": { "price": { "name": "Price",
                 "derivation_policy": { "description": "sum", "notation": "prose" } } } }"#,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::LogicNotationInvalid);
        assert_eq!(
            err.field.as_deref(),
            Some("attributes.price.derivation_policy.notation")
        );
    }

    #[test]
    fn test_attribute_keys_follow_grammar() {
        let err = parse_class(r#"{ "name": "Book", "attributes": { "myAttr": { "name": "A" } } }"#)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::KeyInvalidFormat);
        assert_eq!(err.field.as_deref(), Some("attributes.myAttr"));
    }

    #[test]
    fn test_index_rules() {
        let err = parse_class(r#"{ "name": "Book", "indexes": [["isbn"], []] }"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::ClassIndexEmpty);
        assert_eq!(err.field.as_deref(), Some("indexes[1]"));
        let err = parse_class(r#"{ "name": "Book", "indexes": [["isbn", " "]] }"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::ClassIndexEntryBlank);
        assert_eq!(err.field.as_deref(), Some("indexes[0][1]"));
    }

    #[test]
    fn test_actor_key_blank() {
        let err = parse_class(r#"{ "name": "Customer", "actor_key": "" }"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::ClassActorKeyBlank);
    }

    #[test]
    fn test_association_fields() {
        let registry = SchemaRegistry::new();
        let file = Path::new("associations/book--author--written_by.assoc.json");
        let association: ClassAssociation = parse_entity(
            &registry,
            br#"{ "name": "Written by", "from_class_key": "book", "from_multiplicity": "*",
                  "to_class_key": "author", "to_multiplicity": "1..*" }"#,
            file,
            MetadataFormat::Json,
        )
        .unwrap();
        assert_eq!(association.to_multiplicity, "1..*");
        assert!(association.association_class_key.is_none());

        let err = parse_entity::<ClassAssociation>(
            &registry,
            br#"{ "name": "Written by", "from_class_key": "book", "from_multiplicity": "*",
                  "to_class_key": "author", "to_multiplicity": "1", "association_class_key": "" }"#,
            file,
            MetadataFormat::Json,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::AssociationClassBlank);
    }
}
