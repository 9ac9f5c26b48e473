//! Declarative mapping from sortable attributes to physical orderings

use super::direction::SortDirection;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// One physical field and the direction to order it in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderTuple {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderTuple {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Ascending)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Descending)
    }
}

/// How one logical attribute sorts in each direction.
///
/// Empty `asc`/`desc` lists are filled in with the attribute's own name when
/// the definition is added to an [`OrderSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeDefinition {
    pub asc: Vec<OrderTuple>,
    pub desc: Vec<OrderTuple>,
    /// Direction used when the attribute is first clicked.
    pub default_direction: SortDirection,
    pub label: Option<String>,
}

impl AttributeDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asc(mut self, orders: impl IntoIterator<Item = OrderTuple>) -> Self {
        self.asc = orders.into_iter().collect();
        self
    }

    pub fn desc(mut self, orders: impl IntoIterator<Item = OrderTuple>) -> Self {
        self.desc = orders.into_iter().collect();
        self
    }

    pub fn default_direction(mut self, direction: SortDirection) -> Self {
        self.default_direction = direction;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn orders(&self, direction: SortDirection) -> &[OrderTuple] {
        match direction {
            SortDirection::Ascending => &self.asc,
            SortDirection::Descending => &self.desc,
        }
    }

    fn normalized(mut self, attribute: &str) -> Self {
        if self.asc.is_empty() {
            self.asc = vec![OrderTuple::asc(attribute)];
        }
        if self.desc.is_empty() {
            self.desc = vec![OrderTuple::desc(attribute)];
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct OrderSpec {
    attributes: BTreeMap<String, AttributeDefinition>,
}

impl OrderSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute with an explicit definition.
    pub fn attribute(
        mut self,
        name: impl Into<String>,
        definition: AttributeDefinition,
    ) -> Self {
        self.insert(name, definition);
        self
    }

    /// Add an attribute that sorts on the field of the same name.
    pub fn column(self, name: impl Into<String>) -> Self {
        self.attribute(name, AttributeDefinition::new())
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        definition: AttributeDefinition,
    ) {
        let name = name.into();
        let definition = definition.normalized(&name);
        self.attributes.insert(name, definition);
    }

    pub fn get(&self, attribute: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(attribute)
    }

    /// Like [`get`](Self::get) but unknown attributes are an error.
    pub fn require(&self, attribute: &str) -> Result<&AttributeDefinition> {
        self.get(attribute)
            .ok_or_else(|| EngineError::unknown_attribute(attribute))
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.attributes.contains_key(attribute)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Display label: the configured one, or the attribute name humanized.
    pub fn label(&self, attribute: &str) -> Result<String> {
        let definition = self.require(attribute)?;
        Ok(definition
            .label
            .clone()
            .unwrap_or_else(|| humanize(attribute)))
    }
}

impl<'de> Deserialize<'de> for OrderSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, AttributeDefinition>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .fold(OrderSpec::new(), |spec, (name, definition)| {
                spec.attribute(name, definition)
            }))
    }
}

impl<S: Into<String>> FromIterator<S> for OrderSpec {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        iter.into_iter()
            .fold(OrderSpec::new(), |spec, name| spec.column(name))
    }
}

/// `created_at` / `createdAt` / `created-at` -> `Created At`
fn humanize(attribute: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in attribute.chars() {
        if ch == '_' || ch == '-' || ch == '.' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_column_sorts_on_itself() {
        let spec = OrderSpec::new().column("title");
        let definition = spec.get("title").unwrap();
        assert_eq!(definition.asc, vec![OrderTuple::asc("title")]);
        assert_eq!(definition.desc, vec![OrderTuple::desc("title")]);
        assert_eq!(definition.default_direction, SortDirection::Ascending);
    }

    #[test]
    fn composite_attribute_keeps_all_fields() {
        let spec = OrderSpec::new().attribute(
            "name",
            AttributeDefinition::new()
                .asc([OrderTuple::asc("last_name"), OrderTuple::asc("first_name")])
                .desc([
                    OrderTuple::desc("last_name"),
                    OrderTuple::desc("first_name"),
                ])
                .label("Full name"),
        );
        let definition = spec.require("name").unwrap();
        assert_eq!(definition.orders(SortDirection::Ascending).len(), 2);
        assert_eq!(spec.label("name").unwrap(), "Full name");
    }

    #[test]
    fn require_reports_unknown_attribute() {
        let spec = OrderSpec::new().column("title");
        let err = spec.require("author").unwrap_err();
        assert!(matches!(
            err,
            EngineError::UnknownAttribute { ref attribute } if attribute == "author"
        ));
    }

    #[test]
    fn labels_are_humanized() {
        let spec: OrderSpec =
            ["created_at", "releaseYear", "id"].into_iter().collect();
        assert_eq!(spec.label("created_at").unwrap(), "Created At");
        assert_eq!(spec.label("releaseYear").unwrap(), "Release Year");
        assert_eq!(spec.label("id").unwrap(), "Id");
    }

    #[test]
    fn deserializes_from_attribute_map() {
        let spec: OrderSpec = serde_json::from_str(
            r#"{
                "title": {},
                "age": {
                    "asc": [{"field": "birth_date", "direction": "desc"}],
                    "desc": [{"field": "birth_date", "direction": "asc"}],
                    "default_direction": "desc"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(spec.len(), 2);
        assert_eq!(
            spec.require("title").unwrap().desc,
            vec![OrderTuple::desc("title")]
        );
        let age = spec.require("age").unwrap();
        assert_eq!(age.default_direction, SortDirection::Descending);
        assert_eq!(age.asc, vec![OrderTuple::desc("birth_date")]);
    }
}
