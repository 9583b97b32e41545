use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Describes an entity type's mapping: its name, identifier and attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub entity_name: String,
    /// Name of the identifier attribute.
    pub identifier: String,
    pub attributes: Vec<AttributeMetadata>,
    /// Explicit lazy-group opt-in. When set, basic-property laziness is in
    /// effect for this type even if it is disabled globally.
    #[serde(default)]
    pub lazy_group: bool,
}

impl EntityMetadata {
    pub fn new(entity_name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            identifier: identifier.into(),
            attributes: Vec::new(),
            lazy_group: false,
        }
    }

    /// Appends an attribute mapping.
    #[must_use]
    pub fn with_attribute(mut self, attribute: AttributeMetadata) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Marks the type as carrying an explicit lazy group.
    #[must_use]
    pub fn with_lazy_group(mut self) -> Self {
        self.lazy_group = true;
        self
    }

    /// Looks up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeMetadata> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Attributes that are stored in the entity's row.
    pub fn persistent_attributes(&self) -> impl Iterator<Item = &AttributeMetadata> {
        self.attributes.iter().filter(|a| a.persistent)
    }

    /// Whether basic-property laziness applies to this type, given the global
    /// setting.
    pub const fn laziness_in_effect(&self, globally_enabled: bool) -> bool {
        globally_enabled || self.lazy_group
    }

    /// Names of the attributes that are intercepted for lazy loading.
    ///
    /// This is the single lazy fetch group: all of these are fetched together.
    pub fn lazy_attribute_names(&self, globally_enabled: bool) -> BTreeSet<String> {
        let in_effect = self.laziness_in_effect(globally_enabled);
        self.attributes
            .iter()
            .filter(|a| a.is_interception_candidate(in_effect))
            .map(|a| a.name.clone())
            .collect()
    }

    /// Persistent attributes read when the entity is first loaded.
    pub fn eager_attribute_names(&self, globally_enabled: bool) -> Vec<String> {
        let lazy = self.lazy_attribute_names(globally_enabled);
        self.persistent_attributes()
            .filter(|a| !lazy.contains(&a.name))
            .map(|a| a.name.clone())
            .collect()
    }

    pub fn has_lazy_attributes(&self, globally_enabled: bool) -> bool {
        !self.lazy_attribute_names(globally_enabled).is_empty()
    }
}

/// A single mapped attribute (the identifier is not listed here).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMetadata {
    pub name: String,
    pub kind: AttributeKind,
    pub fetch: FetchMode,
    /// `false` for transient attributes, which are never stored.
    pub persistent: bool,
}

impl AttributeMetadata {
    fn simple(name: &str, kind: AttributeKind, fetch: FetchMode) -> Self {
        Self {
            name: name.into(),
            kind,
            fetch,
            persistent: true,
        }
    }

    /// Shorthand for an eagerly fetched basic attribute.
    pub fn basic(name: &str) -> Self {
        Self::simple(name, AttributeKind::Basic, FetchMode::Eager)
    }

    /// Shorthand for a lazily fetched basic attribute.
    pub fn lazy(name: &str) -> Self {
        Self::simple(name, AttributeKind::Basic, FetchMode::Lazy)
    }

    /// Shorthand for a single-valued association.
    pub fn to_one(name: &str) -> Self {
        Self::simple(name, AttributeKind::ToOne, FetchMode::Eager)
    }

    /// Shorthand for a collection-valued association.
    pub fn to_many(name: &str) -> Self {
        Self::simple(name, AttributeKind::ToMany, FetchMode::Eager)
    }

    /// Shorthand for an embedded (composite) value.
    pub fn embedded(name: &str) -> Self {
        Self::simple(name, AttributeKind::Embedded, FetchMode::Eager)
    }

    /// Shorthand for a transient attribute.
    pub fn transient(name: &str) -> Self {
        Self {
            persistent: false,
            ..Self::simple(name, AttributeKind::Basic, FetchMode::Eager)
        }
    }

    /// Whether accesses to this attribute are routed through the interceptor.
    ///
    /// Persistent, not a to-many association (those have their own collection
    /// proxies), declared lazy, and laziness in effect for the owning type.
    pub fn is_interception_candidate(&self, laziness_in_effect: bool) -> bool {
        self.persistent
            && self.kind != AttributeKind::ToMany
            && self.fetch == FetchMode::Lazy
            && laziness_in_effect
    }
}

/// The shape of a mapped attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Basic,
    ToOne,
    ToMany,
    Embedded,
}

/// When an attribute's value is read from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// With the owning row.
    Eager,
    /// On first access through the interceptor.
    Lazy,
}
