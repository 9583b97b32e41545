//! Mapping descriptors: the "class files" processed by the enhancer.
//!
//! A descriptor is the JSON description of one compiled mapped type: its
//! name, mapping annotations and attributes. Enhancement rewrites it with an
//! [`EnhancementRecord`] describing what was installed.

use crate::error::{EnhanceResult, EnhancementError};
use lazyorm_model::{AttributeKind, AttributeMetadata};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const ENTITY: &str = "Entity";
pub const EMBEDDABLE: &str = "Embeddable";
pub const MAPPED_SUPERCLASS: &str = "MappedSuperclass";

/// How a type takes part in the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCategory {
    Entity,
    Embeddable,
    MappedSuperclass,
    /// Not mapped. Left untouched.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    /// Dotted class name, e.g. `org.foo.Bar`.
    pub name: String,
    #[serde(default)]
    pub annotations: BTreeSet<String>,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeMetadata>,
    /// Explicit lazy-group opt-in for this type.
    #[serde(default)]
    pub lazy_group: bool,
    /// Present once the type has been enhanced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhancement: Option<EnhancementRecord>,
}

/// What enhancement installed into a type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancementRecord {
    /// The type carries an interceptor slot.
    pub interceptor_slot: bool,
    /// Attributes whose reads are routed through the interceptor.
    pub intercepted_fields: Vec<String>,
    pub dirty_tracking: Option<DirtyTracking>,
    /// Attributes whose inverse side is kept in sync on write.
    #[serde(default)]
    pub managed_associations: Vec<String>,
    #[serde(default)]
    pub extended: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirtyTracking {
    /// Per-attribute tracking inside an entity.
    Inline,
    /// Change propagation from an embeddable to its owner.
    Composite,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: BTreeSet::new(),
            identifier: None,
            attributes: Vec::new(),
            lazy_group: false,
            enhancement: None,
        }
    }

    /// An `@Entity` descriptor with the given identifier attribute.
    pub fn entity(name: impl Into<String>, identifier: &str) -> Self {
        let mut descriptor = Self::new(name).annotated(ENTITY);
        descriptor.identifier = Some(identifier.to_string());
        descriptor
    }

    /// An `@Embeddable` descriptor.
    pub fn embeddable(name: impl Into<String>) -> Self {
        Self::new(name).annotated(EMBEDDABLE)
    }

    #[must_use]
    pub fn annotated(mut self, annotation: &str) -> Self {
        self.annotations.insert(annotation.to_string());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, attribute: AttributeMetadata) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn category(&self) -> TypeCategory {
        if self.annotations.contains(ENTITY) {
            TypeCategory::Entity
        } else if self.annotations.contains(EMBEDDABLE) {
            TypeCategory::Embeddable
        } else if self.annotations.contains(MAPPED_SUPERCLASS) {
            TypeCategory::MappedSuperclass
        } else {
            TypeCategory::Other
        }
    }

    pub const fn is_enhanced(&self) -> bool {
        self.enhancement.is_some()
    }

    /// Attributes that reference other entities.
    pub fn associations(&self) -> impl Iterator<Item = &AttributeMetadata> {
        self.attributes
            .iter()
            .filter(|a| matches!(a.kind, AttributeKind::ToOne | AttributeKind::ToMany))
    }

    /// Parses a descriptor read from a class file.
    pub fn from_bytes(class_name: &str, bytes: &[u8]) -> EnhanceResult<Self> {
        serde_json::from_slice(bytes).map_err(|source| EnhancementError::InvalidDescriptor {
            class_name: class_name.to_string(),
            source,
        })
    }

    pub fn to_bytes(&self) -> EnhanceResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|source| EnhancementError::Encode {
            class_name: self.name.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_from_annotations() {
        assert_eq!(ClassDescriptor::entity("a.B", "id").category(), TypeCategory::Entity);
        assert_eq!(ClassDescriptor::embeddable("a.C").category(), TypeCategory::Embeddable);
        assert_eq!(
            ClassDescriptor::new("a.D").annotated(MAPPED_SUPERCLASS).category(),
            TypeCategory::MappedSuperclass
        );
        assert_eq!(ClassDescriptor::new("a.E").category(), TypeCategory::Other);
    }

    #[test]
    fn minimal_descriptor_parses() {
        let descriptor = ClassDescriptor::from_bytes("org.foo.Bar", br#"{"name":"org.foo.Bar"}"#).unwrap();
        assert_eq!(descriptor.name, "org.foo.Bar");
        assert!(!descriptor.is_enhanced());
    }

    #[test]
    fn garbage_is_rejected() {
        let err = ClassDescriptor::from_bytes("org.foo.Bar", b"\xca\xfe\xba\xbe").unwrap_err();
        assert!(matches!(err, EnhancementError::InvalidDescriptor { .. }));
    }
}
