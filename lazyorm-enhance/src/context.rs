//! Enhancement context: what the enhancer is allowed to install.

use crate::descriptor::{ClassDescriptor, TypeCategory};
use lazyorm_model::{AttributeKind, AttributeMetadata};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Enhancement switches. All off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementFlags {
    pub enable_lazy_initialization: bool,
    pub enable_dirty_tracking: bool,
    pub enable_association_management: bool,
    pub enable_extended_enhancement: bool,
}

/// Decisions the enhancer delegates to its environment.
pub trait EnhancementContext: Send + Sync {
    fn is_entity_class(&self, class: &ClassDescriptor) -> bool {
        class.category() == TypeCategory::Entity
    }

    fn is_composite_class(&self, class: &ClassDescriptor) -> bool {
        class.category() == TypeCategory::Embeddable
    }

    fn is_mapped_superclass_class(&self, class: &ClassDescriptor) -> bool {
        class.category() == TypeCategory::MappedSuperclass
    }

    fn is_persistent_field(&self, field: &AttributeMetadata) -> bool {
        field.persistent
    }

    fn do_bidirectional_association_management(&self, field: &AttributeMetadata) -> bool;

    fn do_dirty_checking_inline(&self, class: &ClassDescriptor) -> bool;

    fn has_lazy_loadable_attributes(&self, class: &ClassDescriptor) -> bool {
        class.attributes.iter().any(|a| self.is_lazy_loadable(class, a))
    }

    /// Whether reads of `field` must be routed through the interceptor.
    fn is_lazy_loadable(&self, class: &ClassDescriptor, field: &AttributeMetadata) -> bool;

    fn do_extended_enhancement(&self, class: &ClassDescriptor) -> bool;
}

/// Context driven by [`EnhancementFlags`].
#[derive(Debug, Clone, Default)]
pub struct DefaultEnhancementContext {
    flags: EnhancementFlags,
}

impl DefaultEnhancementContext {
    pub fn new(flags: EnhancementFlags) -> Self {
        debug!(?flags, "creating enhancement context");
        Self { flags }
    }

    pub const fn flags(&self) -> EnhancementFlags {
        self.flags
    }
}

impl EnhancementContext for DefaultEnhancementContext {
    fn do_bidirectional_association_management(&self, field: &AttributeMetadata) -> bool {
        self.flags.enable_association_management
            && matches!(field.kind, AttributeKind::ToOne | AttributeKind::ToMany)
    }

    fn do_dirty_checking_inline(&self, _class: &ClassDescriptor) -> bool {
        self.flags.enable_dirty_tracking
    }

    fn is_lazy_loadable(&self, class: &ClassDescriptor, field: &AttributeMetadata) -> bool {
        field.is_interception_candidate(self.flags.enable_lazy_initialization || class.lazy_group)
    }

    fn do_extended_enhancement(&self, _class: &ClassDescriptor) -> bool {
        self.flags.enable_extended_enhancement
    }
}
