use crate::context::{DefaultEnhancementContext, EnhancementContext};
use crate::descriptor::{ClassDescriptor, DirtyTracking, EnhancementRecord, TypeCategory};
use crate::error::{EnhanceResult, EnhancementError};
use tracing::debug;

/// Rewrites the class file of a mapped type.
pub trait Enhancer: Send + Sync {
    /// Returns the enhanced bytes, or `None` if the class needs no change.
    fn enhance(&self, class_name: &str, original: &[u8]) -> EnhanceResult<Option<Vec<u8>>>;

    /// Classifies a class ahead of enhancement.
    fn discover_types(&self, class_name: &str, original: &[u8]) -> EnhanceResult<TypeCategory>;
}

/// Enhancer for JSON mapping descriptors.
///
/// Entities get an interceptor slot, interception of their lazy-loadable
/// attributes and, when enabled, inline dirty tracking and association
/// management. Embeddables only get composite dirty tracking. Descriptors
/// that are already enhanced, or not mapped, are left as they are.
#[derive(Debug, Clone, Default)]
pub struct DescriptorEnhancer<C = DefaultEnhancementContext> {
    context: C,
}

impl<C: EnhancementContext> DescriptorEnhancer<C> {
    pub const fn new(context: C) -> Self {
        Self { context }
    }

    pub const fn context(&self) -> &C {
        &self.context
    }

    fn parse(&self, class_name: &str, original: &[u8]) -> EnhanceResult<ClassDescriptor> {
        let descriptor = ClassDescriptor::from_bytes(class_name, original)?;
        if descriptor.name != class_name {
            return Err(EnhancementError::NameMismatch {
                expected: class_name.to_string(),
                found: descriptor.name,
            });
        }
        Ok(descriptor)
    }

    fn enhance_entity(&self, class: &ClassDescriptor, interceptor_slot: bool) -> EnhancementRecord {
        let intercepted_fields = class
            .attributes
            .iter()
            .filter(|a| self.context.is_persistent_field(a) && self.context.is_lazy_loadable(class, a))
            .map(|a| a.name.clone())
            .collect();
        let managed_associations = class
            .associations()
            .filter(|a| self.context.do_bidirectional_association_management(a))
            .map(|a| a.name.clone())
            .collect();
        EnhancementRecord {
            interceptor_slot,
            intercepted_fields,
            dirty_tracking: self
                .context
                .do_dirty_checking_inline(class)
                .then_some(DirtyTracking::Inline),
            managed_associations,
            extended: self.context.do_extended_enhancement(class),
        }
    }

    fn enhance_composite(&self, class: &ClassDescriptor) -> EnhancementRecord {
        EnhancementRecord {
            dirty_tracking: self
                .context
                .do_dirty_checking_inline(class)
                .then_some(DirtyTracking::Composite),
            ..EnhancementRecord::default()
        }
    }
}

impl<C: EnhancementContext> Enhancer for DescriptorEnhancer<C> {
    fn enhance(&self, class_name: &str, original: &[u8]) -> EnhanceResult<Option<Vec<u8>>> {
        let mut class = self.parse(class_name, original)?;
        if class.is_enhanced() {
            debug!(class = class_name, "already enhanced");
            return Ok(None);
        }

        let record = if self.context.is_entity_class(&class) {
            self.enhance_entity(&class, true)
        } else if self.context.is_mapped_superclass_class(&class) {
            self.enhance_entity(&class, false)
        } else if self.context.is_composite_class(&class) {
            self.enhance_composite(&class)
        } else {
            debug!(class = class_name, "not a mapped type");
            return Ok(None);
        };

        debug!(
            class = class_name,
            intercepted = ?record.intercepted_fields,
            dirty_tracking = ?record.dirty_tracking,
            "enhanced"
        );
        class.enhancement = Some(record);
        class.to_bytes().map(Some)
    }

    fn discover_types(&self, class_name: &str, original: &[u8]) -> EnhanceResult<TypeCategory> {
        Ok(self.parse(class_name, original)?.category())
    }
}
