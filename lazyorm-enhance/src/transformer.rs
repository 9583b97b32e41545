//! The load-time transformation boundary.

use crate::enhancer::Enhancer;
use crate::error::TransformError;
use crate::loader::{ClassLoader, LoadedClass};
use std::borrow::Cow;
use std::path::PathBuf;

/// Where a class is loaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectionDomain {
    pub code_source: Option<PathBuf>,
}

/// Rewrites class bytes as they are loaded.
///
/// Returning the input borrowed, or bytes equal to it, means "no change".
pub trait ClassTransformer: Send + Sync {
    fn transform<'a>(
        &self,
        loader: &dyn ClassLoader,
        class_name: &str,
        class_being_redefined: Option<&LoadedClass>,
        protection_domain: Option<&ProtectionDomain>,
        class_bytes: &'a [u8],
    ) -> Result<Cow<'a, [u8]>, TransformError>;
}

/// Transformer that runs an [`Enhancer`] over classes in the given packages.
pub struct EnhancingTransformer<E> {
    enhancer: E,
    packages: Vec<String>,
}

impl<E: Enhancer> EnhancingTransformer<E> {
    /// Transforms every class.
    pub const fn new(enhancer: E) -> Self {
        Self {
            enhancer,
            packages: Vec::new(),
        }
    }

    /// Restricts transformation to classes inside `packages`.
    #[must_use]
    pub fn for_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.packages = packages.into_iter().map(Into::into).collect();
        self
    }

    fn applies_to(&self, class_name: &str) -> bool {
        self.packages.is_empty()
            || self.packages.iter().any(|package| {
                class_name
                    .strip_prefix(package.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
            })
    }
}

impl<E: Enhancer> ClassTransformer for EnhancingTransformer<E> {
    fn transform<'a>(
        &self,
        _loader: &dyn ClassLoader,
        class_name: &str,
        _class_being_redefined: Option<&LoadedClass>,
        _protection_domain: Option<&ProtectionDomain>,
        class_bytes: &'a [u8],
    ) -> Result<Cow<'a, [u8]>, TransformError> {
        if !self.applies_to(class_name) {
            return Ok(Cow::Borrowed(class_bytes));
        }
        Ok(match self.enhancer.enhance(class_name, class_bytes)? {
            Some(enhanced) => Cow::Owned(enhanced),
            None => Cow::Borrowed(class_bytes),
        })
    }
}
