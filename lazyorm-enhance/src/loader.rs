//! Class loaders over directories of class files, and the instrumented
//! loader that applies a [`ClassTransformer`] on the way in.

use crate::error::ClassLoadError;
use crate::transformer::{ClassTransformer, ProtectionDomain};
use std::borrow::Cow;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// A class as defined by some loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedClass {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Name of the loader that defined the class.
    pub defining_loader: String,
}

pub trait ClassLoader: Send + Sync {
    fn name(&self) -> &str;

    /// Loads (and defines, on first request) a class.
    fn load_class(&self, name: &str) -> Result<Arc<LoadedClass>, ClassLoadError>;

    /// The raw bytes of a class file, without defining it.
    fn class_bytes(&self, name: &str) -> Result<Vec<u8>, ClassLoadError>;
}

/// Relative path of a class file: `org.foo.Bar` -> `org/foo/Bar.class`.
pub fn class_file_path(name: &str) -> PathBuf {
    let mut path: PathBuf = name.split('.').collect();
    path.set_extension("class");
    path
}

fn lock_err<T>(_: T) -> ClassLoadError {
    ClassLoadError::Io(io::Error::other("class cache lock poisoned"))
}

// ── Directory loader ─────────────────────────────────────────────

/// Loads classes from a directory tree of class files.
pub struct DirectoryClassLoader {
    name: String,
    root: PathBuf,
    defined: Mutex<HashMap<String, Arc<LoadedClass>>>,
}

impl DirectoryClassLoader {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        debug!(root = %root.display(), "creating class loader for folder");
        Self {
            name: name.into(),
            root,
            defined: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Locates a resource below the root, e.g. `bar/Foo.txt`.
    pub fn resource(&self, relative: &str) -> Option<PathBuf> {
        let path = self.root.join(relative);
        path.is_file().then_some(path)
    }
}

impl ClassLoader for DirectoryClassLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn load_class(&self, name: &str) -> Result<Arc<LoadedClass>, ClassLoadError> {
        if let Some(class) = self.defined.lock().map_err(lock_err)?.get(name) {
            return Ok(Arc::clone(class));
        }
        let class = Arc::new(LoadedClass {
            name: name.to_string(),
            bytes: self.class_bytes(name)?,
            defining_loader: self.name.clone(),
        });
        trace!(loader = %self.name, class = name, "defined class");
        let mut defined = self.defined.lock().map_err(lock_err)?;
        Ok(Arc::clone(defined.entry(name.to_string()).or_insert(class)))
    }

    fn class_bytes(&self, name: &str) -> Result<Vec<u8>, ClassLoadError> {
        let path = self.root.join(class_file_path(name));
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ClassLoadError::not_found(name)),
            Err(e) => Err(ClassLoadError::Io(e)),
        }
    }
}

// ── Instrumented loader ──────────────────────────────────────────

/// Loader that runs classes through a transformer before defining them.
///
/// Classes under `java.`, classes the transformer leaves unchanged and every
/// class when no transformer is configured are delegated to the parent.
pub struct InstrumentedClassLoader {
    name: String,
    parent: Arc<dyn ClassLoader>,
    transformer: Option<Box<dyn ClassTransformer>>,
    protection_domain: ProtectionDomain,
    defined: Mutex<HashMap<String, Arc<LoadedClass>>>,
}

impl InstrumentedClassLoader {
    pub fn new(parent: Arc<dyn ClassLoader>, transformer: Option<Box<dyn ClassTransformer>>) -> Self {
        Self {
            name: "instrumented".to_string(),
            parent,
            transformer,
            protection_domain: ProtectionDomain::default(),
            defined: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_protection_domain(mut self, protection_domain: ProtectionDomain) -> Self {
        self.protection_domain = protection_domain;
        self
    }

    pub fn parent(&self) -> &Arc<dyn ClassLoader> {
        &self.parent
    }
}

impl ClassLoader for InstrumentedClassLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn load_class(&self, name: &str) -> Result<Arc<LoadedClass>, ClassLoadError> {
        let Some(transformer) = self.transformer.as_deref() else {
            return self.parent.load_class(name);
        };
        if name.starts_with("java.") {
            return self.parent.load_class(name);
        }
        if let Some(class) = self.defined.lock().map_err(lock_err)?.get(name) {
            return Ok(Arc::clone(class));
        }

        let original = self.parent.class_bytes(name)?;
        let transformed = transformer
            .transform(self, name, None, Some(&self.protection_domain), &original)
            .map_err(|e| ClassLoadError::ClassNotFound {
                name: name.to_string(),
                source: Some(e),
            })?;

        let bytes = match transformed {
            Cow::Owned(bytes) if bytes != original => bytes,
            _ => {
                trace!(class = name, "unchanged by transformer, delegating to parent");
                return self.parent.load_class(name);
            }
        };

        debug!(loader = %self.name, class = name, "defined transformed class");
        let class = Arc::new(LoadedClass {
            name: name.to_string(),
            bytes,
            defining_loader: self.name.clone(),
        });
        let mut defined = self.defined.lock().map_err(lock_err)?;
        Ok(Arc::clone(defined.entry(name.to_string()).or_insert(class)))
    }

    fn class_bytes(&self, name: &str) -> Result<Vec<u8>, ClassLoadError> {
        self.parent.class_bytes(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_file_path_from_name() {
        assert_eq!(class_file_path("org.foo.Bar"), PathBuf::from("org/foo/Bar.class"));
        assert_eq!(class_file_path("Top"), PathBuf::from("Top.class"));
    }
}
