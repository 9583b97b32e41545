use serde::{Deserialize, Serialize};
use std::cell::RefCell;

/// Raw storage state of a lazy property.
///
/// `Unfetched` marks a value that has not been read from storage yet. It is
/// a first-class state, matched exhaustively, never compared by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LazyValue<T> {
    Unfetched,
    Loaded(T),
}

impl<T> LazyValue<T> {
    /// Returns true if the value has been materialized.
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Returns a reference to the loaded value, if any.
    pub const fn as_loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::Unfetched => None,
        }
    }

    /// Consumes the state, returning the loaded value if any.
    pub fn into_loaded(self) -> Option<T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::Unfetched => None,
        }
    }

    pub const fn as_ref(&self) -> LazyValue<&T> {
        match self {
            Self::Loaded(value) => LazyValue::Loaded(value),
            Self::Unfetched => LazyValue::Unfetched,
        }
    }

    /// Maps the loaded value, leaving `Unfetched` untouched.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> LazyValue<U> {
        match self {
            Self::Loaded(value) => LazyValue::Loaded(f(value)),
            Self::Unfetched => LazyValue::Unfetched,
        }
    }

    /// Maps the loaded value with a fallible conversion.
    pub fn try_map<U, E, F: FnOnce(T) -> Result<U, E>>(self, f: F) -> Result<LazyValue<U>, E> {
        match self {
            Self::Loaded(value) => f(value).map(LazyValue::Loaded),
            Self::Unfetched => Ok(LazyValue::Unfetched),
        }
    }
}

impl<T> Default for LazyValue<T> {
    fn default() -> Self {
        Self::Unfetched
    }
}

impl<T> From<T> for LazyValue<T> {
    fn from(value: T) -> Self {
        Self::Loaded(value)
    }
}

/// Storage cell for a lazy property on an entity.
///
/// The cell is single-threaded (`RefCell`), matching the session model: an
/// entity and everything attached to it are used by one thread at a time.
/// Interior mutability lets a persister inject fetched values while the
/// entity is only shared-borrowed by the accessor that triggered the fetch.
/// A borrow is never held across a call out of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LazyField<T> {
    cell: RefCell<LazyValue<T>>,
}

impl<T> LazyField<T> {
    /// Creates a field that has not been fetched.
    pub const fn unfetched() -> Self {
        Self {
            cell: RefCell::new(LazyValue::Unfetched),
        }
    }

    /// Creates a field holding a materialized value.
    pub const fn loaded(value: T) -> Self {
        Self {
            cell: RefCell::new(LazyValue::Loaded(value)),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.borrow().is_loaded()
    }

    /// Replaces the raw state, returning the previous one.
    pub fn replace(&self, value: LazyValue<T>) -> LazyValue<T> {
        self.cell.replace(value)
    }

    /// Stores a materialized value.
    pub fn set(&self, value: T) {
        self.cell.replace(LazyValue::Loaded(value));
    }

    /// Applies `f` to the raw state without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&LazyValue<T>) -> R) -> R {
        f(&self.cell.borrow())
    }

    pub fn into_inner(self) -> LazyValue<T> {
        self.cell.into_inner()
    }
}

impl<T: Clone> LazyField<T> {
    /// Returns a copy of the raw state.
    pub fn get(&self) -> LazyValue<T> {
        self.cell.borrow().clone()
    }
}

impl<T> Default for LazyField<T> {
    fn default() -> Self {
        Self::unfetched()
    }
}

impl<T> From<LazyValue<T>> for LazyField<T> {
    fn from(value: LazyValue<T>) -> Self {
        Self {
            cell: RefCell::new(value),
        }
    }
}
