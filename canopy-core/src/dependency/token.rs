//! Dependency tokens.
//!
//! A token names a dependency without a global namespace. Its identity is
//! the unique [`TokenId`] handed out at creation; the label is only for
//! diagnostics. The value type is carried at the type level, so a token for
//! `ChangeModel` can never be used to resolve a `ChecksModel`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

/// Type-erased identity of a [`DependencyToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenId(u64);

impl TokenId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// An opaque, unique identifier for a dependency of type `T`.
///
/// Tokens are meant to be defined once and shared, typically next to the
/// type they denote:
///
/// ```rust,ignore
/// static CHANGE_MODEL: LazyLock<DependencyToken<ChangeModel>> =
///     LazyLock::new(|| define("change-model"));
/// ```
///
/// Copies of a token compare equal; two tokens from separate `define`
/// calls never do, whatever their labels.
pub struct DependencyToken<T> {
    id: TokenId,
    label: &'static str,
    _marker: PhantomData<fn() -> T>,
}

/// Create a fresh token. Equivalent to [`DependencyToken::new`].
pub fn define<T>(label: &'static str) -> DependencyToken<T> {
    DependencyToken::new(label)
}

impl<T> DependencyToken<T> {
    /// Create a fresh token with a diagnostic label.
    pub fn new(label: &'static str) -> Self {
        Self {
            id: TokenId::next(),
            label,
            _marker: PhantomData,
        }
    }

    /// Get the token's identity.
    pub fn id(&self) -> TokenId {
        self.id
    }

    /// Get the diagnostic label.
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl<T> Clone for DependencyToken<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DependencyToken<T> {}

impl<T> PartialEq for DependencyToken<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for DependencyToken<T> {}

impl<T> Hash for DependencyToken<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for DependencyToken<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyToken")
            .field("id", &self.id.0)
            .field("label", &self.label)
            .finish()
    }
}

impl<T> fmt::Display for DependencyToken<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label)
    }
}
