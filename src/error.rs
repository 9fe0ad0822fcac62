//! Error types for the polycache library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when store configuration parameters are
//!   invalid (e.g. zero capacity).
//! - [`AttributeError`]: Returned when an attribute value fails its
//!   descriptor's validity predicate.
//! - [`RegistrationError`]: Returned when attribute registration fails
//!   (duplicate registration, or registration after start).
//! - [`StoreError`]: Returned by store operations that cannot proceed
//!   (shutdown, poisoned by a policy contract violation, failed load).

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when store configuration parameters are invalid.
///
/// Produced by [`MemoryStoreBuilder::build`](crate::builder::MemoryStoreBuilder::build)
/// and the capacity setters. Carries a human-readable description of which
/// parameter failed validation.
///
/// # Example
///
/// ```
/// use polycache::builder::MemoryStoreBuilder;
///
/// let err = MemoryStoreBuilder::<u64, String>::new()
///     .max_size(0)
///     .build()
///     .unwrap_err();
/// assert!(err.to_string().contains("max_size"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// AttributeError
// ---------------------------------------------------------------------------

/// Error returned when an attribute value is rejected by its descriptor.
///
/// Produced by [`AttributeMap::try_put`](crate::attribute::AttributeMap::try_put)
/// when the supplied value fails the descriptor's validity predicate. The
/// map is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeError {
    attribute: String,
}

impl AttributeError {
    /// Creates an error for the named attribute.
    #[inline]
    pub fn invalid_value(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }

    /// Returns the name of the attribute that rejected the value.
    #[inline]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value for attribute `{}`", self.attribute)
    }
}

impl std::error::Error for AttributeError {}

// ---------------------------------------------------------------------------
// RegistrationError
// ---------------------------------------------------------------------------

/// Error returned when attribute registration fails.
///
/// A policy may not register the same attribute twice (hard or soft), and
/// no registration is accepted once the store has started and frozen its
/// attribute set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The attribute was already registered by this policy or service.
    Duplicate(String),
    /// Registration was attempted after the attribute set was frozen.
    Frozen(String),
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::Duplicate(name) => {
                write!(f, "attribute `{name}` has already been registered")
            },
            RegistrationError::Frozen(name) => {
                write!(
                    f,
                    "attribute `{name}` cannot be registered after the store has started"
                )
            },
        }
    }
}

impl std::error::Error for RegistrationError {}

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Error returned by store operations that cannot proceed.
#[derive(Debug)]
pub enum StoreError {
    /// The store has been shut down; mutations are rejected.
    Shutdown,
    /// A policy contract violation poisoned the store; it must be rebuilt.
    Poisoned,
    /// A capacity setter received a non-positive limit.
    InvalidCapacity(String),
    /// The loader failed and the exception handler did not substitute a value.
    LoadFailed(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Returns `true` for [`StoreError::Shutdown`].
    #[inline]
    pub fn is_shutdown(&self) -> bool {
        matches!(self, StoreError::Shutdown)
    }

    /// Returns `true` for [`StoreError::Poisoned`].
    #[inline]
    pub fn is_poisoned(&self) -> bool {
        matches!(self, StoreError::Poisoned)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Shutdown => f.write_str("store has been shut down"),
            StoreError::Poisoned => {
                f.write_str("store is poisoned by a policy contract violation")
            },
            StoreError::InvalidCapacity(msg) => f.write_str(msg),
            StoreError::LoadFailed(cause) => write!(f, "value loading failed: {cause}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::LoadFailed(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
