//! The shipped exception handler.
//!
//! Emits through `tracing`: `fatal` as errors, `warning` as warnings.
//! Loader failures are logged and propagated; substitute values are the
//! business of custom handlers.

use crate::attribute::AttributeMap;
use crate::service::ExceptionHandler;

/// Default [`ExceptionHandler`]: log and propagate.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultExceptionHandler;

impl DefaultExceptionHandler {
    /// Creates the handler.
    pub fn new() -> Self {
        Self
    }
}

impl<K, V> ExceptionHandler<K, V> for DefaultExceptionHandler {
    fn fatal(&self, message: &str, cause: Option<&(dyn std::error::Error + 'static)>) {
        match cause {
            Some(cause) => tracing::error!(%cause, "{message}"),
            None => tracing::error!("{message}"),
        }
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn load_failed(
        &self,
        cause: &(dyn std::error::Error + 'static),
        _key: &K,
        _attrs: &AttributeMap,
    ) -> Option<V> {
        tracing::warn!(%cause, "cache loader failed");
        None
    }
}
