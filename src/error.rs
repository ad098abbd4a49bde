//! Custom error types for the bridge.
//!
//! This module defines the primary error type, `BridgeError`, for the whole
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to classify the failures the core can produce.
//!
//! ## Error taxonomy
//!
//! - **`Config`**: wraps errors from the `config` crate, typically file
//!   parsing or format issues in the configuration files.
//! - **`PropertyNotFound`**: a property name was looked up that the console
//!   kind's schema does not declare.
//! - **`PropertyTypeMismatch`**: the property bridge detected an incompatible
//!   external-value tag versus the declared property kind. Raised for both
//!   direction errors (e.g. an integer written into a text property) and for
//!   enumerated symbols that do not resolve in the symbol table.
//! - **`ThreadAlreadyBound`**: console creation attempted for a thread that
//!   already owns a console; at most one console is bound to a thread.
//! - **`Dispatch`**: the GUI event loop is gone (or a same-thread sync
//!   dispatch was refused), surfaced from [`crate::dispatch::DispatchError`].
//!
//! Resolution failures ("no console bound to this thread") are *not*
//! errors: they are reported as `None`/`false` by the registry and the
//! session operations, never through this enum.

use thiserror::Error;

use crate::dispatch::DispatchError;

/// Convenience alias for results using the crate error type.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

/// Errors raised by the console bridge core.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Configuration loading or parsing failed.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The property name is not declared in the console schema.
    #[error("property not found: {0}")]
    PropertyNotFound(String),

    /// External value tag is incompatible with the declared property kind.
    #[error("property type mismatch for '{property}': {detail}")]
    PropertyTypeMismatch {
        /// Property that was being accessed.
        property: String,
        /// What was incompatible, for the caller's diagnostics.
        detail: String,
    },

    /// The calling thread already owns a console.
    #[error("thread already owns a console")]
    ThreadAlreadyBound,

    /// The dispatcher could not complete a request.
    #[error("dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_is_distinguishable_from_not_found() {
        let mismatch = BridgeError::PropertyTypeMismatch {
            property: "lineWrapMode".into(),
            detail: "float value into enumerated property".into(),
        };
        assert!(matches!(
            mismatch,
            BridgeError::PropertyTypeMismatch { .. }
        ));
        assert!(mismatch.to_string().contains("lineWrapMode"));

        let missing = BridgeError::PropertyNotFound("noSuchProp".into());
        assert!(matches!(missing, BridgeError::PropertyNotFound(_)));
    }

    #[test]
    fn dispatch_error_converts_via_from() {
        let err: BridgeError = DispatchError::Closed.into();
        assert!(matches!(err, BridgeError::Dispatch(DispatchError::Closed)));
    }
}
