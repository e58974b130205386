//! Common error infrastructure for engine-core.
//!
//! Domain errors live next to the code that raises them ([`LoadError`] in the
//! script and scene loaders, [`ScriptRuntimeError`] in the VM, [`PoolError`]
//! in the object pool). This module provides the classification trait they
//! share so hosts can decide what is fatal and what only gets logged.
//!
//! [`LoadError`]: crate::LoadError
//! [`ScriptRuntimeError`]: crate::script::ScriptRuntimeError
//! [`PoolError`]: crate::object::PoolError

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: the engine keeps running, the failure is logged
/// - **Validation**: invalid input rejected before it reaches the simulation
/// - **Internal**: unexpected state inconsistency, indicates a bug
/// - **Fatal**: the engine cannot start or continue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Recoverable error, e.g. a script fault or a dropped spawn.
    Recoverable,

    /// Validation error, e.g. an unknown stage index requested by the host.
    Validation,

    /// Internal error, e.g. the active list referencing a free slot.
    Internal,

    /// Fatal error, e.g. malformed bytecode at load time.
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error must stop the load or the session.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }
}

/// Common trait for all engine-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait EngineError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Default implementation uses the error type name.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
