//! Error types for function composition over manifolds.
//!
//! Every error of the composition engine is structural: it is detected
//! synchronously at the call that creates the inconsistency (wrapper
//! construction, sum construction, finalization of a problem) and carries
//! the names and sizes needed to locate the offending registration.

use thiserror::Error;
use tracing::error;

/// Errors that can occur while composing or evaluating functions on manifolds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// A function cannot join a sum because its output size differs.
    ///
    /// This error names the offending function and the output size of the
    /// functions already in the sum.
    #[error(
        "function {function} of output size {actual} cannot be added to a sum of functions of output size {expected}"
    )]
    OutputSizeMismatch {
        /// Name of the offending function
        function: String,
        /// Output size of the offending function
        actual: usize,
        /// Output size shared by the sum
        expected: usize,
    },

    /// A local manifold is not part of the global product manifold.
    #[error("manifold {local} is not a factor of manifold {global}")]
    ManifoldNotContained {
        /// Name of the local manifold
        local: String,
        /// Name of the global manifold
        global: String,
    },

    /// A restriction entry covers zero coordinates.
    #[error("restriction on {manifold} starting at {start} has zero length")]
    EmptyRestriction {
        /// Name of the restricted manifold
        manifold: String,
        /// Start offset of the entry
        start: usize,
    },

    /// A restriction entry cannot be applied.
    #[error("invalid restriction on {manifold}: {reason}")]
    InvalidRestriction {
        /// Name of the restricted manifold
        manifold: String,
        /// Description of the problem
        reason: String,
    },

    /// Dimension mismatch between a declaration and the object it describes.
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being checked
        context: String,
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Functions of different numeric representations were combined.
    #[error("function {function} uses a {actual} representation, expected {expected}")]
    RepresentationMismatch {
        /// Name of the offending function
        function: String,
        /// Representation shared by the other functions
        expected: String,
        /// Representation of the offending function
        actual: String,
    },

    /// A function was asked for a derivative it does not provide.
    #[error("function {function} does not provide {capability}")]
    MissingCapability {
        /// Name of the function
        function: String,
        /// Name of the missing capability
        capability: String,
    },

    /// The operation is deliberately not supported by this function.
    #[error("Unsupported operation: {operation} on {function}")]
    Unsupported {
        /// Name of the operation
        operation: String,
        /// Name of the function
        function: String,
    },

    /// Nothing was registered where at least one entry is required.
    #[error("Nothing to build: {reason}")]
    Empty {
        /// What was empty
        reason: String,
    },

    /// Invalid argument passed to an evaluation.
    #[error("Invalid parameter: {reason}")]
    InvalidParameter {
        /// Description of the problem
        reason: String,
    },
}

impl MapError {
    /// Create an OutputSizeMismatch error.
    pub fn output_size_mismatch<S: Into<String>>(function: S, actual: usize, expected: usize) -> Self {
        Self::OutputSizeMismatch {
            function: function.into(),
            actual,
            expected,
        }
    }

    /// Create a ManifoldNotContained error.
    pub fn manifold_not_contained<S1, S2>(local: S1, global: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::ManifoldNotContained {
            local: local.into(),
            global: global.into(),
        }
    }

    /// Create an InvalidRestriction error.
    pub fn invalid_restriction<S1, S2>(manifold: S1, reason: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::InvalidRestriction {
            manifold: manifold.into(),
            reason: reason.into(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<C, S1, S2>(context: C, expected: S1, actual: S2) -> Self
    where
        C: Into<String>,
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            context: context.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a MissingCapability error.
    pub fn missing_capability<S1, S2>(function: S1, capability: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::MissingCapability {
            function: function.into(),
            capability: capability.into(),
        }
    }

    /// Create an Unsupported error.
    pub fn unsupported<S1, S2>(operation: S1, function: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::Unsupported {
            operation: operation.into(),
            function: function.into(),
        }
    }

    /// Create an Empty error.
    pub fn empty<S: Into<String>>(reason: S) -> Self {
        Self::Empty {
            reason: reason.into(),
        }
    }

    /// Create an InvalidParameter error.
    pub fn invalid_parameter<S: Into<String>>(reason: S) -> Self {
        Self::InvalidParameter {
            reason: reason.into(),
        }
    }

    /// Record the error with `tracing::error!` and return it for chaining.
    ///
    /// # Example
    /// ```
    /// use manimap_core::MapError;
    ///
    /// let err = MapError::empty("no functions in sum").log();
    /// assert!(matches!(err, MapError::Empty { .. }));
    /// ```
    #[must_use]
    pub fn log(self) -> Self {
        error!("{}", self);
        self
    }
}

/// Result type alias for operations that can produce MapError.
pub type Result<T> = std::result::Result<T, MapError>;
