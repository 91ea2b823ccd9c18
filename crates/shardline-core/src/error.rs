use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Errors raised by a `StatementExecutor` are carried through fan-out
/// unchanged, so callers see exactly what the failing partition returned.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    /// Construct an InternalError without structured detail.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct a routing error with its structured detail attached.
    #[must_use]
    pub fn route(err: RouteError) -> Self {
        let class = match err {
            RouteError::UnroutableStatement { .. } | RouteError::UnsupportedAggregate { .. } => {
                ErrorClass::Unsupported
            }
            RouteError::MetadataInconsistency { .. } | RouteError::ParameterMismatch { .. } => {
                ErrorClass::InvariantViolation
            }
        };

        Self {
            class,
            origin: ErrorOrigin::Route,
            message: err.to_string(),
            detail: Some(ErrorDetail::Route(err)),
        }
    }

    pub(crate) fn unroutable(reason: impl Into<String>) -> Self {
        Self::route(RouteError::UnroutableStatement {
            reason: reason.into(),
        })
    }

    pub(crate) fn unsupported_aggregate(reason: impl Into<String>) -> Self {
        Self::route(RouteError::UnsupportedAggregate {
            reason: reason.into(),
        })
    }

    /// Construct an executor-origin invariant violation.
    pub(crate) fn executor_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Executor,
            message.into(),
        )
    }

    /// Construct an executor-origin internal error.
    pub fn executor_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Executor, message.into())
    }

    /// Construct a plan-origin invariant violation.
    pub(crate) fn plan_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Plan,
            message.into(),
        )
    }

    /// Construct a partition-failure error for one database.
    ///
    /// Intended for `StatementExecutor` implementations.
    pub fn partition_failure(database: &str, message: impl Into<String>) -> Self {
        let message = message.into();

        Self::new(
            ErrorClass::Internal,
            ErrorOrigin::Executor,
            format!("partition '{database}' failed: {message}"),
        )
    }

    /// Borrow the routing detail, if this error came from routing.
    #[must_use]
    pub const fn route_error(&self) -> Option<&RouteError> {
        match &self.detail {
            Some(ErrorDetail::Route(err)) => Some(err),
            None => None,
        }
    }

    #[must_use]
    pub const fn is_unroutable(&self) -> bool {
        matches!(
            self.route_error(),
            Some(RouteError::UnroutableStatement { .. })
        )
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Route(RouteError),
}

///
/// RouteError
///
/// Statement shapes and metadata states the routing core refuses to handle.
/// None of these are retried; the caller decides whether to take a
/// non-sharded path.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum RouteError {
    #[error("statement cannot be routed: {reason}")]
    UnroutableStatement { reason: String },

    #[error("aggregate not supported across partitions: {reason}")]
    UnsupportedAggregate { reason: String },

    #[error("partition field '{field}' of table '{table}' is not a database column")]
    MetadataInconsistency { table: String, field: String },

    #[error("statement binds {expected} parameter value(s) but {found} were supplied")]
    ParameterMismatch { expected: usize, found: usize },
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Internal,
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Internal => "internal",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Route,
    Plan,
    Executor,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Route => "route",
            Self::Plan => "plan",
            Self::Executor => "executor",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
