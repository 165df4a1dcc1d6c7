use thiserror::Error;

pub type Result<T> = std::result::Result<T, TriageError>;

pub const GENERIC_ANALYSIS_FAILURE: &str =
    "Something went wrong during analysis. Please try again.";
pub const GENERIC_LOOKUP_FAILURE: &str = "Could not retrieve information. Please try again.";

/// Failures surfaced by the analysis and lookup boundary.
///
/// None of these are fatal: callers report them inline and return to an
/// idle, resubmittable state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriageError {
    /// Nothing to analyze; raised before any gateway call.
    #[error("No input provided for analysis.")]
    NoInput,

    #[error("Condition name must not be empty.")]
    EmptyCondition,

    /// Transport or model failure, message carried verbatim.
    #[error("{0}")]
    Gateway(String),

    /// Empty text, non-JSON text, or a document that does not match the
    /// requested schema.
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error("Unknown gateway '{0}'.")]
    UnknownGateway(String),

    #[error("Unknown profile '{0}'.")]
    UnknownProfile(String),
}

impl TriageError {
    /// True when the failure was detected locally without contacting the
    /// gateway.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            TriageError::NoInput
                | TriageError::EmptyCondition
                | TriageError::UnknownGateway(_)
                | TriageError::UnknownProfile(_)
        )
    }

    /// Message suitable for an inline error banner.
    pub fn user_message(&self) -> String {
        match self {
            TriageError::InvalidResponse(_) => GENERIC_ANALYSIS_FAILURE.to_string(),
            other => other.to_string(),
        }
    }
}
