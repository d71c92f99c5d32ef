//! Error types for fitplan.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Plan generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Local fast-path cache errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache file {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

/// Failures writing or reading the durable record and its local mirror.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Durable store: {0}")]
    Store(#[from] DatabaseError),

    #[error("Local cache: {0}")]
    Cache(#[from] CacheError),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} has no API key configured")]
    MissingCredential { provider: String },

    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} returned HTTP {status}: {message}")]
    Http {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of a single plan generation attempt.
///
/// All of these are absorbed by the orchestrator, which falls back to
/// completing onboarding without a plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("No API credential configured for the plan generator")]
    MissingCredential,

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Plan does not match the expected schema: {0}")]
    Schema(String),

    #[error("Generation cancelled")]
    Cancelled,
}

impl From<LlmError> for GenerationError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::MissingCredential { .. } => Self::MissingCredential,
            LlmError::RequestFailed { reason, .. } => Self::Network(reason),
            LlmError::Http {
                status, message, ..
            } => Self::Http { status, message },
            LlmError::InvalidResponse { reason, .. } => Self::MalformedResponse(reason),
            LlmError::Json(e) => Self::MalformedResponse(e.to_string()),
        }
    }
}

/// Step-level input validation errors.
///
/// These never abort the wizard; the step simply stays incomplete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a valid date: {reason}")]
    InvalidDate { reason: String },

    #[error("Missing required value: {field}")]
    MissingField { field: &'static str },

    #[error("Onboarding is already generating a plan")]
    WizardClosed,
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
