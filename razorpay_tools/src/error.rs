use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    ResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    /// The gateway did not answer in time, or the connection failed. The request may be retried; no local state
    /// was mutated.
    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),
}
