use thiserror::Error;

/// JSON-RPC internal error code, used for client side failures.
pub const INTERNAL_ERROR: i64 = -32603;
/// JSON-RPC parse error code.
pub const PARSE_ERROR: i64 = -32700;

/// Errors raised while talking to the contract RPC endpoint.
#[derive(Error, Debug)]
pub enum RpcError {
    /// The HTTP client could not be built or the request failed in transit.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body is not a valid JSON-RPC response.
    #[error("invalid response: {0}")]
    Parse(String),

    /// The node returned a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Remote { code: i64, message: String },

    /// The response had neither `result` nor `error`.
    #[error("no result returned for {method}")]
    MissingResult { method: String },

    /// Basic auth credentials could not be encoded as a header.
    #[error("invalid credentials: {0}")]
    Credentials(String),
}

impl RpcError {
    /// The JSON-RPC error code this error maps to.
    pub fn code(&self) -> i64 {
        match self {
            Self::Remote { code, .. } => *code,
            Self::Parse(_) => PARSE_ERROR,
            _ => INTERNAL_ERROR,
        }
    }
}

/// Result type for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;
