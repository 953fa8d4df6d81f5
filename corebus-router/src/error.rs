/// Failures from the enhanced-mode router client (§4.7, §6.3).
#[derive(Debug)]
pub enum RouterError {
    /// The request never got a response at all (DNS, connect, timeout).
    Transport(reqwest::Error),
    /// The router responded with a non-2xx status.
    Status { status: u16, body: String },
    /// The response body did not decode into the expected shape.
    Decode(reqwest::Error),
}

impl std::fmt::Display for RouterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterError::Transport(e) => write!(f, "router request failed: {e}"),
            RouterError::Status { status, body } => write!(f, "router returned {status}: {body}"),
            RouterError::Decode(e) => write!(f, "router response decode failed: {e}"),
        }
    }
}

impl std::error::Error for RouterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouterError::Transport(e) | RouterError::Decode(e) => Some(e),
            RouterError::Status { .. } => None,
        }
    }
}

impl From<reqwest::Error> for RouterError {
    fn from(err: reqwest::Error) -> Self {
        RouterError::Transport(err)
    }
}
