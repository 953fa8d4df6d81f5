use corebus_data_sqlx::GatewayError;

/// Failures surfaced by node lifecycle operations.
#[derive(Debug)]
pub enum NodeError {
    /// `node_id` is already registered under a different namespace. The
    /// `(namespace, node_id)` unique constraint exists, but the upsert's
    /// conflict target is `node_id` alone, so the core rejects the
    /// collision in application code before issuing it (§9 open question 2).
    CrossNamespaceCollision { node_id: String, existing_namespace: String },
    Gateway(GatewayError),
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeError::CrossNamespaceCollision { node_id, existing_namespace } => write!(
                f,
                "node id '{node_id}' is already registered under namespace '{existing_namespace}'"
            ),
            NodeError::Gateway(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for NodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NodeError::Gateway(e) => Some(e),
            NodeError::CrossNamespaceCollision { .. } => None,
        }
    }
}

impl From<GatewayError> for NodeError {
    fn from(err: GatewayError) -> Self {
        NodeError::Gateway(err)
    }
}

/// Failures propagated to an `emit()` caller. Per §7, enqueue/router
/// failures propagate; a failed log append after a successful enqueue does
/// not (it is logged and accepted as a gap, see [`crate::emit`]).
#[derive(Debug)]
pub enum EmitError {
    Gateway(GatewayError),
    Router(String),
}

impl std::fmt::Display for EmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmitError::Gateway(e) => write!(f, "{e}"),
            EmitError::Router(msg) => write!(f, "router error: {msg}"),
        }
    }
}

impl std::error::Error for EmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EmitError::Gateway(e) => Some(e),
            EmitError::Router(_) => None,
        }
    }
}

impl From<GatewayError> for EmitError {
    fn from(err: GatewayError) -> Self {
        EmitError::Gateway(err)
    }
}

/// Failure returned by application handler code. Carries enough of a
/// message to populate `DeadLetterPayload.error` (§4.5.3).
#[derive(Debug)]
pub struct HandlerError {
    pub message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for HandlerError {}

impl From<sqlx::Error> for HandlerError {
    fn from(err: sqlx::Error) -> Self {
        HandlerError::new(err.to_string())
    }
}

impl From<GatewayError> for HandlerError {
    fn from(err: GatewayError) -> Self {
        HandlerError::new(err.to_string())
    }
}
