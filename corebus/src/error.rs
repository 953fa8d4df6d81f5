use corebus_data_sqlx::{GatewayError, InitError};
use corebus_router::RouterError;

/// Failures from `CoreSystem::connect`. Anything here aborts the connect
/// and is propagated to the caller — per §7, initialization failure is
/// always fatal.
#[derive(Debug)]
pub enum ConnectError {
    Gateway(GatewayError),
    Init(InitError),
    /// Enhanced mode was selected (`enable_workers`, or `auto_detect_workers`
    /// plus a live health check) but `register_worker` failed — a
    /// non-2xx response there is fatal per §6.3, since the core is
    /// committing to enhanced mode and cannot silently fall back
    /// mid-connect.
    RouterRegistration(RouterError),
}

impl std::fmt::Display for ConnectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectError::Gateway(e) => write!(f, "{e}"),
            ConnectError::Init(e) => write!(f, "{e}"),
            ConnectError::RouterRegistration(e) => write!(f, "worker registration failed: {e}"),
        }
    }
}

impl std::error::Error for ConnectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectError::Gateway(e) => Some(e),
            ConnectError::Init(e) => Some(e),
            ConnectError::RouterRegistration(e) => Some(e),
        }
    }
}

impl From<GatewayError> for ConnectError {
    fn from(err: GatewayError) -> Self {
        ConnectError::Gateway(err)
    }
}

impl From<InitError> for ConnectError {
    fn from(err: InitError) -> Self {
        ConnectError::Init(err)
    }
}
