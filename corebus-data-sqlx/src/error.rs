/// Errors surfaced by the database gateway.
///
/// Connection acquisition failures and statement failures are kept as
/// distinct variants so callers can tell "couldn't get a connection" (the
/// consumer retries after 2s, per the error handling design) apart from
/// "the statement itself failed" (which usually means the caller's SQL is
/// wrong, not that the database is unreachable).
#[derive(Debug)]
pub enum GatewayError {
    Connection(sqlx::Error),
    Query(sqlx::Error),
}

impl GatewayError {
    pub fn connection(err: sqlx::Error) -> Self {
        GatewayError::Connection(err)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Connection(e) => write!(f, "connection acquisition failed: {e}"),
            GatewayError::Query(e) => write!(f, "query failed: {e}"),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Connection(e) | GatewayError::Query(e) => Some(e),
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        GatewayError::Query(err)
    }
}

/// Fatal initializer failure. Initialization runs once per `connect()`
/// call; any failure here aborts the connect and is propagated to the
/// caller (§ Initializer / Error handling design).
#[derive(Debug)]
pub struct InitError {
    pub phase: &'static str,
    pub source: GatewayError,
}

impl InitError {
    pub fn new(phase: &'static str, source: impl Into<GatewayError>) -> Self {
        Self { phase, source: source.into() }
    }
}

impl std::fmt::Display for InitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "initialization failed in phase '{}': {}", self.phase, self.source)
    }
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Returns true if `err` looks like a Postgres "already exists" condition
/// (SQLSTATE 42710 duplicate_object, 42P07 duplicate_table, 42P06
/// duplicate_schema) or a textual "already exists" raised by an extension
/// helper (pgmq's queue creator raises a plain error rather than a typed
/// SQLSTATE for a duplicate queue).
pub fn is_already_exists(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            if matches!(code.as_ref(), "42710" | "42P07" | "42P06" | "42723") {
                return true;
            }
        }
        let message = db_err.message().to_ascii_lowercase();
        return message.contains("already exists");
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_error_from_sqlx_is_query_variant() {
        let err: GatewayError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, GatewayError::Query(_)));
    }
}
