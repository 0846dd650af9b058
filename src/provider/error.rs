use thiserror::Error;

/// Typed failure from the data-access layer. Handlers map these onto HTTP
/// statuses without looking at driver error text.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DataError {
    /// Classify a message raised from inside a Postgres function (`RAISE EXCEPTION`),
    /// where no more specific SQLSTATE is available.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        let any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if any(&["permission", "rls", "policy"]) {
            DataError::PermissionDenied(message)
        } else if any(&["duplicate key", "unique constraint"]) {
            DataError::Conflict(message)
        } else if any(&["invalid", "bad request", "payload", "column", "type"]) {
            DataError::Validation(message)
        } else {
            DataError::Internal(message)
        }
    }

    /// Classify by Postgres SQLSTATE.
    pub fn from_sqlstate(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "23505" => DataError::Conflict(message),
            "42501" => DataError::PermissionDenied(message),
            "23502" | "23503" | "23514" | "42703" | "42804" => DataError::Validation(message),
            c if c.starts_with("22") => DataError::Validation(message),
            "P0001" => DataError::from_message(message),
            "P0002" => DataError::NotFound(message),
            c if c.starts_with("08") || c == "57P01" || c == "53300" => DataError::Unavailable(message),
            _ => DataError::Internal(message),
        }
    }
}

impl From<crate::filter::FilterError> for DataError {
    fn from(err: crate::filter::FilterError) -> Self {
        DataError::Validation(err.to_string())
    }
}

impl From<crate::database::DatabaseError> for DataError {
    fn from(err: crate::database::DatabaseError) -> Self {
        use crate::database::DatabaseError;
        match err {
            DatabaseError::Sqlx(e) => e.into(),
            other => DataError::Unavailable(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DataError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => match db_err.code() {
                Some(code) => DataError::from_sqlstate(&code, db_err.message()),
                None => DataError::from_message(db_err.message()),
            },
            e @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_)) => {
                DataError::Unavailable(e.to_string())
            }
            other => DataError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_raised_messages() {
        assert!(matches!(
            DataError::from_message("new row violates row-level security policy"),
            DataError::PermissionDenied(_)
        ));
        assert!(matches!(
            DataError::from_message("duplicate key value violates unique constraint \"tc_pkey\""),
            DataError::Conflict(_)
        ));
        assert!(matches!(DataError::from_message("invalid payload"), DataError::Validation(_)));
        assert!(matches!(DataError::from_message("something broke"), DataError::Internal(_)));
    }

    #[test]
    fn classifies_sqlstates() {
        assert!(matches!(DataError::from_sqlstate("23505", "dup"), DataError::Conflict(_)));
        assert!(matches!(DataError::from_sqlstate("42501", "denied"), DataError::PermissionDenied(_)));
        assert!(matches!(DataError::from_sqlstate("22P02", "bad int"), DataError::Validation(_)));
        assert!(matches!(DataError::from_sqlstate("08006", "gone"), DataError::Unavailable(_)));
        assert!(matches!(DataError::from_sqlstate("P0001", "policy says no"), DataError::PermissionDenied(_)));
        assert!(matches!(DataError::from_sqlstate("XX000", "boom"), DataError::Internal(_)));
    }
}
