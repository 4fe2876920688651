//! Conversions from driver errors into `MigrunError`

use migrun_core::MigrunError;

/// Wrap a rusqlite error raised while touching the version table or
/// running a script
pub fn from_rusqlite(op: &str, err: rusqlite::Error) -> MigrunError {
    MigrunError::Persistence {
        op: op.to_string(),
        message: err.to_string(),
    }
}

/// Wrap a rusqlite error raised by a data-access call
pub fn query_rusqlite(op: &str, err: rusqlite::Error) -> MigrunError {
    MigrunError::Query {
        op: op.to_string(),
        message: err.to_string(),
    }
}

#[cfg(feature = "postgres")]
pub fn from_sqlx(op: &str, err: sqlx::Error) -> MigrunError {
    MigrunError::Persistence {
        op: op.to_string(),
        message: err.to_string(),
    }
}

#[cfg(feature = "postgres")]
pub fn query_sqlx(op: &str, err: sqlx::Error) -> MigrunError {
    MigrunError::Query {
        op: op.to_string(),
        message: err.to_string(),
    }
}

/// Handshake and reachability failures
pub fn connection_error(err: impl std::fmt::Display) -> MigrunError {
    MigrunError::Connection {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rusqlite_keeps_op_and_message() {
        let err = from_rusqlite("read_applied", rusqlite::Error::InvalidQuery);
        match err {
            MigrunError::Persistence { op, message } => {
                assert_eq!(op, "read_applied");
                assert!(!message.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_query_rusqlite_is_query_kind() {
        let err = query_rusqlite("select_all", rusqlite::Error::InvalidQuery);
        assert!(matches!(err, MigrunError::Query { .. }));
    }
}
