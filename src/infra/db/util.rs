use crate::application::repos::RepoError;

/// Classify driver failures by SQLSTATE so callers can tell bad input from
/// an unreachable database.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            // query_canceled, lock_not_available
            Some("57014") | Some("55P03") => RepoError::Timeout,
            // data exceptions (22xxx) and integrity violations (23xxx)
            Some(code) if code.starts_with("22") || code.starts_with("23") => {
                RepoError::InvalidInput {
                    message: db.message().to_string(),
                }
            }
            _ => RepoError::from_persistence(db.message()),
        },
        other => RepoError::from_persistence(other),
    }
}

/// Postgres has no unsigned integers; site and network ids are `BIGINT`.
pub fn to_db_id(id: u64) -> Result<i64, RepoError> {
    i64::try_from(id).map_err(|_| RepoError::InvalidInput {
        message: format!("id {id} exceeds BIGINT range"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_beyond_bigint_are_invalid_input() {
        assert_eq!(to_db_id(42).expect("fits"), 42);
        assert!(matches!(
            to_db_id(u64::MAX),
            Err(RepoError::InvalidInput { .. })
        ));
    }

    #[test]
    fn pool_failures_are_classified() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            RepoError::Timeout
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            RepoError::Persistence(_)
        ));
    }
}
