use shared_types::AppError;

/// Convert a sqlx::Error into an AppError.
pub fn sqlx_to_app_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::RowNotFound => AppError::not_found("Resource not found"),
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // unique_violation
            Some("23505") => {
                let constraint = db_err.constraint().unwrap_or_default();
                let detail = db_err.message();
                let friendly = if constraint.contains("email") || detail.contains("email") {
                    "An account with this email already exists"
                } else if constraint.contains("numero") || detail.contains("numero") {
                    "This numero is already used"
                } else if constraint.contains("reference") || detail.contains("reference") {
                    "This reference is already used"
                } else if constraint.contains("audience_id") {
                    "This hearing already has a recorded outcome"
                } else {
                    "A record with this value already exists"
                };
                AppError::conflict(friendly)
            }
            // foreign_key_violation
            Some("23503") => AppError::bad_request("Referenced record does not exist"),
            // check_violation
            Some("23514") => AppError::bad_request(format!(
                "Value rejected by constraint {}",
                db_err.constraint().unwrap_or("check")
            )),
            // numeric_value_out_of_range, e.g. a SUM cast back to BIGINT
            Some("22003") => AppError::bad_request("Amount out of range"),
            _ => AppError::database(err.to_string()),
        },
        _ => AppError::database(err.to_string()),
    }
}

/// Extension trait providing `.into_app_error()` on sqlx::Error.
pub trait SqlxErrorExt {
    fn into_app_error(self) -> AppError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_app_error(self) -> AppError {
        sqlx_to_app_error(self)
    }
}

/// Trait for validating request DTOs before processing.
pub trait ValidateRequest {
    fn validate_request(&self) -> Result<(), AppError>;
}

impl<T: validator::Validate> ValidateRequest for T {
    fn validate_request(&self) -> Result<(), AppError> {
        self.validate().map_err(AppError::from)
    }
}

/// Reject a value outside its closed vocabulary with a 400.
pub fn check_vocab(field: &str, value: &str, allowed: &[&str]) -> Result<(), AppError> {
    shared_types::check_vocabulary(field, value, allowed).map_err(AppError::bad_request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::AppErrorKind;

    #[test]
    fn row_not_found_maps_to_404() {
        let err = sqlx_to_app_error(sqlx::Error::RowNotFound);
        assert_eq!(err.kind, AppErrorKind::NotFound);
    }

    #[test]
    fn pool_errors_map_to_database() {
        let err = sqlx_to_app_error(sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind, AppErrorKind::DatabaseError);
        assert_eq!(err.status_code_u16(), 500);
    }

    #[test]
    fn vocab_check_is_bad_request() {
        let err = check_vocab("statut", "ferme", &["ouvert", "cloture"]).unwrap_err();
        assert_eq!(err.kind, AppErrorKind::BadRequest);
        assert!(check_vocab("statut", "ouvert", &["ouvert"]).is_ok());
    }
}
