use crate::{
    Error,
    error::{StorageError, ValidationError},
};

/// Convert driver errors into [`StorageError::Database`], logging them on the way.
///
/// ```rust,ignore
/// use bastion_core::error::utilities::DatabaseResultExt;
///
/// query.execute(&pool).await.map_db_err("Failed to delete session")?;
/// ```
pub trait DatabaseResultExt<T> {
    fn map_db_err(self, context: &str) -> Result<T, Error>;
}

impl<T, E: std::fmt::Display> DatabaseResultExt<T> for Result<T, E> {
    fn map_db_err(self, context: &str) -> Result<T, Error> {
        self.map_err(|e| {
            tracing::error!(error = %e, "{context}");
            Error::Storage(StorageError::Database(format!("{context}: {e}")))
        })
    }
}

/// Turn a missing builder field into [`ValidationError::MissingField`].
pub trait RequiredFieldExt<T> {
    fn require_field(self, field_name: &str) -> Result<T, ValidationError>;
}

impl<T> RequiredFieldExt<T> for Option<T> {
    fn require_field(self, field_name: &str) -> Result<T, ValidationError> {
        self.ok_or_else(|| ValidationError::MissingField(format!("{field_name} is required")))
    }
}

/// Reject empty string arguments with a `MissingField` error.
pub fn require_non_empty(value: &str, field_name: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::MissingField(format!(
            "{field_name} is required"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_db_err_keeps_context() {
        let result: Result<i32, &str> = Err("database is locked");

        match result.map_db_err("Failed to save account").unwrap_err() {
            Error::Storage(StorageError::Database(msg)) => {
                assert_eq!(msg, "Failed to save account: database is locked");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_required_field() {
        assert_eq!(Some("alice").require_field("Username").unwrap(), "alice");

        let missing: Option<String> = None;
        assert!(matches!(
            missing.require_field("Username"),
            Err(ValidationError::MissingField(msg)) if msg == "Username is required"
        ));
    }

    #[test]
    fn test_require_non_empty() {
        assert!(require_non_empty("x", "Password").is_ok());
        assert!(require_non_empty(" ", "Password").is_ok());
        assert!(matches!(
            require_non_empty("", "Password"),
            Err(ValidationError::MissingField(_))
        ));
    }
}
