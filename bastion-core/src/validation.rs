//! Field-level validation for account parameters
//!
//! The account guard assumes its input has been through these checks; the
//! facade runs them before handing requests to it.
use crate::{account::NewAccount, error::ValidationError};
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("Invalid email regex pattern")
});

static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("Invalid username regex pattern"));

/// Validates an email address
///
/// ```rust
/// use bastion_core::validation::validate_email;
///
/// assert!(validate_email("user@example.com").is_ok());
/// assert!(validate_email("invalid-email").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(ValidationError::MissingField(
            "Email is required".to_string(),
        ));
    }

    if email.len() > 127 {
        return Err(ValidationError::InvalidEmail(
            "Email is too long".to_string(),
        ));
    }

    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(format!(
            "Invalid email format: {email}"
        )))
    }
}

/// Validates a username
///
/// Usernames are 1 to 50 characters of letters, digits, `_`, `.` or `-`.
/// An `@` is rejected so that a login identifier is never ambiguous between
/// a username and an email address.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::MissingField(
            "Username is required".to_string(),
        ));
    }

    if username.len() > 50 {
        return Err(ValidationError::InvalidUsername(
            "Username must be no more than 50 characters long".to_string(),
        ));
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(ValidationError::InvalidUsername(format!(
            "Username contains unsupported characters: {username}"
        )));
    }

    Ok(())
}

/// Validates a password
///
/// Passwords must not be blank and must be at most 100 characters.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::MissingField(
            "Password is required".to_string(),
        ));
    }

    if password.trim().is_empty() {
        return Err(ValidationError::InvalidPassword(
            "Password cannot be only whitespace".to_string(),
        ));
    }

    if password.len() > 100 {
        return Err(ValidationError::InvalidPassword(
            "Password must be no more than 100 characters long".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_nickname(nickname: Option<&str>) -> Result<(), ValidationError> {
    if let Some(nickname) = nickname {
        if nickname.trim().is_empty() {
            return Err(ValidationError::InvalidNickname(
                "Nickname cannot be empty or whitespace only".to_string(),
            ));
        }

        if nickname.len() > 255 {
            return Err(ValidationError::InvalidNickname(
                "Nickname must be no more than 255 characters long".to_string(),
            ));
        }
    }

    Ok(())
}

/// Runs every field check for an account creation request.
pub fn validate_new_account(account: &NewAccount) -> Result<(), ValidationError> {
    validate_username(&account.username)?;
    validate_email(&account.email)?;
    validate_nickname(account.nickname.as_deref())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.org").is_ok());

        assert!(matches!(
            validate_email(""),
            Err(ValidationError::MissingField(_))
        ));
        assert!(matches!(
            validate_email("invalid"),
            Err(ValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            validate_email("user@"),
            Err(ValidationError::InvalidEmail(_))
        ));

        let long_email = format!("{}@example.com", "a".repeat(120));
        assert!(matches!(
            validate_email(&long_email),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("alice_b.c-d").is_ok());

        assert!(matches!(
            validate_username("   "),
            Err(ValidationError::MissingField(_))
        ));
        assert!(matches!(
            validate_username("alice@example.com"),
            Err(ValidationError::InvalidUsername(_))
        ));
        assert!(matches!(
            validate_username(&"a".repeat(51)),
            Err(ValidationError::InvalidUsername(_))
        ));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("s3cr3t!").is_ok());

        assert!(matches!(
            validate_password(""),
            Err(ValidationError::MissingField(_))
        ));
        assert!(matches!(
            validate_password("    "),
            Err(ValidationError::InvalidPassword(_))
        ));
        assert!(matches!(
            validate_password(&"a".repeat(101)),
            Err(ValidationError::InvalidPassword(_))
        ));
    }

    #[test]
    fn test_validate_nickname() {
        assert!(validate_nickname(None).is_ok());
        assert!(validate_nickname(Some("Alice")).is_ok());
        assert!(validate_nickname(Some(" ")).is_err());
    }

    #[test]
    fn test_validate_new_account() {
        let ok = NewAccount::builder()
            .username("alice")
            .email("alice@example.com")
            .build()
            .unwrap();
        assert!(validate_new_account(&ok).is_ok());

        let bad = NewAccount::builder()
            .username("alice")
            .email("nope")
            .build()
            .unwrap();
        assert!(matches!(
            validate_new_account(&bad),
            Err(ValidationError::InvalidEmail(_))
        ));
    }
}
