//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::{
    error::{AuthError, AuthResult},
    models::{SignInInput, SignUpInput},
};

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if username.len() > 32 {
        return Err("Username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("Username can only contain letters, numbers, and underscores".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password presence and size; strength is the user service's call
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate the client secret a session is bound to
pub fn validate_secret(secret: &str) -> Result<(), String> {
    if secret.is_empty() {
        return Err("Secret is required".to_string());
    }

    if secret.len() > 512 {
        return Err("Secret must be at most 512 characters long".to_string());
    }

    Ok(())
}

fn invalid(result: Result<(), String>) -> AuthResult<()> {
    result.map_err(AuthError::InvalidArgument)
}

/// Validate a sign-up request before any peer is called
pub fn validate_sign_up(input: &SignUpInput) -> AuthResult<()> {
    invalid(validate_username(&input.username))?;
    invalid(validate_email(&input.email))?;
    invalid(validate_password(&input.password))?;
    invalid(validate_secret(&input.secret))
}

/// Validate a sign-in request before any peer is called
pub fn validate_sign_in(input: &SignInInput) -> AuthResult<()> {
    if input.username.is_empty() {
        return Err(AuthError::InvalidArgument("Username is required".to_string()));
    }
    invalid(validate_password(&input.password))?;
    invalid(validate_secret(&input.secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_up() -> SignUpInput {
        SignUpInput {
            username: "user_one".to_string(),
            email: "u1@example.com".to_string(),
            password: "hunter22".to_string(),
            secret: "s3cr3t".to_string(),
            code: 1234,
            ip: "1.2.3.4".to_string(),
        }
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("abc").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
        assert!(validate_username("bad name").is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("u1@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
    }

    #[test]
    fn test_sign_up_accepts_valid_input() {
        assert!(validate_sign_up(&sign_up()).is_ok());
    }

    #[test]
    fn test_sign_up_requires_secret() {
        let input = SignUpInput {
            secret: String::new(),
            ..sign_up()
        };
        assert!(matches!(
            validate_sign_up(&input),
            Err(AuthError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_sign_in_requires_username() {
        let input = SignInInput {
            username: String::new(),
            password: "hunter22".to_string(),
            secret: "s3cr3t".to_string(),
            ip: "1.2.3.4".to_string(),
        };
        assert!(matches!(
            validate_sign_in(&input),
            Err(AuthError::InvalidArgument(_))
        ));
    }
}
