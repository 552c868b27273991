use std::env;
use std::fmt;

use crate::errors::AuthenticationError;

pub const USERNAME_VAR: &str = "SCENEKIT_USERNAME";
pub const PASSWORD_VAR: &str = "SCENEKIT_PASSWORD";

/// Catalog account credentials
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Resolve credentials, letting `SCENEKIT_USERNAME` / `SCENEKIT_PASSWORD` win over configured values
    pub fn resolve(username: Option<&str>, password: Option<&str>) -> Result<Self, AuthenticationError> {
        let username = env::var(USERNAME_VAR).ok().or_else(|| username.map(str::to_string));
        let password = env::var(PASSWORD_VAR).ok().or_else(|| password.map(str::to_string));

        match (username, password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Ok(Credentials::new(u, p)),
            _ => Err(AuthenticationError::MissingCredentials),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_password() {
        let credentials = Credentials::new("alice", "hunter2");
        let shown = format!("{:?}", credentials);
        assert!(shown.contains("alice"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn empty_password_counts_as_missing() {
        if env::var(USERNAME_VAR).is_ok() || env::var(PASSWORD_VAR).is_ok() {
            return;
        }
        assert!(matches!(
            Credentials::resolve(Some("alice"), Some("")),
            Err(AuthenticationError::MissingCredentials)
        ));
        assert!(Credentials::resolve(Some("alice"), Some("secret")).is_ok());
    }
}
