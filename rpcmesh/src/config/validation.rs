//! Semantic validation of a fully deserialized [`super::ServerConfig`].

use super::schema::ServerConfig;

/// One validation failure, with the field it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub message: String,
}

/// The outcome of validating a [`ServerConfig`]: every issue found, not
/// just the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
}

impl ValidationResult {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates a [`ServerConfig`], collecting every issue rather than
/// stopping at the first.
#[derive(Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn add_error(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            field,
            message: message.into(),
        });
    }

    #[must_use]
    pub fn validate(mut self, config: &ServerConfig) -> ValidationResult {
        if config.bind.parse::<std::net::SocketAddr>().is_err() {
            self.add_error("bind", format!("'{}' is not a valid host:port address", config.bind));
        }
        if config.servicename.trim().is_empty() {
            self.add_error("servicename", "must not be empty");
        }
        if config.url.trim().is_empty() {
            self.add_error("url", "must not be empty");
        } else if !(config.url.starts_with("http://") || config.url.starts_with("https://")) {
            self.add_error("url", format!("'{}' must start with http:// or https://", config.url));
        }

        ValidationResult { errors: self.errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let result = Validator::new().validate(&ServerConfig::default());
        assert!(result.is_valid());
    }

    #[test]
    fn rejects_unparseable_bind_address() {
        let mut config = ServerConfig::default();
        config.bind = "not-an-address".to_string();
        let result = Validator::new().validate(&config);
        assert!(!result.is_valid());
        assert_eq!(result.errors[0].field, "bind");
    }

    #[test]
    fn rejects_empty_servicename_and_bad_url() {
        let mut config = ServerConfig::default();
        config.servicename = "   ".to_string();
        config.url = "ftp://x/".to_string();
        let result = Validator::new().validate(&config);
        assert_eq!(result.errors.len(), 2);
    }
}
