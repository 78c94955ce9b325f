//! Loads a [`ServerConfig`] from a YAML file and validates it.
//!
//! Narrower than a config pipeline that supports includes or generated
//! content: `rpcmesh`'s configuration is just bind address, wire format,
//! and service description metadata, so loading is a single
//! read-parse-validate pass with no directive resolution stage.

use std::path::Path;
use std::sync::Arc;

use super::schema::ServerConfig;
use super::validation::{ValidationIssue, Validator};
use crate::error::{Error, Result};

/// A validation issue downgraded to a warning: currently unused, since
/// every issue the [`Validator`] raises is treated as fatal, but kept so
/// a future non-fatal check (e.g. "bind address is a wildcard interface")
/// has somewhere to report without widening the return type.
pub type LoadWarning = ValidationIssue;

/// The result of a successful [`ConfigLoader::load`] call.
pub struct LoadResult {
    pub config: Arc<ServerConfig>,
    pub warnings: Vec<LoadWarning>,
}

/// Loads and validates server configuration files.
#[derive(Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Reads `path`, parses it as YAML, and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, [`Error::Yaml`]
    /// if it does not parse, and [`Error::Config`] if it parses but fails
    /// validation.
    pub fn load(&self, path: &Path) -> Result<LoadResult> {
        let text = std::fs::read_to_string(path)?;
        let config: ServerConfig = serde_yaml::from_str(&text)?;
        self.load_from_config(config)
    }

    fn load_from_config(&self, config: ServerConfig) -> Result<LoadResult> {
        let result = Validator::new().validate(&config);
        if !result.is_valid() {
            let joined = result
                .errors
                .iter()
                .map(|issue| format!("{}: {}", issue.field, issue.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::Config(joined));
        }

        Ok(LoadResult {
            config: Arc::new(config),
            warnings: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_a_valid_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind: 127.0.0.1:9090\nservicename: demo\nurl: http://127.0.0.1:9090/").unwrap();

        let result = ConfigLoader::new().load(file.path()).unwrap();
        assert_eq!(result.config.bind, "127.0.0.1:9090");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn rejects_a_config_that_fails_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind: garbage\nservicename: demo\nurl: http://x/").unwrap();

        let err = ConfigLoader::new().load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ConfigLoader::new().load(Path::new("/nonexistent/rpcmesh.yaml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
