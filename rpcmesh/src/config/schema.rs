//! On-disk shape of an `rpcmesh` server configuration file.

use serde::{Deserialize, Serialize};

/// The wire format a server binds its JSON-RPC dispatcher to.
///
/// Only `Json` is wired into `rpcmesh serve` today — `rpcmesh-core`'s
/// `PostResponder` contract dispatches on `Content-Type`, so `Binary`/
/// `UrlForm` are accepted here so a config file can declare intent ahead
/// of a second `PostResponder` being registered for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WireFormat {
    #[default]
    Json,
    Binary,
    UrlForm,
}

/// Top-level server configuration loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address `rpcmesh serve` binds its HTTP listener to, e.g. `127.0.0.1:8080`.
    pub bind: String,

    /// Wire format the JSON-RPC dispatcher is registered under.
    #[serde(default)]
    pub format: WireFormat,

    /// `servicename` reported in the JSON-WSP description document.
    pub servicename: String,

    /// `url` reported in the JSON-WSP description document.
    pub url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            format: WireFormat::default(),
            servicename: "rpcmesh-demo".to_string(),
            url: "http://127.0.0.1:8080/".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_self_consistent() {
        let config = ServerConfig::default();
        assert_eq!(config.format, WireFormat::Json);
        assert!(config.url.starts_with("http://"));
    }

    #[test]
    fn round_trips_through_yaml() {
        let config = ServerConfig::default();
        let text = serde_yaml::to_string(&config).unwrap();
        let restored: ServerConfig = serde_yaml::from_str(&text).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn format_defaults_to_json_when_absent() {
        let text = "bind: 0.0.0.0:9000\nservicename: svc\nurl: http://x/\n";
        let config: ServerConfig = serde_yaml::from_str(text).unwrap();
        assert_eq!(config.format, WireFormat::Json);
    }
}
