//! Configuration management for the portal.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default API base URL (can be overridden at compile time via PORTAL_DEFAULT_API_URL).
pub const DEFAULT_API_URL: &str = match option_env!("PORTAL_DEFAULT_API_URL") {
    Some(url) => url,
    None => "http://localhost:8080/api",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Role name that lands on the admin dashboard.
pub const DEFAULT_ADMIN_ROLE: &str = "ADMIN";

const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 30;

/// Application routes the session layer navigates between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteTable {
    /// Login page.
    pub login: String,
    /// Mandatory credential setup shown on first login.
    pub first_login_setup: String,
    /// Landing page for the admin role.
    pub admin_dashboard: String,
    /// Landing page for every other role.
    pub dashboard: String,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            first_login_setup: "/auth/first-login".to_string(),
            admin_dashboard: "/admin/dashboard".to_string(),
            dashboard: "/dashboard".to_string(),
        }
    }
}

/// Main portal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base URL of the auth API.
    #[serde(default = "default_api_url")]
    pub api_base_url: String,
    /// Role name routed to the admin dashboard.
    #[serde(default = "default_admin_role")]
    pub admin_role_name: String,
    /// Treat the host as a private/incognito context (durable storage is
    /// never chosen).
    #[serde(default)]
    pub private_mode: bool,
    /// Timeout applied to login requests.
    #[serde(default = "default_login_timeout_secs")]
    pub login_timeout_secs: u64,
    /// Route table.
    #[serde(default)]
    pub routes: RouteTable,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_admin_role() -> String {
    DEFAULT_ADMIN_ROLE.to_string()
}

fn default_login_timeout_secs() -> u64 {
    DEFAULT_LOGIN_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_url(),
            admin_role_name: default_admin_role(),
            private_mode: false,
            login_timeout_secs: DEFAULT_LOGIN_TIMEOUT_SECS,
            routes: RouteTable::default(),
        }
    }
}

impl Config {
    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Reject configurations the session layer cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_base_url()?;
        if self.admin_role_name.trim().is_empty() {
            return Err(CoreError::Config("admin_role_name must not be empty".into()));
        }
        let routes = &self.routes;
        for (name, route) in [
            ("login", &routes.login),
            ("first_login_setup", &routes.first_login_setup),
            ("admin_dashboard", &routes.admin_dashboard),
            ("dashboard", &routes.dashboard),
        ] {
            if !route.starts_with('/') {
                return Err(CoreError::Config(format!(
                    "route {} must be an absolute path, got {:?}",
                    name, route
                )));
            }
        }
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `PORTAL_*` overrides from the given lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(level) = lookup("PORTAL_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = lookup("PORTAL_API_URL") {
            self.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(flag) = lookup("PORTAL_PRIVATE_MODE") {
            self.private_mode = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
    }

    /// Get the API base URL as a parsed URL.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.admin_role_name, "ADMIN");
        assert!(!config.private_mode);
        assert_eq!(config.routes.login, "/auth/login");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_from_file_partial() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{ "log_level": "debug", "routes": { "dashboard": "/home" } }"#,
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.routes.dashboard, "/home");
        assert_eq!(config.routes.login, "/auth/login");
        assert_eq!(config.admin_role_name, DEFAULT_ADMIN_ROLE);
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let mut config = Config::default();
        config.admin_role_name = "SUPER_ADMIN".to_string();
        config.routes.admin_dashboard = "/admin".to_string();
        config.save(&paths).unwrap();

        let loaded = Config::load(&paths).unwrap();
        assert_eq!(loaded.admin_role_name, "SUPER_ADMIN");
        assert_eq!(loaded.routes.admin_dashboard, "/admin");
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.routes, RouteTable::default());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PORTAL_LOG_LEVEL", "trace"),
            ("PORTAL_API_URL", "https://hr.example.com/api/"),
            ("PORTAL_PRIVATE_MODE", "TRUE"),
        ]);

        let mut config = Config::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.log_level, "trace");
        assert_eq!(config.api_base_url, "https://hr.example.com/api");
        assert!(config.private_mode);
    }

    #[test]
    fn test_blank_overrides_are_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|_| Some("   ".to_string()));
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(!config.private_mode);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut config = Config::default();
        config.api_base_url = "not a valid url".to_string();
        assert!(config.api_base_url().is_err());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_relative_route_rejected() {
        let mut config = Config::default();
        config.routes.first_login_setup = "first-login".to_string();
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }
}
