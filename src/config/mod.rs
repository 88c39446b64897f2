//! Configuration management for the perspectiv application.
//!
//! This module handles loading and validating configuration settings from environment
//! variables, with sensible defaults.
//!
//! # Environment Variables
//!
//! - `PERSPECTIV_API_BASE_URL`: Backend origin (defaults to https://b-attic.vercel.app)
//! - `PERSPECTIV_DIR`: Directory holding the local caches and outbox
//!   (defaults to ~/.local/share/perspectiv)
//! - `PERSPECTIV_TOKEN`: Bearer token; when set, authentication is ready
//! - `HOME`: Used for expanding the default data directory path

use crate::api::normalize_base_url;
use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_DATA_SUBDIR, ENV_VAR_API_BASE_URL, ENV_VAR_HOME,
    ENV_VAR_PERSPECTIV_DIR, ENV_VAR_TOKEN, REDACTED_PLACEHOLDER,
};
use crate::errors::{AppError, AppResult};
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Configuration for the perspectiv application.
///
/// # Examples
///
/// Creating a configuration manually:
/// ```
/// use perspectiv::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     api_base_url: "https://example.com".to_string(),
///     data_dir: PathBuf::from("/path/to/data"),
///     token: None,
/// };
/// assert!(!config.has_token());
/// ```
///
/// Loading configuration from environment variables:
/// ```no_run
/// use perspectiv::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
/// println!("Using {}", config.api_base_url);
/// ```
#[derive(Clone)]
pub struct Config {
    /// Backend origin without a trailing slash.
    pub api_base_url: String,

    /// Directory where the caches and outbox are persisted.
    pub data_dir: PathBuf,

    /// Bearer token for the backend, if signed in.
    pub token: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("data_dir", &"[REDACTED_PATH]")
            .field("token", &self.token.as_ref().map(|_| REDACTED_PLACEHOLDER))
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            data_dir: PathBuf::from(""),
            token: None,
        }
    }
}

impl Config {
    /// Whether a token is configured, i.e. authentication is ready.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Loads configuration from environment variables with sensible defaults.
    ///
    /// The data directory path is expanded with `shellexpand` to handle `~` and
    /// environment variable references. A blank token counts as no token.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if path expansion fails or the resulting
    /// configuration does not pass [`Config::validate`].
    pub fn load() -> AppResult<Self> {
        let api_base_url = env::var(ENV_VAR_API_BASE_URL)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|url| normalize_base_url(&url))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let data_dir_str = env::var(ENV_VAR_PERSPECTIV_DIR).unwrap_or_else(|_| {
            let home = env::var(ENV_VAR_HOME).unwrap_or_default();
            format!("{}/{}", home, DEFAULT_DATA_SUBDIR)
        });

        let expanded_path = shellexpand::full(&data_dir_str)
            .map_err(|e| AppError::Config(format!("Failed to expand path: {}", e)))?;

        let token = env::var(ENV_VAR_TOKEN)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let config = Config {
            api_base_url,
            data_dir: PathBuf::from(expanded_path.into_owned()),
            token,
        };
        config.validate()?;

        Ok(config)
    }

    /// Validates that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the base URL is not http(s), or the data
    /// directory is empty or relative.
    ///
    /// # Examples
    ///
    /// ```
    /// use perspectiv::Config;
    /// use std::path::PathBuf;
    ///
    /// let valid = Config {
    ///     api_base_url: "http://localhost:3000".to_string(),
    ///     data_dir: PathBuf::from("/absolute/path"),
    ///     token: None,
    /// };
    /// assert!(valid.validate().is_ok());
    ///
    /// let relative = Config {
    ///     data_dir: PathBuf::from("relative/path"),
    ///     ..valid
    /// };
    /// assert!(relative.validate().is_err());
    /// ```
    pub fn validate(&self) -> AppResult<()> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(AppError::Config(format!(
                "API base URL must start with http:// or https://, got '{}'",
                self.api_base_url
            )));
        }

        if self.data_dir.as_os_str().is_empty() {
            return Err(AppError::Config("Data directory path is empty".to_string()));
        }

        if !self.data_dir.is_absolute() {
            return Err(AppError::Config(
                "Data directory must be an absolute path".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env() {
        env::remove_var(ENV_VAR_API_BASE_URL);
        env::remove_var(ENV_VAR_PERSPECTIV_DIR);
        env::remove_var(ENV_VAR_TOKEN);
    }

    #[test]
    fn test_debug_impl_redacts_sensitive_info() {
        let config = Config {
            api_base_url: "https://example.com".to_string(),
            data_dir: PathBuf::from("/home/username/private/perspectiv"),
            token: Some("secret-token-value".to_string()),
        };

        let debug_output = format!("{:?}", config);

        assert!(debug_output.contains("[REDACTED_PATH]"));
        assert!(debug_output.contains(REDACTED_PLACEHOLDER));
        assert!(!debug_output.contains("secret-token-value"));
        assert!(!debug_output.contains("/home/username/private/perspectiv"));
    }

    #[test]
    #[serial]
    fn test_load_defaults() {
        let original_home = env::var(ENV_VAR_HOME).ok();
        clear_env();
        env::set_var(ENV_VAR_HOME, "/home/tester");

        let config = Config::load().unwrap();

        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(
            config.data_dir,
            PathBuf::from("/home/tester/.local/share/perspectiv")
        );
        assert!(!config.has_token());

        match original_home {
            Some(home) => env::set_var(ENV_VAR_HOME, home),
            None => env::remove_var(ENV_VAR_HOME),
        }
    }

    #[test]
    #[serial]
    fn test_load_from_env_normalizes_values() {
        clear_env();
        env::set_var(ENV_VAR_API_BASE_URL, "  http://localhost:3000/  ");
        env::set_var(ENV_VAR_PERSPECTIV_DIR, "/tmp/perspectiv-config-test");
        env::set_var(ENV_VAR_TOKEN, "  abc123  ");

        let config = Config::load().unwrap();

        assert_eq!(config.api_base_url, "http://localhost:3000");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/perspectiv-config-test"));
        assert_eq!(config.token.as_deref(), Some("abc123"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_blank_token_is_no_token() {
        clear_env();
        env::set_var(ENV_VAR_PERSPECTIV_DIR, "/tmp/perspectiv-config-test");
        env::set_var(ENV_VAR_TOKEN, "   ");

        let config = Config::load().unwrap();
        assert!(!config.has_token());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_rejects_non_http_url() {
        clear_env();
        env::set_var(ENV_VAR_PERSPECTIV_DIR, "/tmp/perspectiv-config-test");
        env::set_var(ENV_VAR_API_BASE_URL, "ftp://example.com");

        let err = Config::load().unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("http")));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_rejects_relative_dir() {
        clear_env();
        env::set_var(ENV_VAR_PERSPECTIV_DIR, "relative/dir");

        let err = Config::load().unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("absolute")));

        clear_env();
    }
}
