use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotegateSettings {
    pub application: ApplicationSettings,
    pub cognito: CognitoSettings,
    pub proxy: ProxySettings,
    pub session: SessionSettings,
    pub cookies: CookieSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
}

/// Identity backend (Cognito user pool) configuration.
///
/// Region, client id and pool id are supplied externally; the AWS key pair is
/// only needed for the admin confirm call. `endpoint` overrides the regional
/// endpoint so tests and local stacks can point the client at a fake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitoSettings {
    pub region: String,
    pub client_id: String,
    pub user_pool_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint: Option<String>,
    /// Per-request timeout for identity backend calls, in seconds.
    /// A timeout surfaces to callers as a backend-unavailable failure.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxySettings {
    /// Base URL of the notes-storage API that authenticated requests are
    /// forwarded to.
    pub upstream_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    pub session_duration_hours: u64,
    pub session_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieSettings {
    pub secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: "http://localhost:3000,http://localhost:8080".to_string(),
        }
    }
}

impl Default for CognitoSettings {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            client_id: String::new(),
            user_pool_id: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            endpoint: None,
            request_timeout_secs: 30,
        }
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            upstream_url: "http://localhost:3000".to_string(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            session_duration_hours: 24,
            session_secret: String::new(), // Will be generated if empty
        }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secure: true, // Default to secure cookies
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl NotegateSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read or parsed
    /// - TOML parsing fails
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        // Initialize environment and logging
        Self::initialize_environment();

        // Load base settings from TOML or defaults
        let mut settings = Self::load_base_settings()?;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut settings);

        Ok(settings)
    }

    /// Initialize environment variables and logging. The logger may already
    /// be initialized when called from tests, so init failure is ignored.
    fn initialize_environment() {
        Self::load_env_file();
        let _ = env_logger::try_init();
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `NOTEGATE_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        // 1. Start with default settings
        let mut settings = Self::default();

        // 2. Try to load from Settings.toml in current directory (lower priority)
        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            let toml_content = fs::read_to_string(&default_config_path)?;
            settings = basic_toml::from_str(&toml_content)?;
            log::info!(
                "Loaded base settings from {}",
                default_config_path.display()
            );
        }

        // 3. If NOTEGATE_SECRETS_DIR is set and contains Settings.toml, override with those settings
        if let Ok(secrets_dir) = std::env::var("NOTEGATE_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                let secrets_toml_content = fs::read_to_string(&secrets_path)?;
                let secrets_settings: Self = basic_toml::from_str(&secrets_toml_content)?;

                log::info!("Overriding settings from {}", secrets_path.display());

                settings = secrets_settings;
            } else {
                log::info!(
                    "NOTEGATE_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Apply environment variable overrides to settings
    fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_cognito_env_overrides(&mut settings.cognito);
        Self::apply_proxy_env_overrides(&mut settings.proxy);
        Self::apply_session_env_overrides(&mut settings.session);
        Self::apply_cookie_env_overrides(&mut settings.cookies);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    /// Apply environment overrides for application settings
    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        if let Ok(cors_origins) = std::env::var("CORS_ORIGINS") {
            app_settings.cors_origins = cors_origins;
        }
    }

    /// Apply environment overrides for identity backend settings.
    /// The AWS key pair variable names match the original deployment.
    pub fn apply_cognito_env_overrides(cognito_settings: &mut CognitoSettings) {
        if let Ok(region) = std::env::var("COGNITO_REGION") {
            cognito_settings.region = region;
        }
        if let Ok(client_id) = std::env::var("COGNITO_CLIENT_ID") {
            cognito_settings.client_id = client_id;
        }
        if let Ok(user_pool_id) = std::env::var("COGNITO_USER_POOL_ID") {
            cognito_settings.user_pool_id = user_pool_id;
        }
        if let Ok(access_key_id) = std::env::var("ACCESS_KEY_ID_AWS") {
            cognito_settings.access_key_id = access_key_id;
        }
        if let Ok(secret_access_key) = std::env::var("SECRET_ACCESS_KEY_AWS") {
            cognito_settings.secret_access_key = secret_access_key;
        }
        if let Ok(endpoint) = std::env::var("COGNITO_ENDPOINT") {
            cognito_settings.endpoint = Some(endpoint);
        }
        Self::apply_numeric_env_override(
            "COGNITO_REQUEST_TIMEOUT_SECS",
            &mut cognito_settings.request_timeout_secs,
        );
    }

    /// Apply environment overrides for proxy settings
    fn apply_proxy_env_overrides(proxy_settings: &mut ProxySettings) {
        if let Ok(upstream_url) = std::env::var("UPSTREAM_URL") {
            proxy_settings.upstream_url = upstream_url;
        }
    }

    /// Apply environment overrides for session settings
    pub fn apply_session_env_overrides(session_settings: &mut SessionSettings) {
        Self::apply_numeric_env_override(
            "SESSION_DURATION_HOURS",
            &mut session_settings.session_duration_hours,
        );

        // Handle session secret with special logic
        Self::handle_session_secret_override(session_settings);
    }

    /// Helper function to apply numeric environment variable overrides
    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u64>() {
                *target = value;
            }
        }
    }

    /// Helper function to handle session secret environment override and generation
    fn handle_session_secret_override(session_settings: &mut SessionSettings) {
        let env_secret_set = std::env::var("SESSION_SECRET").is_ok_and(|secret| {
            if secret.is_empty() {
                false
            } else {
                session_settings.session_secret = secret;
                true
            }
        });

        // Generate random session secret if no environment variable was set and current value is empty
        if !env_secret_set && session_settings.session_secret.is_empty() {
            session_settings.session_secret = Self::generate_random_session_secret();
            Self::warn_about_generated_secret();
        }
    }

    /// Generate a cryptographically secure random session secret
    ///
    /// Generates 32 bytes (256 bits) of entropy, enough key material for the
    /// HMAC-SHA256 session signing key.
    fn generate_random_session_secret() -> String {
        use rand::RngCore;
        let mut secret = [0u8; 32];
        rand::rng().fill_bytes(&mut secret);
        general_purpose::STANDARD.encode(secret)
    }

    /// Display warnings about using a generated session secret
    fn warn_about_generated_secret() {
        log::warn!("Using auto-generated session secret");
        log::warn!("Sessions will not survive a restart unless SESSION_SECRET is set");
        log::warn!("For production use, set SESSION_SECRET or session_secret in Settings.toml");
    }

    /// Apply environment overrides for cookie settings
    fn apply_cookie_env_overrides(cookie_settings: &mut CookieSettings) {
        if let Ok(cookie_secure_str) = std::env::var("COOKIE_SECURE") {
            if let Ok(cookie_secure) = cookie_secure_str.parse::<bool>() {
                cookie_settings.secure = cookie_secure;
            }
        }
    }

    /// Apply environment overrides for logging settings
    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Get CORS origins as a vector of strings
    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .collect()
    }
}

impl CognitoSettings {
    /// The identity backend endpoint, honoring the override when present.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        self.endpoint.clone().unwrap_or_else(|| {
            format!("https://cognito-idp.{}.amazonaws.com/", self.region)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // Helper function to clean all relevant environment variables for tests
    fn clean_env_vars() {
        std::env::remove_var("SESSION_SECRET");
        std::env::remove_var("SESSION_DURATION_HOURS");
        std::env::remove_var("COGNITO_REGION");
        std::env::remove_var("COGNITO_CLIENT_ID");
        std::env::remove_var("COGNITO_USER_POOL_ID");
        std::env::remove_var("COGNITO_ENDPOINT");
        std::env::remove_var("ACCESS_KEY_ID_AWS");
        std::env::remove_var("SECRET_ACCESS_KEY_AWS");
        std::env::remove_var("NOTEGATE_SECRETS_DIR");
    }

    #[test]
    fn test_default_settings() {
        let settings = NotegateSettings::default();
        assert_eq!(settings.session.session_secret, "");
        assert_eq!(settings.session.session_duration_hours, 24);
        assert_eq!(settings.cognito.region, "us-east-1");
        assert_eq!(settings.cognito.request_timeout_secs, 30);
        assert!(settings.cognito.endpoint.is_none());
    }

    #[test]
    fn test_endpoint_url_from_region() {
        let mut cognito = CognitoSettings {
            region: "eu-west-2".to_string(),
            ..Default::default()
        };
        assert_eq!(
            cognito.endpoint_url(),
            "https://cognito-idp.eu-west-2.amazonaws.com/"
        );

        cognito.endpoint = Some("http://localhost:9229/".to_string());
        assert_eq!(cognito.endpoint_url(), "http://localhost:9229/");
    }

    #[test]
    #[serial]
    fn test_session_secret_env_override() {
        clean_env_vars();

        let mut session_settings = SessionSettings {
            session_duration_hours: 24,
            session_secret: "default-secret".to_string(),
        };

        std::env::set_var("SESSION_SECRET", "env-override-secret");

        NotegateSettings::apply_session_env_overrides(&mut session_settings);

        assert_eq!(session_settings.session_secret, "env-override-secret");

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_session_duration_env_override() {
        clean_env_vars();

        let mut session_settings = SessionSettings {
            session_duration_hours: 24,
            session_secret: "test-secret".to_string(),
        };

        std::env::set_var("SESSION_DURATION_HOURS", "48");

        NotegateSettings::apply_session_env_overrides(&mut session_settings);

        assert_eq!(session_settings.session_duration_hours, 48);
        assert_eq!(session_settings.session_secret, "test-secret"); // Should remain unchanged

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_session_secret_auto_generation() {
        clean_env_vars();

        let mut session_settings = SessionSettings {
            session_duration_hours: 24,
            session_secret: String::new(), // Empty, should trigger auto-generation
        };

        NotegateSettings::apply_session_env_overrides(&mut session_settings);

        // Should have generated a non-empty secret
        assert!(!session_settings.session_secret.is_empty());
        assert!(session_settings.session_secret.len() > 40); // Base64 encoded 32 bytes should be ~44 chars

        // Generate another one to ensure they're different
        let mut session_settings2 = SessionSettings {
            session_duration_hours: 24,
            session_secret: String::new(),
        };
        NotegateSettings::apply_session_env_overrides(&mut session_settings2);

        assert_ne!(
            session_settings.session_secret,
            session_settings2.session_secret
        );

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_cognito_env_overrides() {
        clean_env_vars();

        let mut cognito_settings = CognitoSettings::default();

        std::env::set_var("COGNITO_REGION", "ap-southeast-2");
        std::env::set_var("COGNITO_CLIENT_ID", "client-from-env");
        std::env::set_var("COGNITO_USER_POOL_ID", "ap-southeast-2_abc123");
        std::env::set_var("ACCESS_KEY_ID_AWS", "AKIAEXAMPLE");
        std::env::set_var("SECRET_ACCESS_KEY_AWS", "secret-key-material");

        NotegateSettings::apply_cognito_env_overrides(&mut cognito_settings);

        assert_eq!(cognito_settings.region, "ap-southeast-2");
        assert_eq!(cognito_settings.client_id, "client-from-env");
        assert_eq!(cognito_settings.user_pool_id, "ap-southeast-2_abc123");
        assert_eq!(cognito_settings.access_key_id, "AKIAEXAMPLE");
        assert_eq!(cognito_settings.secret_access_key, "secret-key-material");
        assert!(cognito_settings.endpoint.is_none());

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_secrets_dir_settings_file() {
        clean_env_vars();

        let dir = tempfile::tempdir().expect("tempdir");
        let settings_path = dir.path().join("Settings.toml");
        std::fs::write(
            &settings_path,
            r#"
[application]
host = "127.0.0.1"
port = 9090
cors_origins = "http://localhost:5173"

[cognito]
region = "us-west-2"
client_id = "file-client-id"
user_pool_id = "us-west-2_file"
access_key_id = ""
secret_access_key = ""
request_timeout_secs = 10

[proxy]
upstream_url = "http://notes.internal:4000"

[session]
session_duration_hours = 12
session_secret = "file-secret"

[cookies]
secure = false

[logging]
level = "debug"
"#,
        )
        .expect("write settings file");

        std::env::set_var("NOTEGATE_SECRETS_DIR", dir.path());

        let settings = NotegateSettings::load_base_settings().expect("load settings");

        assert_eq!(settings.application.port, 9090);
        assert_eq!(settings.cognito.client_id, "file-client-id");
        assert_eq!(settings.cognito.request_timeout_secs, 10);
        assert_eq!(settings.proxy.upstream_url, "http://notes.internal:4000");
        assert_eq!(settings.session.session_secret, "file-secret");
        assert!(!settings.cookies.secure);

        clean_env_vars();
    }

    #[test]
    fn test_get_cors_origins() {
        let settings = NotegateSettings::default();
        let origins = settings.get_cors_origins();
        assert_eq!(
            origins,
            vec!["http://localhost:3000", "http://localhost:8080"]
        );
    }
}
