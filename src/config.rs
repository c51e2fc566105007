use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64,  // seconds
    pub refresh_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    pub ttl_seconds: u64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self { ttl_seconds: 120 }
    }
}

/// SMS gateway. An empty `api_key` disables sending; codes are logged instead.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SmsConfig {
    pub api_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadsConfig {
    pub dir: String,
    pub public_prefix: String,
    pub max_receipt_bytes: usize,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: "uploads".to_string(),
            public_prefix: "/uploads".to_string(),
            max_receipt_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub super_admin_mobile: Option<String>,
    #[serde(default)]
    pub super_admin_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    pub expiry_sweep_interval_secs: u64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            expiry_sweep_interval_secs: 300,
        }
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_toml() -> anyhow::Result<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let mut config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)
                .with_context(|| format!("failed to parse config file {config_path}"))?,
            // no file: build entirely from the environment
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let database_url = get_env("DATABASE_URL").ok_or_else(|| {
                    anyhow!("DATABASE_URL is not set and no config file was found at {config_path}")
                })?;
                Self::from_env_defaults(database_url)
            }
            Err(e) => {
                return Err(anyhow!("cannot read config file {config_path}: {e}"));
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(config_str: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(config_str)?)
    }

    fn from_env_defaults(database_url: String) -> Self {
        Config {
            server: ServerConfig {
                host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: get_env_parse("SERVER_PORT", 8080u16),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
            },
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET").unwrap_or_else(|| "change-me-in-production".to_string()),
                access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                refresh_token_expires_in: get_env_parse("JWT_REFRESH_EXPIRES_IN", 2_592_000i64),
            },
            otp: OtpConfig::default(),
            sms: SmsConfig::default(),
            telegram: TelegramConfig::default(),
            uploads: UploadsConfig::default(),
            bootstrap: BootstrapConfig::default(),
            tasks: TasksConfig::default(),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("JWT_REFRESH_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.refresh_token_expires_in = n;
        }
        if let Ok(v) = env::var("OTP_TTL_SECONDS")
            && let Ok(n) = v.parse()
        {
            self.otp.ttl_seconds = n;
        }
        if let Ok(v) = env::var("SMS_API_URL") {
            self.sms.api_url = v;
        }
        if let Ok(v) = env::var("SMS_API_KEY") {
            self.sms.api_key = v;
        }
        if let Ok(v) = env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(v);
        }
        if let Ok(v) = env::var("UPLOADS_DIR") {
            self.uploads.dir = v;
        }
        if let Ok(v) = env::var("UPLOADS_PUBLIC_PREFIX") {
            self.uploads.public_prefix = v;
        }
        if let Ok(v) = env::var("UPLOADS_MAX_RECEIPT_BYTES")
            && let Ok(n) = v.parse()
        {
            self.uploads.max_receipt_bytes = n;
        }
        if let Ok(v) = env::var("SUPER_ADMIN_MOBILE") {
            self.bootstrap.super_admin_mobile = Some(v);
        }
        if let Ok(v) = env::var("SUPER_ADMIN_PASSWORD") {
            self.bootstrap.super_admin_password = Some(v);
        }
        if let Ok(v) = env::var("EXPIRY_SWEEP_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            self.tasks.expiry_sweep_interval_secs = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config_fills_defaults() {
        let config = Config::parse(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "postgres://localhost/vesta"
            max_connections = 5

            [jwt]
            secret = "s"
            access_token_expires_in = 60
            refresh_token_expires_in = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.otp.ttl_seconds, 120);
        assert_eq!(config.uploads.public_prefix, "/uploads");
        assert_eq!(config.tasks.expiry_sweep_interval_secs, 300);
        assert!(config.telegram.bot_token.is_none());
        assert!(config.bootstrap.super_admin_mobile.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [database]
            url = "postgres://localhost/vesta"
            max_connections = 10

            [jwt]
            secret = "s"
            access_token_expires_in = 60
            refresh_token_expires_in = 120

            [otp]
            ttl_seconds = 300

            [sms]
            api_url = "https://sms.example.com/send"
            api_key = "k"

            [telegram]
            bot_token = "123:abc"

            [uploads]
            dir = "/var/vesta"
            public_prefix = "/static"
            max_receipt_bytes = 1024

            [bootstrap]
            super_admin_mobile = "09120000000"
            super_admin_password = "Admin12345"

            [tasks]
            expiry_sweep_interval_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.otp.ttl_seconds, 300);
        assert_eq!(config.sms.api_key, "k");
        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.uploads.max_receipt_bytes, 1024);
        assert_eq!(
            config.bootstrap.super_admin_mobile.as_deref(),
            Some("09120000000")
        );
        assert_eq!(config.tasks.expiry_sweep_interval_secs, 60);
    }

    #[test]
    fn test_parse_rejects_missing_sections() {
        assert!(Config::parse("[server]\nhost = \"x\"\nport = 1\n").is_err());
    }
}
