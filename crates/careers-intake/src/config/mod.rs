use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub google: GoogleConfig,
    pub mail: MailConfig,
    pub intake: IntakeConfig,
    pub keepalive_url: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let google = GoogleConfig {
            client_id: require("CLIENT_ID")?,
            client_secret: require("CLIENT_SECRET")?,
            redirect_uri: require("REDIRECT_URI")?,
            token_json: env::var("TOKEN").ok().filter(|raw| !raw.trim().is_empty()),
            token_file: PathBuf::from(
                env::var("TOKEN_FILE").unwrap_or_else(|_| "token.json".to_string()),
            ),
        };

        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidSmtpPort)?;

        let mail = MailConfig {
            transport: MailTransportKind::from_env(&env::var("MAIL_TRANSPORT").ok())?,
            to: env::var("MAIL_TO").ok().filter(|raw| !raw.trim().is_empty()),
            cc: env::var("MAIL_CC").ok().filter(|raw| !raw.trim().is_empty()),
            from: env::var("MAIL_FROM").ok().filter(|raw| !raw.trim().is_empty()),
            smtp: SmtpConfig {
                host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                port: smtp_port,
                user: env::var("SMTP_USER").ok().filter(|raw| !raw.trim().is_empty()),
                pass: env::var("SMTP_PASS").ok().filter(|raw| !raw.trim().is_empty()),
            },
        };

        let intake = IntakeConfig {
            ack_early: parse_bool("ACK_EARLY", false)?,
        };

        let keepalive_url = env::var("KEEPALIVE_URL")
            .ok()
            .filter(|raw| !raw.trim().is_empty());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            google,
            mail,
            intake,
            keepalive_url,
        })
    }
}

fn require(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingVar(key)),
    }
}

fn parse_bool(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidBool(key)),
        },
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// OAuth client material plus the source of the stored token pair.
///
/// Deployments either inject the token pair through the `TOKEN` environment
/// variable (JSON) or point `TOKEN_FILE` at the file written by the
/// `authorize` command. The env var wins when both are present.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub token_json: Option<String>,
    pub token_file: PathBuf,
}

/// Which transport delivers the HR notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTransportKind {
    Gmail,
    Smtp,
}

impl MailTransportKind {
    fn from_env(raw: &Option<String>) -> Result<Self, ConfigError> {
        match raw.as_deref().map(str::trim) {
            None | Some("") | Some("gmail") => Ok(Self::Gmail),
            Some("smtp") => Ok(Self::Smtp),
            Some(other) => Err(ConfigError::InvalidTransport(other.to_string())),
        }
    }
}

/// Mail routing and transport settings as loaded; validated by [`MailConfig::resolve`].
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub transport: MailTransportKind,
    pub to: Option<String>,
    pub cc: Option<String>,
    pub from: Option<String>,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub pass: Option<String>,
}

/// Fully-resolved mail settings required before the server accepts traffic.
#[derive(Debug, Clone)]
pub struct ResolvedMail {
    pub transport: MailTransportKind,
    pub from: String,
    pub to: String,
    pub cc: Option<String>,
    pub smtp: SmtpConfig,
}

impl MailConfig {
    /// Validate routing for serving. The sender falls back to `SMTP_USER`,
    /// matching how the upstream deployment addressed its messages.
    pub fn resolve(&self) -> Result<ResolvedMail, ConfigError> {
        let to = self
            .to
            .clone()
            .ok_or(ConfigError::MissingVar("MAIL_TO"))?;
        let from = self
            .from
            .clone()
            .or_else(|| self.smtp.user.clone())
            .ok_or(ConfigError::MissingVar("MAIL_FROM"))?;

        if self.transport == MailTransportKind::Smtp {
            if self.smtp.user.is_none() {
                return Err(ConfigError::MissingVar("SMTP_USER"));
            }
            if self.smtp.pass.is_none() {
                return Err(ConfigError::MissingVar("SMTP_PASS"));
            }
        }

        Ok(ResolvedMail {
            transport: self.transport,
            from,
            to,
            cc: self.cc.clone(),
            smtp: self.smtp.clone(),
        })
    }
}

/// Request-handling policy knobs.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Acknowledge the upload before processing finishes. Failures after the
    /// acknowledgment are only visible in server logs.
    pub ack_early: bool,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidPort,
    InvalidSmtpPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidBool(&'static str),
    InvalidTransport(String),
    InvalidSmtpRelay(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVar(key) => write!(f, "{key} must be set"),
            ConfigError::InvalidPort => write!(f, "PORT must be a valid u16"),
            ConfigError::InvalidSmtpPort => write!(f, "SMTP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidBool(key) => write!(f, "{key} must be a boolean flag"),
            ConfigError::InvalidTransport(value) => {
                write!(f, "MAIL_TRANSPORT must be 'gmail' or 'smtp', got '{value}'")
            }
            ConfigError::InvalidSmtpRelay(detail) => {
                write!(f, "SMTP relay rejected during setup: {detail}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "HOST",
            "PORT",
            "APP_LOG_LEVEL",
            "CLIENT_ID",
            "CLIENT_SECRET",
            "REDIRECT_URI",
            "TOKEN",
            "TOKEN_FILE",
            "MAIL_TRANSPORT",
            "MAIL_TO",
            "MAIL_CC",
            "MAIL_FROM",
            "SMTP_HOST",
            "SMTP_PORT",
            "SMTP_USER",
            "SMTP_PASS",
            "ACK_EARLY",
            "KEEPALIVE_URL",
        ] {
            env::remove_var(key);
        }
    }

    fn set_required_credentials() {
        env::set_var("CLIENT_ID", "client-id");
        env::set_var("CLIENT_SECRET", "client-secret");
        env::set_var("REDIRECT_URI", "http://localhost:3000/oauth2callback");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_credentials();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.mail.transport, MailTransportKind::Gmail);
        assert_eq!(config.mail.smtp.host, "smtp.gmail.com");
        assert_eq!(config.mail.smtp.port, 587);
        assert!(!config.intake.ack_early);
        assert!(config.keepalive_url.is_none());
    }

    #[test]
    fn load_fails_without_client_credentials() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let err = AppConfig::load().expect_err("credentials are mandatory");
        assert!(matches!(err, ConfigError::MissingVar("CLIENT_ID")));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_credentials();
        env::set_var("HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn smtp_transport_requires_credentials() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_credentials();
        env::set_var("MAIL_TRANSPORT", "smtp");
        env::set_var("MAIL_TO", "hr@example.com");
        env::set_var("MAIL_FROM", "careers@example.com");
        let config = AppConfig::load().expect("config loads");
        let err = config.mail.resolve().expect_err("smtp credentials required");
        assert!(matches!(err, ConfigError::MissingVar("SMTP_USER")));
    }

    #[test]
    fn resolve_falls_back_to_smtp_user_for_sender() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_credentials();
        env::set_var("MAIL_TO", "hr@example.com");
        env::set_var("SMTP_USER", "careers@example.com");
        let config = AppConfig::load().expect("config loads");
        let resolved = config.mail.resolve().expect("routing resolves");
        assert_eq!(resolved.from, "careers@example.com");
        assert_eq!(resolved.to, "hr@example.com");
        assert!(resolved.cc.is_none());
    }

    #[test]
    fn rejects_unknown_transport() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_credentials();
        env::set_var("MAIL_TRANSPORT", "pigeon");
        let err = AppConfig::load().expect_err("unknown transport rejected");
        assert!(matches!(err, ConfigError::InvalidTransport(_)));
    }
}
