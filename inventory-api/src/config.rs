//! Process configuration read from the environment (and `.env`).

use std::env;
use std::path::PathBuf;

use rocket::fairing::{self, Fairing, Info, Kind};
use rocket::http::uri::Origin;
use rocket::http::{Method, Status};
use rocket::serde::json::{Json, Value, json};
use rocket::{Build, Data, Request, Rocket, get, routes};
use thiserror::Error;
use tracing::warn;

use crate::query::DEFAULT_PAGE_SIZE;

pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SECRET_KEY must be set when DEBUG is false")]
    MissingSecretKey,
    #[error("DATABASE_URL must be set")]
    MissingDatabaseUrl,
    #[error("invalid value {value:?} for {name}")]
    InvalidValue { name: &'static str, value: String },
}

/// Host names accepted in the `Host` header.
///
/// `*` accepts anything. A leading dot (`.example.com`) accepts the domain
/// and all of its subdomains. Other entries match exactly, ignoring case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedHosts(Vec<String>);

impl AllowedHosts {
    pub fn parse(raw: &str) -> Self {
        AllowedHosts(
            raw.split(',')
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        )
    }

    pub fn any() -> Self {
        AllowedHosts(vec!["*".to_string()])
    }

    /// `host` without its port.
    pub fn allows(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.0.iter().any(|pattern| {
            if pattern == "*" {
                true
            } else if let Some(domain) = pattern.strip_prefix('.') {
                host == domain || host.ends_with(pattern.as_str())
            } else {
                host == *pattern
            }
        })
    }
}

impl Default for AllowedHosts {
    fn default() -> Self {
        AllowedHosts::parse("localhost,127.0.0.1")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub secret_key: Option<String>,
    pub debug: bool,
    pub allowed_hosts: AllowedHosts,
    pub database_url: Option<String>,
    pub log_dir: PathBuf,
    pub page_size: i64,
    pub default_username: String,
    pub default_password: String,
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue { name, value: raw.to_string() }),
    }
}

impl AppConfig {
    /// Builds the configuration from a variable lookup. [`AppConfig::from_env`]
    /// passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let debug = match lookup("DEBUG") {
            Some(raw) => parse_bool("DEBUG", &raw)?,
            None => true,
        };
        let secret_key = lookup("SECRET_KEY").filter(|k| !k.is_empty());
        if !debug && secret_key.is_none() {
            return Err(ConfigError::MissingSecretKey);
        }
        let page_size = match lookup("PAGE_SIZE") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(size) if size > 0 => size,
                _ => return Err(ConfigError::InvalidValue { name: "PAGE_SIZE", value: raw }),
            },
            None => DEFAULT_PAGE_SIZE,
        };

        Ok(AppConfig {
            secret_key,
            debug,
            allowed_hosts: lookup("ALLOWED_HOSTS")
                .map(|raw| AllowedHosts::parse(&raw))
                .unwrap_or_default(),
            database_url: lookup("DATABASE_URL").filter(|u| !u.is_empty()),
            log_dir: lookup("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            page_size,
            default_username: lookup("INVENTORY_DEFAULT_USERNAME")
                .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string()),
            default_password: lookup("INVENTORY_DEFAULT_PASSWORD")
                .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string()),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url.as_deref().ok_or(ConfigError::MissingDatabaseUrl)
    }

    pub fn for_tests() -> Self {
        AppConfig {
            secret_key: None,
            debug: true,
            allowed_hosts: AllowedHosts::any(),
            database_url: None,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            page_size: DEFAULT_PAGE_SIZE,
            default_username: DEFAULT_ADMIN_USERNAME.to_string(),
            default_password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

const DISALLOWED_HOST_PATH: &str = "/__disallowed_host";

/// `host[:port]` without the port. Bracketed IPv6 literals keep their brackets.
fn strip_port(raw: &str) -> &str {
    let raw = raw.trim();
    if raw.starts_with('[') {
        return raw.find(']').map_or(raw, |end| &raw[..=end]);
    }
    match raw.split_once(':') {
        Some((host, port)) if !port.contains(':') => host,
        _ => raw,
    }
}

/// The requested host name. Falls back to the raw header when Rocket has not
/// parsed one, as with requests built by the local client.
fn request_host(req: &Request<'_>) -> Option<String> {
    if let Some(host) = req.host() {
        return Some(host.domain().as_str().to_string());
    }
    req.headers()
        .get_one("Host")
        .map(strip_port)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}

#[get("/__disallowed_host")]
fn disallowed_host() -> (Status, Json<Value>) {
    (Status::BadRequest, Json(json!({"error": "Invalid HTTP_HOST header", "status": 400})))
}

/// Sends requests whose `Host` is not allowed to a fixed 400 route.
/// Requests without a `Host` header pass.
pub struct HostCheck {
    hosts: AllowedHosts,
}

impl HostCheck {
    pub fn new(hosts: AllowedHosts) -> Self {
        HostCheck { hosts }
    }
}

#[rocket::async_trait]
impl Fairing for HostCheck {
    fn info(&self) -> Info {
        Info { name: "Allowed Hosts", kind: Kind::Ignite | Kind::Request }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> fairing::Result {
        Ok(rocket.mount("/", routes![disallowed_host]))
    }

    async fn on_request(&self, req: &mut Request<'_>, _: &mut Data<'_>) {
        let Some(host) = request_host(req) else {
            return;
        };
        if self.hosts.allows(&host) {
            return;
        }
        warn!(
            target: "inventory_api::security",
            "Rejected request for disallowed host {} - Path: {}, IP: {}",
            host,
            req.uri().path(),
            req.client_ip().map(|ip| ip.to_string()).unwrap_or_else(|| "unknown".into())
        );
        if let Ok(target) = Origin::parse(DISALLOWED_HOST_PATH) {
            req.set_method(Method::Get);
            req.set_uri(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.debug);
        assert_eq!(config.page_size, 20);
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.default_username, "admin");
        assert!(config.allowed_hosts.allows("localhost"));
        assert!(!config.allowed_hosts.allows("example.com"));
        assert_eq!(config.database_url(), Err(ConfigError::MissingDatabaseUrl));
    }

    #[test]
    fn production_needs_a_secret() {
        assert_eq!(
            AppConfig::from_lookup(lookup(&[("DEBUG", "false")])),
            Err(ConfigError::MissingSecretKey)
        );
        let production = lookup(&[("DEBUG", "False"), ("SECRET_KEY", "s3cret")]);
        let config = AppConfig::from_lookup(production).unwrap();
        assert!(!config.debug);
        assert!(AppConfig::from_lookup(lookup(&[("PAGE_SIZE", "lots")])).is_err());
    }

    #[test]
    fn host_patterns() {
        let hosts = AllowedHosts::parse(" .example.com, api.local ");
        assert!(hosts.allows("example.com"));
        assert!(hosts.allows("inv.example.com"));
        assert!(!hosts.allows("badexample.com"));
        assert!(hosts.allows("API.local"));
        assert!(!hosts.allows("other.local"));
        assert!(AllowedHosts::any().allows("anything.at.all"));
    }

    #[test]
    fn ports_are_ignored_in_host_headers() {
        assert_eq!(strip_port("inventory.example.com:8000"), "inventory.example.com");
        assert_eq!(strip_port("evil.com"), "evil.com");
        assert_eq!(strip_port("[::1]:8000"), "[::1]");
        assert_eq!(strip_port("::1"), "::1");
    }
}
