// src/config.rs

use std::env;
use std::net::{IpAddr, SocketAddr};

use dotenvy::dotenv;

/// Fraction of a subject's max score a student needs to pass it,
/// unless the subject sets its own pass marks.
pub const DEFAULT_PASS_MARK_RATIO: f64 = 0.25;

/// Origins allowed by CORS when `CORS_ORIGINS` is not set.
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub rust_log: String,
    pub log_dir: String,
    pub cors_origins: Vec<String>,
    pub pass_mark_ratio: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 3000,
            rust_log: "info".to_string(),
            log_dir: "logs".to_string(),
            cors_origins: split_origins(DEFAULT_CORS_ORIGINS),
            pass_mark_ratio: DEFAULT_PASS_MARK_RATIO,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv().ok();

        let defaults = Self::default();

        let host = match env::var("HOST") {
            Ok(raw) => raw
                .parse::<IpAddr>()
                .map_err(|e| format!("HOST must be an IP address: {}", e))?,
            Err(_) => defaults.host,
        };

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|e| format!("PORT must be a port number: {}", e))?,
            Err(_) => defaults.port,
        };

        let rust_log = env::var("RUST_LOG").unwrap_or(defaults.rust_log);

        let log_dir = env::var("LOG_DIR").unwrap_or(defaults.log_dir);

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| split_origins(&raw))
            .unwrap_or(defaults.cors_origins);

        let pass_mark_ratio = match env::var("PASS_MARK_RATIO") {
            Ok(raw) => parse_ratio(&raw)?,
            Err(_) => defaults.pass_mark_ratio,
        };

        Ok(Self {
            host,
            port,
            rust_log,
            log_dir,
            cors_origins,
            pass_mark_ratio,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_ratio(raw: &str) -> Result<f64, String> {
    let ratio = raw
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("PASS_MARK_RATIO must be a number: {}", e))?;
    if !(0.0..=1.0).contains(&ratio) {
        return Err(format!("PASS_MARK_RATIO must be between 0 and 1, got {}", ratio));
    }
    Ok(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_empty_entries_dropped() {
        let origins = split_origins(" http://a.test , ,http://b.test");
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn ratio_outside_unit_interval_is_rejected() {
        assert!(parse_ratio("1.5").is_err());
        assert!(parse_ratio("-0.1").is_err());
        assert!(parse_ratio("abc").is_err());
        assert_eq!(parse_ratio("0.4").unwrap(), 0.4);
    }
}
