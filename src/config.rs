use crate::error::{DetectorError, Result};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
/// Gemini rejects inline image data above roughly this size anyway.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout: Option<Duration>,
    pub bind_addr: SocketAddr,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = var("GEMINI_API_KEY").ok_or(DetectorError::MissingApiKey)?;
        let model = var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_base = var("GEMINI_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let timeout = var("GEMINI_TIMEOUT_SECS")
            .map(|raw| parse_number::<u64>("GEMINI_TIMEOUT_SECS", &raw))
            .transpose()?
            .map(Duration::from_secs);

        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .map_err(|_| DetectorError::Config(format!("BIND_ADDR is not a socket address: {bind_addr}")))?;

        let max_upload_bytes = var("MAX_UPLOAD_BYTES")
            .map(|raw| parse_number::<usize>("MAX_UPLOAD_BYTES", &raw))
            .transpose()?
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Ok(Self {
            api_key,
            model,
            api_base,
            timeout,
            bind_addr,
            max_upload_bytes,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| DetectorError::Config(format!("{key} is not a number: {raw}")))
}
