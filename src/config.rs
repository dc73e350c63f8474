use std::env;

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_int(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Runtime configuration, read from the environment once at startup and
/// injected into the handlers via `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the spreadsheet backend (Apps Script web app).
    ///
    /// `None` when `QUEUE_APPSCRIPT_URL` is unset or empty. The proxy still
    /// starts without it; forwarding requests then answer 500 so the missing
    /// deployment setting is visible to the caller.
    pub upstream_url: Option<String>,

    pub listen_port: u16,

    // Connection pool
    pub max_keepalive: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let upstream_url = env::var("QUEUE_APPSCRIPT_URL")
            .ok()
            .filter(|s| !s.is_empty());

        Config {
            upstream_url,
            listen_port: env_or("LISTEN_PORT", "8000").parse().unwrap_or(8000),
            max_keepalive: env_int("QUEUE_PROXY_MAX_KEEPALIVE", 100),
        }
    }
}
