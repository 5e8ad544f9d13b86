use log::{info, warn};
use std::env;

pub const LOCAL_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REMOTE_BACKEND_URL: &str = "https://andremaciel.pt/IS2026/api";

// Resolved once at startup and handed to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend_base_url: String,
    pub is_online_demo: bool,
}

pub fn is_local_host(hostname: &str) -> bool {
    hostname == "127.0.0.1" || hostname == "localhost" || hostname.ends_with(".local")
}

pub fn resolve(hostname: &str, remote_url: &str) -> AppConfig {
    if is_local_host(hostname) {
        AppConfig {
            backend_base_url: strip_trailing_slashes(LOCAL_BACKEND_URL),
            is_online_demo: false,
        }
    } else {
        AppConfig {
            backend_base_url: strip_trailing_slashes(remote_url),
            is_online_demo: true,
        }
    }
}

pub fn strip_trailing_slashes(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

// Where the client keeps its session record
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub session_id: String,
    pub session_dir: std::path::PathBuf,
    pub resumed: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        // An explicit backend wins over hostname resolution
        if let Ok(url) = env::var("BOOTH_BACKEND_URL") {
            if !url.trim().is_empty() {
                info!("Using backend from BOOTH_BACKEND_URL: {}", url);
                let hostname = env::var("BOOTH_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
                return AppConfig {
                    backend_base_url: strip_trailing_slashes(url.trim()),
                    is_online_demo: !is_local_host(&hostname),
                };
            }
        }

        let hostname = env::var("BOOTH_HOSTNAME").unwrap_or_else(|_| {
            info!("BOOTH_HOSTNAME not set, using default: localhost");
            "localhost".to_string()
        });
        let remote = env::var("BOOTH_REMOTE_BACKEND_URL")
            .unwrap_or_else(|_| DEFAULT_REMOTE_BACKEND_URL.to_string());

        let config = resolve(&hostname, &remote);
        info!(
            "Resolved backend {} for host '{}' (online demo: {})",
            config.backend_base_url, hostname, config.is_online_demo
        );
        config
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let session_dir = env::var("BOOTH_SESSION_DIR")
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("trusty-booth"));

        match env::var("BOOTH_SESSION_ID") {
            Ok(id) if is_valid_session_id(&id) => SessionConfig {
                session_id: id,
                session_dir,
                resumed: true,
            },
            Ok(id) => {
                warn!("Ignoring malformed BOOTH_SESSION_ID '{}', starting a new session", id);
                Self::fresh(session_dir)
            }
            Err(_) => Self::fresh(session_dir),
        }
    }

    fn fresh(session_dir: std::path::PathBuf) -> Self {
        SessionConfig {
            session_id: uuid::Uuid::new_v4().to_string(),
            session_dir,
            resumed: false,
        }
    }
}

// Session ids become file names, so only accept plain identifiers
fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_hosts_use_local_backend() {
        for host in ["127.0.0.1", "localhost", "booth.local"] {
            let config = resolve(host, DEFAULT_REMOTE_BACKEND_URL);
            assert_eq!(config.backend_base_url, LOCAL_BACKEND_URL);
            assert!(!config.is_online_demo, "{} should not be demo mode", host);
        }
    }

    #[test]
    fn remote_hosts_enable_demo_mode() {
        let config = resolve("andremaciel.pt", "https://example.org/api///");
        assert_eq!(config.backend_base_url, "https://example.org/api");
        assert!(config.is_online_demo);
    }

    #[test]
    fn session_ids_must_be_file_safe() {
        assert!(is_valid_session_id("3f6c2a9e-1b7d-4c1e-9a55-0d2f1e3b4c5d"));
        assert!(!is_valid_session_id("../etc/passwd"));
        assert!(!is_valid_session_id(""));
    }
}
