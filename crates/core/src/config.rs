use anyhow::Context;
use axum::http::HeaderValue;
use std::env;
use std::path::PathBuf;

/// Returns the directory containing the running executable.
/// Falls back to CWD if the exe path cannot be determined.
#[must_use]
pub fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(std::path::Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub activities_path: PathBuf,
    pub config_dir: PathBuf,
    pub event_log_dir: PathBuf,
    pub port: u16,
    pub bind_address: String,
    pub cors_origins: Vec<HeaderValue>,
    pub admin_api_key: Option<String>,
    pub provider_a_key: Option<String>,
    pub provider_o_key: Option<String>,
    pub provider_g_key: Option<String>,
    pub llm_timeout_secs: u64,
    pub db_timeout_secs: u64,
    pub activity_cache_ttl_secs: u64,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            let db_path = exe_dir().join("data").join("mastery.db");
            format!("sqlite:{}", db_path.display())
        });

        let activities_path = env::var("ACTIVITIES_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| exe_dir().join("data").join("activities"));

        let config_dir = env::var("MASTERY_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| exe_dir().join("data").join("config"));

        let event_log_dir = env::var("MASTERY_EVENT_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| exe_dir().join("data").join("logs"));

        let admin_api_key = env::var("ADMIN_API_KEY").ok();
        if let Some(ref key) = admin_api_key {
            if key.len() < 32 {
                tracing::warn!("ADMIN_API_KEY is shorter than recommended minimum (32 chars)");
            }
        }

        let provider_a_key = env::var("A_KEY").ok();
        let provider_o_key = env::var("O_KEY").ok();
        let provider_g_key = env::var("G_KEY").ok();

        if provider_a_key.is_none() && provider_o_key.is_none() && provider_g_key.is_none() {
            tracing::warn!("No LLM provider credentials configured (A_KEY/O_KEY/G_KEY); evaluation calls will fail over immediately");
        }

        let port_str = env::var("PORT").unwrap_or_else(|_| "8081".to_string());
        let port = port_str.parse::<u16>().map_err(|_| {
            anyhow::anyhow!(
                "Invalid PORT value '{}': must be an integer between 1 and 65535",
                port_str
            )
        })?;
        if port == 0 {
            anyhow::bail!("Invalid PORT value '0': must be between 1 and 65535");
        }

        // BIND_ADDRESS: defaults to 127.0.0.1 (loopback only) for safety.
        let bind_address = match env::var("BIND_ADDRESS") {
            Ok(addr) => {
                addr.parse::<std::net::IpAddr>().with_context(|| {
                    format!(
                        "Invalid BIND_ADDRESS '{}': must be a valid IP address (e.g., '127.0.0.1' or '::1')",
                        addr
                    )
                })?;
                addr
            }
            Err(_) => "127.0.0.1".to_string(),
        };

        let cors_origins_str = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://127.0.0.1:5173".to_string());
        let cors_origins: Vec<HeaderValue> = cors_origins_str
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
                    tracing::warn!(
                        "Skipping CORS origin with invalid scheme '{}': must be http:// or https://",
                        trimmed
                    );
                    return None;
                }
                match trimmed.parse::<HeaderValue>() {
                    Ok(v) => Some(v),
                    Err(e) => {
                        tracing::warn!("Skipping invalid CORS origin '{}': {}", trimmed, e);
                        None
                    }
                }
            })
            .collect();

        let llm_timeout_secs = env::var("LLM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .context("Failed to parse LLM_TIMEOUT_SECS")?;
        if llm_timeout_secs == 0 || llm_timeout_secs > 600 {
            anyhow::bail!(
                "LLM_TIMEOUT_SECS must be between 1 and 600 (got {})",
                llm_timeout_secs
            );
        }

        let db_timeout_secs = env::var("DB_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .context("Failed to parse DB_TIMEOUT_SECS")?;

        let activity_cache_ttl_secs = env::var("ACTIVITY_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()
            .context("Failed to parse ACTIVITY_CACHE_TTL_SECS")?;

        Ok(Self {
            database_url,
            activities_path,
            config_dir,
            event_log_dir,
            port,
            bind_address,
            cors_origins,
            admin_api_key,
            provider_a_key,
            provider_o_key,
            provider_g_key,
            llm_timeout_secs,
            db_timeout_secs,
            activity_cache_ttl_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure env var tests run serially (prevents parallel test interference)
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // Guard to ensure env var cleanup even on panic
    struct EnvGuard(&'static str);

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            std::env::remove_var(self.0);
        }
    }

    #[test]
    fn default_port_is_8081() {
        let _lock = ENV_LOCK.lock().unwrap();
        std::env::remove_var("PORT");
        let config = AppConfig::load().unwrap();
        assert_eq!(config.port, 8081);
    }

    #[test]
    fn rejects_zero_port() {
        let _lock = ENV_LOCK.lock().unwrap();
        std::env::set_var("PORT", "0");
        let _guard = EnvGuard("PORT");
        assert!(AppConfig::load().is_err());
    }

    #[test]
    fn rejects_invalid_bind_address() {
        let _lock = ENV_LOCK.lock().unwrap();
        std::env::set_var("BIND_ADDRESS", "not-an-ip");
        let _guard = EnvGuard("BIND_ADDRESS");
        assert!(AppConfig::load().is_err());
    }

    #[test]
    fn reads_provider_keys() {
        let _lock = ENV_LOCK.lock().unwrap();
        std::env::set_var("O_KEY", "sk-test-o");
        let _guard = EnvGuard("O_KEY");
        let config = AppConfig::load().unwrap();
        assert_eq!(config.provider_o_key.as_deref(), Some("sk-test-o"));
    }
}
