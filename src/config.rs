use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory for persisted AC state, relative to the home directory
const PERSIST_DIR: &str = ".config/mattori-home";
const AC_STATE_FILE: &str = "ac_status.json";

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    load_dotenv_from(Path::new(".env"));
}

fn load_dotenv_from(env_path: &Path) {
    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        // Only set if not already set (env vars take precedence)
        if std::env::var(key).is_err() {
            // SAFETY: We're single-threaded at this point (called before any async runtime)
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// Split `.env` content into key/value pairs, skipping blanks and comments.
fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let mut value = value.trim();

            // Remove surrounding quotes if present
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }
            Some((key.trim(), value))
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub atmosphere: AtmosphereConfig,
    pub ac: AcConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtmosphereConfig {
    /// Cadence of readings on every stream session
    pub read_interval_ms: u64,
    /// Readings buffered per session before the sender waits on the client
    pub session_buffer: usize,
    /// How long a session may stay unconfigured before it is rejected
    pub configure_timeout_secs: u64,
    /// Extra attempts for a failed sensor read within the same tick
    pub sensor_retries: u32,
    /// Reference pressure (hPa) for altitude calculation
    pub sea_level_pressure: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcConfig {
    /// Lowest accepted target temperature (°C, inclusive)
    pub min_temperature: u32,
    /// Highest accepted target temperature (°C, inclusive)
    pub max_temperature: u32,
    /// Where the last committed status is saved. `None` keeps state in memory only.
    pub state_path: Option<PathBuf>,
}

impl AtmosphereConfig {
    pub fn read_interval(&self) -> Duration {
        Duration::from_millis(self.read_interval_ms)
    }

    pub fn configure_timeout(&self) -> Duration {
        Duration::from_secs(self.configure_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                listen_addr: SocketAddr::from(([0, 0, 0, 0], 50051)),
            },
            atmosphere: AtmosphereConfig {
                read_interval_ms: 1000,
                session_buffer: 4,
                configure_timeout_secs: 30,
                sensor_retries: 0,
                sea_level_pressure: 1013.25,
            },
            ac: AcConfig {
                min_temperature: 16,
                max_temperature: 30,
                state_path: None,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HOME_LISTEN_ADDR")
            && let Ok(a) = addr.parse()
        {
            config.server.listen_addr = a;
        }

        // Atmosphere streaming
        if let Ok(interval) = std::env::var("ATMOSPHERE_READ_INTERVAL_MS")
            && let Ok(i) = interval.parse::<u64>()
            && i > 0
        {
            config.atmosphere.read_interval_ms = i;
        }
        if let Ok(buffer) = std::env::var("ATMOSPHERE_SESSION_BUFFER")
            && let Ok(b) = buffer.parse::<usize>()
            && b > 0
        {
            config.atmosphere.session_buffer = b;
        }
        if let Ok(timeout) = std::env::var("ATMOSPHERE_CONFIGURE_TIMEOUT_SECS")
            && let Ok(t) = timeout.parse()
        {
            config.atmosphere.configure_timeout_secs = t;
        }
        if let Ok(retries) = std::env::var("ATMOSPHERE_SENSOR_RETRIES")
            && let Ok(r) = retries.parse()
        {
            config.atmosphere.sensor_retries = r;
        }
        if let Ok(pressure) = std::env::var("ATMOSPHERE_SEA_LEVEL_PRESSURE")
            && let Ok(p) = pressure.parse()
        {
            config.atmosphere.sea_level_pressure = p;
        }

        // AC unit
        if let Ok(min) = std::env::var("AC_MIN_TEMPERATURE")
            && let Ok(m) = min.parse()
        {
            config.ac.min_temperature = m;
        }
        if let Ok(max) = std::env::var("AC_MAX_TEMPERATURE")
            && let Ok(m) = max.parse()
        {
            config.ac.max_temperature = m;
        }
        if let Ok(path) = std::env::var("AC_STATE_PATH") {
            config.ac.state_path = Some(PathBuf::from(path));
        } else if std::env::var("AC_PERSIST").is_ok_and(|v| v == "1" || v == "true") {
            config.ac.state_path = Some(default_ac_state_path());
        }

        config
    }
}

/// Default location of the persisted AC status file
pub fn default_ac_state_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PERSIST_DIR)
        .join(AC_STATE_FILE)
}
