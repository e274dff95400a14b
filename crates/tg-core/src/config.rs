//! Engine configuration DTO.
//!
//! Maps a TOML document onto [`TourConfig`]. Missing keys take the defaults
//! from [`TourConfig::default`]; the values themselves are not validated here.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct TourConfig {
    /// Wait after a navigation before resolving targets.
    pub settle_delay: Duration,
    pub resolve_timeout: Duration,
    pub poll_interval: Duration,

    pub overlay_width: f64,
    pub overlay_height: f64,
    /// Distance between target and overlay.
    pub overlay_gap: f64,

    pub remote_max_attempts: u32,
    pub remote_base_backoff: Duration,
    pub remote_max_backoff: Duration,

    pub recorder_max_attempts: u32,
    pub recorder_backoff: Duration,
    pub recorder_queue_capacity: usize,

    /// Directory of the local state cache.
    pub state_dir: PathBuf,
    /// Directory of the file-backed document store.
    pub remote_dir: PathBuf,
    /// Optional TOML catalog replacing the builtin tours.
    pub catalog_path: Option<PathBuf>,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(150),
            resolve_timeout: Duration::from_millis(3000),
            poll_interval: Duration::from_millis(100),
            overlay_width: 320.0,
            overlay_height: 160.0,
            overlay_gap: 12.0,
            remote_max_attempts: 5,
            remote_base_backoff: Duration::from_millis(250),
            remote_max_backoff: Duration::from_secs(8),
            recorder_max_attempts: 3,
            recorder_backoff: Duration::from_millis(200),
            recorder_queue_capacity: 256,
            state_dir: PathBuf::new(),
            remote_dir: PathBuf::new(),
            catalog_path: None,
        }
    }
}

impl TourConfig {
    /// Create TourConfig from a TOML value.
    pub fn from_toml(value: &toml::Value) -> anyhow::Result<Self> {
        let d = Self::default();
        let ms = |section: &str, key: &str, default: Duration| {
            get(value, section, key)
                .and_then(|v| v.as_integer())
                .map(|n| Duration::from_millis(n.max(0) as u64))
                .unwrap_or(default)
        };
        let float = |section: &str, key: &str, default: f64| {
            get(value, section, key)
                .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
                .unwrap_or(default)
        };
        let int = |section: &str, key: &str, default: i64| {
            get(value, section, key)
                .and_then(|v| v.as_integer())
                .unwrap_or(default)
                .max(0)
        };
        let path = |section: &str, key: &str| {
            get(value, section, key)
                .and_then(|v| v.as_str())
                .map(PathBuf::from)
        };

        Ok(Self {
            settle_delay: ms("engine", "settle_delay_ms", d.settle_delay),
            resolve_timeout: ms("engine", "resolve_timeout_ms", d.resolve_timeout),
            poll_interval: ms("engine", "poll_interval_ms", d.poll_interval),
            overlay_width: float("placement", "overlay_width", d.overlay_width),
            overlay_height: float("placement", "overlay_height", d.overlay_height),
            overlay_gap: float("placement", "gap", d.overlay_gap),
            remote_max_attempts: int("persistence", "max_attempts", d.remote_max_attempts as i64)
                as u32,
            remote_base_backoff: ms("persistence", "base_backoff_ms", d.remote_base_backoff),
            remote_max_backoff: ms("persistence", "max_backoff_ms", d.remote_max_backoff),
            recorder_max_attempts: int("recorder", "max_attempts", d.recorder_max_attempts as i64)
                as u32,
            recorder_backoff: ms("recorder", "backoff_ms", d.recorder_backoff),
            recorder_queue_capacity: int(
                "recorder",
                "queue_capacity",
                d.recorder_queue_capacity as i64,
            ) as usize,
            state_dir: path("storage", "state_dir").unwrap_or(d.state_dir),
            remote_dir: path("storage", "remote_dir").unwrap_or(d.remote_dir),
            catalog_path: path("catalog", "path"),
        })
    }
}

fn get<'a>(value: &'a toml::Value, section: &str, key: &str) -> Option<&'a toml::Value> {
    value.get(section).and_then(|s| s.get(key))
}
