//! Configuration loader.
//!
//! Reads a TOML file and maps it onto [`TourConfig`]. Defaults for missing
//! keys come from `TourConfig`; storage directories left empty are resolved
//! by the wiring.

use anyhow::Context;
use std::path::Path;
use tg_core::TourConfig;

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML.
pub fn load_config(config_path: &Path) -> anyhow::Result<TourConfig> {
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value =
        toml::from_str(&content).context("Failed to parse config as TOML")?;
    TourConfig::from_toml(&toml_value)
}

/// Load `config_path` if given, otherwise use defaults.
pub fn load_or_default(config_path: Option<&Path>) -> anyhow::Result<TourConfig> {
    match config_path {
        Some(path) => load_config(path),
        None => Ok(TourConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_valid_toml() {
        let toml_content = r#"
            [engine]
            settle_delay_ms = 50
            resolve_timeout_ms = 1000

            [storage]
            state_dir = "/tmp/tourguide/state"

            [catalog]
            path = "tours.toml"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = load_config(temp_file.path()).unwrap();

        assert_eq!(config.settle_delay, Duration::from_millis(50));
        assert_eq!(config.resolve_timeout, Duration::from_millis(1000));
        assert_eq!(config.poll_interval, TourConfig::default().poll_interval);
        assert_eq!(config.state_dir, PathBuf::from("/tmp/tourguide/state"));
        assert_eq!(config.catalog_path, Some(PathBuf::from("tours.toml")));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config(Path::new("/this/path/does/not/exist/tourguide.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"), "{err}");
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[engine\nsettle_delay_ms = ").unwrap();

        let err = load_config(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"), "{err}");
    }

    #[test]
    fn no_path_means_defaults() {
        assert_eq!(load_or_default(None).unwrap(), TourConfig::default());
    }
}
