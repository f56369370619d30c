use ics_core::playback::PlaybackMode;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory holding `TaskInfoNN.json`, `TaskImageNN.jpg` and
    /// `graspables.json`.
    pub config_dir: PathBuf,
    /// Path of the external text-to-speech executable. Its absence disables
    /// speech rather than failing startup.
    pub tts_exe: PathBuf,
    pub playback_mode: PlaybackMode,
    /// Websocket URLs of the rosbridge endpoints to monitor. May be empty.
    pub rosbridge_urls: Vec<String>,
    /// Directory where session recordings are written.
    pub record_dir: PathBuf,
    /// Cadence of the speech/health tick loop.
    pub tick_interval: Duration,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let config_dir = std::env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./config"));

        let tts_exe = std::env::var("TTS_EXE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./tts/console-tts"));

        let playback_mode_str =
            std::env::var("PLAYBACK_MODE").unwrap_or_else(|_| "disabled".to_string());
        let playback_mode = match playback_mode_str.to_lowercase().as_str() {
            "record" => PlaybackMode::Record,
            "disabled" => PlaybackMode::Disabled,
            other => {
                return Err(ConfigError::InvalidValue(
                    "PLAYBACK_MODE".to_string(),
                    format!("'{other}' is not a playback mode"),
                ));
            }
        };

        let rosbridge_urls = std::env::var("ROSBRIDGE_URLS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let record_dir = std::env::var("RECORD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./records"));

        let tick_interval_str =
            std::env::var("TICK_INTERVAL_MS").unwrap_or_else(|_| "100".to_string());
        let tick_interval = tick_interval_str
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| {
                ConfigError::InvalidValue("TICK_INTERVAL_MS".to_string(), e.to_string())
            })?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            config_dir,
            tts_exe,
            playback_mode,
            rosbridge_urls,
            record_dir,
            tick_interval,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("CONFIG_DIR");
            env::remove_var("TTS_EXE");
            env::remove_var("PLAYBACK_MODE");
            env::remove_var("ROSBRIDGE_URLS");
            env::remove_var("RECORD_DIR");
            env::remove_var("TICK_INTERVAL_MS");
            env::remove_var("RUST_LOG");
        }
    }

    #[test]
    #[serial]
    fn config_defaults() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.config_dir, PathBuf::from("./config"));
        assert_eq!(config.tts_exe, PathBuf::from("./tts/console-tts"));
        assert_eq!(config.playback_mode, PlaybackMode::Disabled);
        assert!(config.rosbridge_urls.is_empty());
        assert_eq!(config.record_dir, PathBuf::from("./records"));
        assert_eq!(config.tick_interval, Duration::from_millis(100));
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn config_reads_overrides() {
        clear_env_vars();
        unsafe {
            env::set_var("CONFIG_DIR", "/srv/ics/config");
            env::set_var("PLAYBACK_MODE", "record");
            env::set_var(
                "ROSBRIDGE_URLS",
                "ws://robot-a:9090, ws://robot-b:9090 ,, ",
            );
            env::set_var("TICK_INTERVAL_MS", "50");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.config_dir, PathBuf::from("/srv/ics/config"));
        assert_eq!(config.playback_mode, PlaybackMode::Record);
        assert_eq!(
            config.rosbridge_urls,
            vec!["ws://robot-a:9090".to_string(), "ws://robot-b:9090".to_string()]
        );
        assert_eq!(config.tick_interval, Duration::from_millis(50));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    #[serial]
    fn config_rejects_unknown_playback_mode() {
        clear_env_vars();
        unsafe {
            env::set_var("PLAYBACK_MODE", "replay");
        }

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "PLAYBACK_MODE"));
    }

    #[test]
    #[serial]
    fn config_rejects_non_numeric_tick_interval() {
        clear_env_vars();
        unsafe {
            env::set_var("TICK_INTERVAL_MS", "fast");
        }

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "TICK_INTERVAL_MS"));
    }
}
