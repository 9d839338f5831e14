//! Environment-driven configuration for the monitor binary.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Invalid or missing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("either STREAM_URL or INPUT_FILE must be set")]
    MissingSource,

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Where measurements come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A WebSocket server streaming wire-format lines.
    Stream { url: String },
    /// A file of wire-format lines, replayed once.
    File { path: PathBuf },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'pretty' or 'json', got '{other}'")),
        }
    }
}

/// Monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub source: Source,
    pub connect_timeout: Duration,
    /// Period of the alert evaluation loop.
    pub evaluation_interval: Duration,
    /// Trailing window each evaluation scans.
    pub evaluation_window: Duration,
    pub log_format: LogFormat,
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                    | Default                               |
    /// |----------------------------|---------------------------------------|
    /// | `STREAM_URL`               | required unless `INPUT_FILE` is set   |
    /// | `INPUT_FILE`               | unset; takes precedence when set      |
    /// | `CONNECT_TIMEOUT_SECS`     | `10`                                  |
    /// | `EVALUATION_INTERVAL_SECS` | `5`                                   |
    /// | `EVALUATION_WINDOW_MINS`   | `60`                                  |
    /// | `LOG_FORMAT`               | `pretty` (`pretty` or `json`)         |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let source = match (non_empty("INPUT_FILE"), non_empty("STREAM_URL")) {
            (Some(path), _) => Source::File {
                path: PathBuf::from(path.trim()),
            },
            (None, Some(url)) => Source::Stream {
                url: url.trim().to_string(),
            },
            (None, None) => return Err(ConfigError::MissingSource),
        };

        let connect_timeout = Duration::from_secs(positive(&lookup, "CONNECT_TIMEOUT_SECS", 10)?);
        let evaluation_interval =
            Duration::from_secs(positive(&lookup, "EVALUATION_INTERVAL_SECS", 5)?);
        let evaluation_window =
            Duration::from_secs(positive(&lookup, "EVALUATION_WINDOW_MINS", 60)?.saturating_mul(60));

        let log_format = match non_empty("LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                var: "LOG_FORMAT",
                value: raw,
                reason,
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            source,
            connect_timeout,
            evaluation_interval,
            evaluation_window,
            log_format,
        })
    }
}

/// Parse a positive integer variable, falling back to `default` when unset.
fn positive<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: "must be greater than zero".into(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<MonitorConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MonitorConfig::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn defaults_with_stream_url() {
        let config = load(&[("STREAM_URL", "ws://localhost:8080")]).unwrap();

        assert_eq!(
            config.source,
            Source::Stream {
                url: "ws://localhost:8080".into()
            }
        );
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.evaluation_interval, Duration::from_secs(5));
        assert_eq!(config.evaluation_window, Duration::from_secs(3600));
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn input_file_takes_precedence() {
        let config = load(&[("STREAM_URL", "ws://x"), ("INPUT_FILE", "data.csv")]).unwrap();
        assert_eq!(
            config.source,
            Source::File {
                path: PathBuf::from("data.csv")
            }
        );
    }

    #[test]
    fn missing_source_is_rejected() {
        assert_matches!(load(&[]), Err(ConfigError::MissingSource));
        assert_matches!(load(&[("STREAM_URL", "  ")]), Err(ConfigError::MissingSource));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("STREAM_URL", "ws://x"),
            ("CONNECT_TIMEOUT_SECS", "3"),
            ("EVALUATION_INTERVAL_SECS", "1"),
            ("EVALUATION_WINDOW_MINS", "15"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();

        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.evaluation_interval, Duration::from_secs(1));
        assert_eq!(config.evaluation_window, Duration::from_secs(15 * 60));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn bad_numbers_name_the_variable() {
        assert_matches!(
            load(&[("STREAM_URL", "ws://x"), ("CONNECT_TIMEOUT_SECS", "soon")]),
            Err(ConfigError::Invalid { var: "CONNECT_TIMEOUT_SECS", .. })
        );
        assert_matches!(
            load(&[("STREAM_URL", "ws://x"), ("EVALUATION_INTERVAL_SECS", "0")]),
            Err(ConfigError::Invalid { var: "EVALUATION_INTERVAL_SECS", .. })
        );
        assert_matches!(
            load(&[("STREAM_URL", "ws://x"), ("LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid { var: "LOG_FORMAT", .. })
        );
    }
}
