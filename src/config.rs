use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{NavError, NavResult};
use crate::transport::Credentials;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub markers: MarkerConfig,
    pub fetch: FetchConfig,
    pub demo: DemoConfig,
    pub history: HistoryConfig,
    pub log: LogConfig,
}

/// Attribute names that identify the structural parts of a page.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MarkerConfig {
    pub root: String,
    pub page: String,
    pub ignore: String,
    pub transition: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            root: "a-root".to_string(),
            page: "a-page".to_string(),
            ignore: "a-ignore".to_string(),
            transition: "a-transition".to_string(),
        }
    }
}

impl MarkerConfig {
    pub fn root_selector(&self) -> String {
        format!("[{}]", self.root)
    }

    pub fn page_selector(&self) -> String {
        format!("[{}]", self.page)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct FetchConfig {
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DemoConfig {
    pub leave_ms: u64,
    pub enter_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            leave_ms: 300,
            enter_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct LogConfig {
    pub filter: Option<String>,
}

impl Config {
    pub fn load() -> NavResult<Self> {
        let Some(path) = default_config_path() else {
            return Ok(Self::default());
        };
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> NavResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        if !path.is_file() {
            return Err(NavError::invalid_argument(format!(
                "config path is not a regular file: {}",
                path.display()
            )));
        }

        let raw = fs::read_to_string(path).map_err(|source| {
            NavError::io_with_context(source, format!("failed to read config: {}", path.display()))
        })?;
        let parsed = toml::from_str::<Self>(&raw).map_err(|source| {
            NavError::invalid_argument(format!(
                "failed to parse config {}: {source}",
                path.display()
            ))
        })?;
        Ok(parsed.sanitized())
    }

    fn sanitized(mut self) -> Self {
        let defaults = MarkerConfig::default();
        let markers = &mut self.markers;
        for (value, fallback) in [
            (&mut markers.root, defaults.root),
            (&mut markers.page, defaults.page),
            (&mut markers.ignore, defaults.ignore),
            (&mut markers.transition, defaults.transition),
        ] {
            let trimmed = value.trim();
            if trimmed.is_empty() || trimmed.contains(['[', ']', ' ']) {
                *value = fallback;
            } else if trimmed.len() != value.len() {
                *value = trimmed.to_string();
            }
        }
        self.demo.leave_ms = self.demo.leave_ms.max(1);
        self.demo.enter_ms = self.demo.enter_ms.max(1);
        self.history.capacity = self.history.capacity.max(1);
        if self
            .log
            .filter
            .as_ref()
            .is_some_and(|filter| filter.trim().is_empty())
        {
            self.log.filter = None;
        }
        self
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os("SNAV_CONFIG_PATH")
        && !explicit.is_empty()
    {
        return Some(PathBuf::from(explicit));
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME")
        && !xdg.is_empty()
    {
        return Some(PathBuf::from(xdg).join("snav").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME")
        && !home.is_empty()
    {
        return Some(
            PathBuf::from(home)
                .join(".config")
                .join("snav")
                .join("config.toml"),
        );
    }
    if let Some(appdata) = std::env::var_os("APPDATA")
        && !appdata.is_empty()
    {
        return Some(PathBuf::from(appdata).join("snav").join("config.toml"));
    }
    None
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::process;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::Config;
    use crate::transport::Credentials;

    fn unique_temp_path(suffix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("snav_config_{suffix}_{}_{}", process::id(), nanos));
        path
    }

    #[test]
    fn load_from_path_returns_defaults_for_missing_file() {
        let missing = unique_temp_path("missing.toml");
        let config = Config::load_from_path(&missing).expect("missing config should fallback");
        assert_eq!(config, Config::default());
        assert_eq!(config.markers.root_selector(), "[a-root]");
        assert_eq!(config.markers.page_selector(), "[a-page]");
        assert_eq!(config.fetch.credentials, Credentials::Include);
    }

    #[test]
    fn load_from_path_applies_partial_overrides_and_sanitizes() {
        let path = unique_temp_path("custom.toml");
        fs::write(
            &path,
            r#"
            [markers]
            root = "data-root"
            page = ""
            ignore = "bad attr"

            [fetch]
            credentials = "same-origin"

            [demo]
            leave_ms = 0

            [history]
            capacity = 0

            [log]
            filter = "   "
            "#,
        )
        .expect("config file should be written");

        let config = Config::load_from_path(&path).expect("config should parse");
        assert_eq!(config.markers.root, "data-root");
        assert_eq!(config.markers.page, "a-page");
        assert_eq!(config.markers.ignore, "a-ignore");
        assert_eq!(config.markers.transition, "a-transition");
        assert_eq!(config.fetch.credentials, Credentials::SameOrigin);
        assert_eq!(config.demo.leave_ms, 1);
        assert_eq!(config.demo.enter_ms, 300);
        assert_eq!(config.history.capacity, 1);
        assert_eq!(config.log.filter, None);

        fs::remove_file(&path).expect("config file should be removed");
    }

    #[test]
    fn load_from_path_rejects_directories_and_bad_toml() {
        let dir = std::env::temp_dir();
        assert!(Config::load_from_path(&dir).is_err());

        let path = unique_temp_path("broken.toml");
        fs::write(&path, "[demo\nleave_ms = ").expect("config file should be written");
        assert!(Config::load_from_path(&path).is_err());
        fs::remove_file(&path).expect("config file should be removed");
    }
}
