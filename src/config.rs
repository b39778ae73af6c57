use crate::blade::BladeKind;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

pub const DEFAULT_REFRESH_MS: u64 = 1_500;
pub const MIN_REFRESH_MS: u64 = 500;
const DEFAULT_STATUS_DELAY_MS: u64 = 3_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub source: Option<String>,
    pub refresh_ms: Option<u64>,
    pub status_delay: Duration,
    pub kubectl: String,
    pub rio: String,
    pub blade: Option<BladeKind>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            source: None,
            refresh_ms: None,
            status_delay: Duration::from_millis(DEFAULT_STATUS_DELAY_MS),
            kubectl: "kubectl".to_string(),
            rio: "rio".to_string(),
            blade: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml(raw: &str, source: Option<String>) -> Result<Self> {
        let parsed: AxeConfigFile = if raw.trim().is_empty() {
            AxeConfigFile::default()
        } else {
            serde_yaml::from_str(raw).context("invalid config yaml")?
        };
        let defaults = Self::default();
        Ok(Self {
            source,
            refresh_ms: parsed.refresh_ms,
            status_delay: parsed
                .status_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.status_delay),
            kubectl: non_blank(parsed.kubectl).unwrap_or(defaults.kubectl),
            rio: non_blank(parsed.rio).unwrap_or(defaults.rio),
            blade: parsed.blade,
        })
    }

    pub fn refresh_interval(&self, flag: Option<u64>) -> Duration {
        let millis = flag
            .or(self.refresh_ms)
            .unwrap_or(DEFAULT_REFRESH_MS)
            .max(MIN_REFRESH_MS);
        Duration::from_millis(millis)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct AxeConfigFile {
    refresh_ms: Option<u64>,
    #[serde(alias = "status_delay")]
    status_delay_ms: Option<u64>,
    kubectl: Option<String>,
    rio: Option<String>,
    blade: Option<BladeKind>,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfigWatcher {
    path: Option<PathBuf>,
    pinned: bool,
    modified: Option<SystemTime>,
}

impl RuntimeConfigWatcher {
    pub fn new(explicit: Option<PathBuf>) -> Self {
        match explicit {
            Some(path) => Self {
                path: Some(path),
                pinned: true,
                modified: None,
            },
            None => Self {
                path: discover_config_path(),
                pinned: false,
                modified: None,
            },
        }
    }

    pub fn load_current(&mut self) -> Result<RuntimeConfig> {
        let Some(path) = self.path.clone() else {
            return Ok(RuntimeConfig::default());
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read runtime config {}", path.display()))?;
        let config = RuntimeConfig::from_yaml(&raw, Some(path.display().to_string()))
            .with_context(|| format!("failed to parse runtime config {}", path.display()))?;
        self.modified = fs::metadata(&path)
            .ok()
            .and_then(|meta| meta.modified().ok());
        Ok(config)
    }

    pub fn reload_if_changed(&mut self) -> Result<Option<RuntimeConfig>> {
        let Some(current_path) = self.path.clone() else {
            if self.pinned {
                return Ok(None);
            }
            self.path = discover_config_path();
            if self.path.is_some() {
                return self.load_current().map(Some);
            }
            return Ok(None);
        };

        if !current_path.exists() {
            if self.modified.is_none() {
                return Ok(None);
            }
            self.modified = None;
            if !self.pinned {
                self.path = discover_config_path();
                if self.path.is_some() {
                    return self.load_current().map(Some);
                }
            }
            return Ok(Some(RuntimeConfig::default()));
        }

        let modified = fs::metadata(&current_path)
            .ok()
            .and_then(|meta| meta.modified().ok());
        if modified != self.modified {
            return self.load_current().map(Some);
        }

        Ok(None)
    }
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("AXE_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("axe.yaml"),
        PathBuf::from("axe.yml"),
        PathBuf::from(".axe.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/axe/config.yaml"),
            PathBuf::from(&home).join(".config/axe/config.yml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("axe-{}-{name}.yaml", std::process::id()));
        fs::write(&path, contents).expect("write scratch config");
        path
    }

    #[test]
    fn yaml_fields_override_defaults() {
        let raw = "refresh_ms: 2000\nstatus_delay_ms: 500\nkubectl: /opt/bin/kubectl\nblade: k8s\n";
        let config = RuntimeConfig::from_yaml(raw, None).expect("parse");
        assert_eq!(config.refresh_ms, Some(2_000));
        assert_eq!(config.status_delay, Duration::from_millis(500));
        assert_eq!(config.kubectl, "/opt/bin/kubectl");
        assert_eq!(config.rio, "rio");
        assert_eq!(config.blade, Some(BladeKind::K8s));
    }

    #[test]
    fn empty_file_and_blank_paths_fall_back_to_defaults() {
        let config = RuntimeConfig::from_yaml("", None).expect("parse");
        assert_eq!(config, RuntimeConfig::default());
        let config = RuntimeConfig::from_yaml("rio: '  '\n", None).expect("parse");
        assert_eq!(config.rio, "rio");
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(RuntimeConfig::from_yaml("blade: [nope", None).is_err());
        assert!(RuntimeConfig::from_yaml("blade: nomad\n", None).is_err());
    }

    #[test]
    fn refresh_interval_prefers_flag_and_respects_floor() {
        let config = RuntimeConfig {
            refresh_ms: Some(4_000),
            ..RuntimeConfig::default()
        };
        assert_eq!(config.refresh_interval(None), Duration::from_millis(4_000));
        assert_eq!(config.refresh_interval(Some(800)), Duration::from_millis(800));
        assert_eq!(config.refresh_interval(Some(10)), Duration::from_millis(MIN_REFRESH_MS));
        assert_eq!(
            RuntimeConfig::default().refresh_interval(None),
            Duration::from_millis(DEFAULT_REFRESH_MS)
        );
    }

    #[test]
    fn pinned_file_loads_once_until_it_changes() {
        let path = scratch_file("pinned", "status_delay_ms: 1200\n");
        let mut watcher = RuntimeConfigWatcher::new(Some(path.clone()));
        let config = watcher.load_current().expect("load");
        assert_eq!(config.status_delay, Duration::from_millis(1_200));
        assert_eq!(config.source, Some(path.display().to_string()));
        assert!(watcher.reload_if_changed().expect("reload").is_none());

        fs::remove_file(&path).expect("remove scratch config");
        let reset = watcher.reload_if_changed().expect("reload").expect("reset");
        assert_eq!(reset, RuntimeConfig::default());
        assert!(watcher.reload_if_changed().expect("reload").is_none());
    }
}
