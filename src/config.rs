//! YAML configuration for shader loading and live reload.

use crate::error::{Result, ShaderError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How a shader notices that its files changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    /// Compare modification times against a baseline on an interval.
    #[default]
    Poll,
    /// Filesystem events via `notify`.
    Notify,
    Off,
}

/// Shader configuration.
///
/// ```yaml
/// search_paths: [shaders, ../common/shaders]
/// reload_interval_ms: 1000
/// watch: poll
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Directories searched for stage files not found next to the descriptor.
    pub search_paths: Vec<PathBuf>,
    pub reload_interval_ms: u64,
    pub watch: WatchMode,
    /// Log non-empty info logs of successful compiles and links.
    pub log_info_logs: bool,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            reload_interval_ms: 1000,
            watch: WatchMode::Poll,
            log_info_logs: true,
        }
    }
}

impl ShaderConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ShaderError::io(path, e))?;
        Self::from_yaml_str(&content)
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_millis(self.reload_interval_ms)
    }

    /// Finds a stage file.
    ///
    /// Absolute paths are returned as they are. Relative paths are tried
    /// against `base_dir` (the descriptor's directory), then each search
    /// path in order. If nothing exists the path is placed next to the
    /// descriptor, where creating it later will be noticed.
    pub fn resolve(&self, path: &Path, base_dir: Option<&Path>) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        base_dir
            .into_iter()
            .chain(self.search_paths.iter().map(PathBuf::as_path))
            .map(|dir| dir.join(path))
            .find(|candidate| candidate.exists())
            .unwrap_or_else(|| match base_dir {
                Some(dir) => dir.join(path),
                None => path.to_path_buf(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = ShaderConfig::from_yaml_str("watch: notify\n").unwrap();
        assert_eq!(config.watch, WatchMode::Notify);
        assert_eq!(config.reload_interval(), Duration::from_secs(1));
        assert!(config.search_paths.is_empty());
        assert!(config.log_info_logs);
    }

    #[test]
    fn test_full_config() {
        let yaml = "search_paths: [a, b/c]\nreload_interval_ms: 250\nwatch: off\nlog_info_logs: false\n";
        let config = ShaderConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.search_paths, vec![PathBuf::from("a"), PathBuf::from("b/c")]);
        assert_eq!(config.reload_interval_ms, 250);
        assert_eq!(config.watch, WatchMode::Off);
        assert!(!config.log_info_logs);
    }

    #[test]
    fn test_bad_watch_mode_is_an_error() {
        assert!(matches!(
            ShaderConfig::from_yaml_str("watch: sometimes\n"),
            Err(ShaderError::Yaml(_))
        ));
    }

    #[test]
    fn test_resolve_prefers_base_dir_then_search_paths() {
        let root = std::env::temp_dir().join(format!("glint_config_resolve_{}", std::process::id()));
        let base = root.join("base");
        let extra = root.join("extra");
        fs::create_dir_all(&base).unwrap();
        fs::create_dir_all(&extra).unwrap();
        fs::write(base.join("a.vert"), "").unwrap();
        fs::write(extra.join("a.vert"), "").unwrap();
        fs::write(extra.join("b.frag"), "").unwrap();

        let config = ShaderConfig {
            search_paths: vec![extra.clone()],
            ..Default::default()
        };
        assert_eq!(config.resolve(Path::new("a.vert"), Some(&base)), base.join("a.vert"));
        assert_eq!(config.resolve(Path::new("b.frag"), Some(&base)), extra.join("b.frag"));
        assert_eq!(config.resolve(Path::new("none.frag"), Some(&base)), base.join("none.frag"));
        assert_eq!(config.resolve(Path::new("none.frag"), None), PathBuf::from("none.frag"));

        fs::remove_dir_all(&root).unwrap();
    }
}
