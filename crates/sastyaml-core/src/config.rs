use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Name of the config file picked up from the working directory.
pub const CONFIG_FILE_NAME: &str = "sastyaml.toml";

/// User settings, loaded from `sastyaml.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master switch. When off every trigger is a silent no-op.
    pub enabled: bool,

    /// Analyze playbooks automatically when they are saved.
    pub run_on_save: bool,

    /// Interpreter used to run the analyzer module.
    pub python_path: String,

    /// Directory the analyzer is run from. Derived from the executable
    /// location when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzer_root: Option<PathBuf>,

    /// Upper bound on a single analyzer run.
    pub timeout_secs: u64,

    /// Where rendered HTML reports are written. Defaults to the temp dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            run_on_save: true,
            python_path: "python3".to_string(),
            analyzer_root: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            report_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings the way the CLI does: an explicit file if given,
    /// otherwise `sastyaml.toml` in `dir` when it exists, otherwise defaults.
    /// Environment overrides are applied last.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        let mut settings = match explicit {
            Some(path) => Self::load(path)?,
            None => {
                let candidate = dir.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::load(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Apply `SASTYAML_PYTHON`, `SASTYAML_ANALYZER_ROOT` and
    /// `SASTYAML_TIMEOUT_SECS`. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(python) = get("SASTYAML_PYTHON") {
            self.python_path = python;
        }
        if let Some(root) = get("SASTYAML_ANALYZER_ROOT") {
            self.analyzer_root = Some(PathBuf::from(root));
        }
        if let Some(raw) = get("SASTYAML_TIMEOUT_SECS") {
            self.timeout_secs = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv {
                    name: "SASTYAML_TIMEOUT_SECS",
                    value: raw.clone(),
                })?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// The analyzer's working directory: `analyzer_root` if set, otherwise
    /// two levels above the directory holding the running executable
    /// (`<root>/bin/sastyaml` → `<root>`).
    pub fn resolve_analyzer_root(&self) -> Result<PathBuf, ConfigError> {
        if let Some(root) = &self.analyzer_root {
            return Ok(root.clone());
        }

        let exe = std::env::current_exe().map_err(|e| ConfigError::AnalyzerRoot(e.to_string()))?;
        root_from_executable(&exe).ok_or_else(|| {
            ConfigError::AnalyzerRoot(format!(
                "executable '{}' has no grandparent directory; set analyzer_root",
                exe.display()
            ))
        })
    }

    pub fn report_dir(&self) -> PathBuf {
        self.report_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

fn root_from_executable(exe: &Path) -> Option<PathBuf> {
    exe.parent()?.parent().map(Path::to_path_buf)
}

/// Write a default config file if none exists at `path`.
pub fn scaffold(path: &Path) -> anyhow::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let body = toml::to_string_pretty(&Settings::default())?;
    std::fs::write(path, body)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.enabled);
        assert!(settings.run_on_save);
        assert_eq!(settings.python_path, "python3");
        assert_eq!(settings.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings =
            Settings::from_toml("run_on_save = false\npython_path = \"/usr/bin/python3.11\"\n", Path::new("x.toml"))
                .unwrap();
        assert!(settings.enabled);
        assert!(!settings.run_on_save);
        assert_eq!(settings.python_path, "/usr/bin/python3.11");
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = Settings::from_toml("enabled = maybe", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SASTYAML_PYTHON", "/opt/py/bin/python"),
            ("SASTYAML_ANALYZER_ROOT", "/opt/sast"),
            ("SASTYAML_TIMEOUT_SECS", "5"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings
            .apply_env(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.python_path, "/opt/py/bin/python");
        assert_eq!(settings.analyzer_root, Some(PathBuf::from("/opt/sast")));
        assert_eq!(settings.timeout_secs, 5);
    }

    #[test]
    fn test_blank_env_is_ignored_and_bad_timeout_rejected() {
        let mut settings = Settings::default();
        settings
            .apply_env(|name| (name == "SASTYAML_PYTHON").then(|| "  ".to_string()))
            .unwrap();
        assert_eq!(settings.python_path, "python3");

        let err = settings
            .apply_env(|name| (name == "SASTYAML_TIMEOUT_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "enabled = false\ntimeout_secs = 10\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert!(!settings.enabled);
        assert_eq!(settings.timeout_secs, 10);
    }

    #[test]
    fn test_missing_explicit_file_is_read_error() {
        let err = Settings::load(Path::new("/no/such/sastyaml.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_configured_root_wins() {
        let settings = Settings {
            analyzer_root: Some(PathBuf::from("/srv/analyzer")),
            ..Settings::default()
        };
        assert_eq!(
            settings.resolve_analyzer_root().unwrap(),
            PathBuf::from("/srv/analyzer")
        );
    }

    #[test]
    fn test_root_from_executable() {
        assert_eq!(
            root_from_executable(Path::new("/opt/sast/bin/sastyaml")),
            Some(PathBuf::from("/opt/sast"))
        );
        assert_eq!(root_from_executable(Path::new("sastyaml")), None);
    }

    #[test]
    fn test_scaffold_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join(CONFIG_FILE_NAME);

        assert!(scaffold(&path).unwrap());
        let written = Settings::load(&path).unwrap();
        assert_eq!(written, Settings::default());

        std::fs::write(&path, "enabled = false\n").unwrap();
        assert!(!scaffold(&path).unwrap());
        assert!(!Settings::load(&path).unwrap().enabled);
    }
}
