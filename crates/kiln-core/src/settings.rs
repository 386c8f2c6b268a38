//! Settings store.
//!
//! Settings are read from TOML files and the environment, in increasing
//! precedence:
//!
//! ```text
//! <config_dir>/kiln/config.toml   # global
//! .kiln/config.toml               # local (or the file named by KILN_CONFIG)
//! KILN_* environment variables
//! ```

use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable naming an explicit settings file.
pub const CONFIG_ENV: &str = "KILN_CONFIG";

/// Resolved kiln settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// Never load scripts in-process; always replace the process image.
    pub disable_exec_load: bool,

    /// Keep the toolset's shared library path out of the environment.
    /// Deployment setups turn this on to isolate the environment.
    pub disable_shared_path: bool,

    /// Directory holding the toolset's own code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_path: Option<PathBuf>,

    /// `bin` directory of the configured environment, prepended to `PATH`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_bin: Option<PathBuf>,

    /// Shared library implementing the script runtime, instead of the
    /// built-in one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_library: Option<PathBuf>,
}

/// Boolean settings that can be overridden for a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    DisableExecLoad,
    DisableSharedPath,
}

impl Settings {
    /// Load settings from the default files and the process environment.
    pub fn load() -> Result<Self> {
        let mut settings = Self::default();

        match std::env::var_os(CONFIG_ENV) {
            Some(path) => settings.merge_file(Path::new(&path))?,
            None => {
                if let Some(config_dir) = dirs::config_dir() {
                    settings.merge_file(&config_dir.join("kiln").join("config.toml"))?;
                }
                settings.merge_file(Path::new(".kiln/config.toml"))?;
            }
        }

        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Overlay the values present in a settings file. Missing files are
    /// skipped.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let parse_error = |source| Error::SettingsParse {
            path: path.to_path_buf(),
            source,
        };
        let table: toml::Table = toml::from_str(&source).map_err(parse_error)?;
        let layer: Self = toml::from_str(&source).map_err(parse_error)?;
        tracing::debug!("Loaded settings from {}", path.display());

        if table.contains_key("disable-exec-load") {
            self.disable_exec_load = layer.disable_exec_load;
        }
        if table.contains_key("disable-shared-path") {
            self.disable_shared_path = layer.disable_shared_path;
        }
        if layer.shared_path.is_some() {
            self.shared_path = layer.shared_path;
        }
        if layer.environment_bin.is_some() {
            self.environment_bin = layer.environment_bin;
        }
        if layer.runtime_library.is_some() {
            self.runtime_library = layer.runtime_library;
        }
        Ok(())
    }

    /// Overlay `KILN_*` variables looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = var("KILN_DISABLE_EXEC_LOAD") {
            self.disable_exec_load = parse_bool("KILN_DISABLE_EXEC_LOAD", &value)?;
        }
        if let Some(value) = var("KILN_DISABLE_SHARED_PATH") {
            self.disable_shared_path = parse_bool("KILN_DISABLE_SHARED_PATH", &value)?;
        }
        if let Some(value) = var("KILN_SHARED_PATH").filter(|v| !v.is_empty()) {
            self.shared_path = Some(PathBuf::from(value));
        }
        if let Some(value) = var("KILN_ENVIRONMENT_BIN").filter(|v| !v.is_empty()) {
            self.environment_bin = Some(PathBuf::from(value));
        }
        if let Some(value) = var("KILN_RUNTIME_LIBRARY").filter(|v| !v.is_empty()) {
            self.runtime_library = Some(PathBuf::from(value));
        }
        Ok(())
    }

    pub fn flag(&self, flag: Flag) -> bool {
        match flag {
            Flag::DisableExecLoad => self.disable_exec_load,
            Flag::DisableSharedPath => self.disable_shared_path,
        }
    }

    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        match flag {
            Flag::DisableExecLoad => self.disable_exec_load = value,
            Flag::DisableSharedPath => self.disable_shared_path = value,
        }
    }

    /// Set `flag` to `value` until the returned guard is dropped.
    ///
    /// The guard dereferences to the settings, so the overridden values can
    /// be read and passed on while it is alive.
    pub fn override_flag(&mut self, flag: Flag, value: bool) -> SettingOverride<'_> {
        let previous = self.flag(flag);
        self.set_flag(flag, value);
        SettingOverride {
            settings: self,
            flag,
            previous,
        }
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Settings(e.to_string()))
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Settings(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}

/// Guard returned by [`Settings::override_flag`].
#[must_use = "the override ends as soon as the guard is dropped"]
pub struct SettingOverride<'a> {
    settings: &'a mut Settings,
    flag: Flag,
    previous: bool,
}

impl Deref for SettingOverride<'_> {
    type Target = Settings;

    fn deref(&self) -> &Settings {
        self.settings
    }
}

impl DerefMut for SettingOverride<'_> {
    fn deref_mut(&mut self) -> &mut Settings {
        self.settings
    }
}

impl Drop for SettingOverride<'_> {
    fn drop(&mut self) {
        self.settings.set_flag(self.flag, self.previous);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_override_is_scoped() {
        let mut settings = Settings {
            disable_shared_path: true,
            ..Settings::default()
        };

        {
            let overridden = settings.override_flag(Flag::DisableSharedPath, false);
            assert!(!overridden.disable_shared_path);
        }

        assert!(settings.disable_shared_path);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("KILN_DISABLE_EXEC_LOAD", "yes"),
            ("KILN_SHARED_PATH", "/opt/kiln/lib"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .expect("env should apply");

        assert!(settings.disable_exec_load);
        assert!(!settings.disable_shared_path);
        assert_eq!(settings.shared_path, Some(PathBuf::from("/opt/kiln/lib")));
    }

    #[test]
    fn test_env_rejects_garbage_bool() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env(|key| (key == "KILN_DISABLE_SHARED_PATH").then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("KILN_DISABLE_SHARED_PATH"));
    }

    #[test]
    fn test_merge_file_layers() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let global = temp.path().join("global.toml");
        let local = temp.path().join("local.toml");
        fs::write(&global, "disable-shared-path = true\nshared-path = \"/global\"\n")
            .expect("Failed to write settings");
        fs::write(&local, "disable-exec-load = true\n").expect("Failed to write settings");

        let mut settings = Settings::default();
        settings.merge_file(&global).expect("global should merge");
        settings.merge_file(&local).expect("local should merge");
        settings
            .merge_file(&temp.path().join("missing.toml"))
            .expect("missing file is skipped");

        assert!(settings.disable_exec_load);
        assert!(settings.disable_shared_path);
        assert_eq!(settings.shared_path, Some(PathBuf::from("/global")));
    }

    #[test]
    fn test_malformed_file_has_hint() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "disable-exec-load = \"sometimes\"").expect("Failed to write settings");

        let err = Settings::default().merge_file(&path).unwrap_err();
        assert!(matches!(err, Error::SettingsParse { path: ref bad, .. } if bad == &path));
        assert!(err.to_string().contains(&path.display().to_string()));
        assert!(err.hint().is_some());
    }

    #[test]
    fn test_to_toml_skips_unset_paths() {
        let rendered = Settings::default().to_toml().expect("settings should render");
        assert!(rendered.contains("disable-exec-load = false"));
        assert!(rendered.contains("disable-shared-path = false"));
        for key in ["shared-path", "environment-bin", "runtime-library"] {
            assert!(
                !rendered.lines().any(|line| line.starts_with(key)),
                "{key} should be omitted when unset"
            );
        }
    }
}
