//! Environment configuration for commands run in-process.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::settings::Settings;

/// Variable through which scripts find the toolset's own code.
pub const SHARED_PATH_VAR: &str = "KILN_LIB_PATH";

/// Prepares the process environment before a script is loaded.
pub trait EnvironmentHook {
    fn configure(&self, settings: &Settings) -> Result<()>;
}

/// One change to the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvChange {
    Set(String, OsString),
    Remove(String),
}

/// Default hook: puts the environment's `bin` directory first on `PATH`
/// and exports or withdraws [`SHARED_PATH_VAR`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SharedPathEnvironment;

impl SharedPathEnvironment {
    /// Changes needed for `settings`, given the current `PATH`.
    pub fn plan(settings: &Settings, current_path: Option<OsString>) -> Result<Vec<EnvChange>> {
        let mut changes = Vec::new();

        if let Some(bin) = &settings.environment_bin {
            let mut entries: Vec<PathBuf> = vec![bin.clone()];
            if let Some(current) = &current_path {
                entries.extend(env::split_paths(current).filter(|entry| entry != bin));
            }
            let path = env::join_paths(entries)
                .map_err(|e| Error::Settings(format!("environment-bin: {e}")))?;
            changes.push(EnvChange::Set("PATH".to_string(), path));
        }

        match (&settings.shared_path, settings.disable_shared_path) {
            (Some(shared), false) => changes.push(EnvChange::Set(
                SHARED_PATH_VAR.to_string(),
                shared.clone().into_os_string(),
            )),
            (_, true) => changes.push(EnvChange::Remove(SHARED_PATH_VAR.to_string())),
            (None, false) => {}
        }

        Ok(changes)
    }

    fn apply(changes: &[EnvChange]) {
        for change in changes {
            tracing::debug!("Environment: {:?}", change);
            // SAFETY: the environment is configured on the dispatching thread
            // right before the script takes over; no other thread runs.
            unsafe {
                match change {
                    EnvChange::Set(key, value) => env::set_var(key, value),
                    EnvChange::Remove(key) => env::remove_var(key),
                }
            }
        }
    }
}

impl EnvironmentHook for SharedPathEnvironment {
    fn configure(&self, settings: &Settings) -> Result<()> {
        let changes = Self::plan(settings, env::var_os("PATH"))?;
        Self::apply(&changes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_exports_shared_path() {
        let settings = Settings {
            shared_path: Some(PathBuf::from("/opt/kiln/lib")),
            ..Settings::default()
        };

        let changes = SharedPathEnvironment::plan(&settings, None).unwrap();
        assert_eq!(
            changes,
            vec![EnvChange::Set(
                SHARED_PATH_VAR.to_string(),
                OsString::from("/opt/kiln/lib")
            )]
        );
    }

    #[test]
    fn test_plan_withdraws_shared_path_when_disabled() {
        let settings = Settings {
            shared_path: Some(PathBuf::from("/opt/kiln/lib")),
            disable_shared_path: true,
            ..Settings::default()
        };

        let changes = SharedPathEnvironment::plan(&settings, None).unwrap();
        assert_eq!(changes, vec![EnvChange::Remove(SHARED_PATH_VAR.to_string())]);
    }

    #[cfg(unix)]
    #[test]
    fn test_plan_prepends_bin_once() {
        let settings = Settings {
            environment_bin: Some(PathBuf::from("/env/bin")),
            ..Settings::default()
        };

        let changes =
            SharedPathEnvironment::plan(&settings, Some(OsString::from("/usr/bin:/env/bin:/bin")))
                .unwrap();
        assert_eq!(
            changes,
            vec![EnvChange::Set(
                "PATH".to_string(),
                OsString::from("/env/bin:/usr/bin:/bin")
            )]
        );
    }

    #[test]
    fn test_plan_without_settings_is_empty() {
        let changes = SharedPathEnvironment::plan(&Settings::default(), None).unwrap();
        assert!(changes.is_empty());
    }
}
