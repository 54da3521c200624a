//! Engine location and process environment.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directories where interpreters are commonly installed but which a
/// GUI-launched process may not have on its `PATH`.
pub const KNOWN_INSTALL_LOCATIONS: &[&str] = &[
    "/usr/local/bin",
    "/opt/homebrew/bin",
    "/usr/bin",
    "/opt/local/bin",
];

#[cfg(windows)]
const DEFAULT_PROGRAM: &str = "python";
#[cfg(not(windows))]
const DEFAULT_PROGRAM: &str = "python3";

/// Engine script path relative to the executable directory.
const BUNDLED_SCRIPT: &str = "python/convert.py";

/// Engine script path relative to the working directory in development.
const DEV_SCRIPT: &str = "src/python/convert.py";

/// Errors raised while resolving the engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("Cannot locate the engine script: {0}")]
    ScriptLocation(#[source] std::io::Error),

    #[error("Cannot build search path: {0}")]
    SearchPath(#[from] std::env::JoinPathsError),
}

/// How to start the conversion engine.
///
/// | Env var                          | Default                              |
/// |----------------------------------|--------------------------------------|
/// | `MDOCX_ENGINE_PROGRAM`           | `python3` (`python` on Windows)      |
/// | `MDOCX_ENGINE_SCRIPT`            | `<exe dir>/python/convert.py`        |
/// | `MDOCX_DEV`                      | unset; when set, script defaults to `./src/python/convert.py` |
/// | `MDOCX_ENGINE_SEARCH_PATHS`      | empty; extra `PATH` entries           |
/// | `MDOCX_INACTIVITY_TIMEOUT_SECS`  | `0` (disabled)                        |
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub program: PathBuf,
    pub script: PathBuf,
    /// Prepended to the inherited `PATH`, ahead of the known locations.
    pub extra_search_paths: Vec<PathBuf>,
    /// Kill the engine if it produces no output for this long.
    pub inactivity_timeout: Option<Duration>,
}

impl EngineConfig {
    /// Config with an explicit program and script and no extras.
    pub fn new(program: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            script: script.into(),
            extra_search_paths: Vec::new(),
            inactivity_timeout: None,
        }
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let program = lookup("MDOCX_ENGINE_PROGRAM")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM));

        let script = match lookup("MDOCX_ENGINE_SCRIPT").filter(|v| !v.is_empty()) {
            Some(path) => PathBuf::from(path),
            None if lookup("MDOCX_DEV").is_some() => {
                std::env::current_dir()
                    .map_err(ConfigError::ScriptLocation)?
                    .join(DEV_SCRIPT)
            }
            None => bundled_script()?,
        };

        let extra_search_paths = lookup("MDOCX_ENGINE_SEARCH_PATHS")
            .map(|v| std::env::split_paths(&v).collect())
            .unwrap_or_default();

        let inactivity_timeout = match lookup("MDOCX_INACTIVITY_TIMEOUT_SECS") {
            None => None,
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    var: "MDOCX_INACTIVITY_TIMEOUT_SECS",
                    value: raw.clone(),
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
        };

        Ok(Self {
            program,
            script,
            extra_search_paths,
            inactivity_timeout,
        })
    }

    /// `PATH` for the engine: extras, then the known install locations,
    /// then whatever the parent process inherited.
    pub fn search_path(&self, inherited: Option<&OsString>) -> Result<OsString, ConfigError> {
        let mut entries: Vec<PathBuf> = self.extra_search_paths.clone();
        entries.extend(KNOWN_INSTALL_LOCATIONS.iter().map(PathBuf::from));
        if let Some(inherited) = inherited {
            entries.extend(std::env::split_paths(inherited));
        }
        Ok(std::env::join_paths(entries)?)
    }
}

fn bundled_script() -> Result<PathBuf, ConfigError> {
    let exe = std::env::current_exe().map_err(ConfigError::ScriptLocation)?;
    let dir = exe.parent().unwrap_or_else(|| Path::new("."));
    Ok(dir.join(BUNDLED_SCRIPT))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
