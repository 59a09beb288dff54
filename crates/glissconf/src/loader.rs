//! Config file discovery, layering, and environment variable overlay.

use crate::{ConfigError, GlissConfig, PlaybackMode};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/glissando/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("glissando/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // An explicit path is pushed even if missing so loading reports it.
    if let Some(path) = cli_path {
        files.push(expand_path(&path.to_string_lossy()));
        return files;
    }

    let local = PathBuf::from("glissando.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read one config file as a raw TOML table.
///
/// The table is also checked against the config schema so that a bad value
/// is reported against the file that holds it.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_table(&contents, path)
}

fn parse_table(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    let parse_error = |e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let table: toml::Table = contents.parse().map_err(parse_error)?;
    toml::Value::Table(table.clone())
        .try_into::<GlissConfig>()
        .map_err(parse_error)?;

    Ok(table)
}

pub(crate) fn from_table(table: toml::Table, path: &Path) -> Result<GlissConfig, ConfigError> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Deep-merge `overlay` into `base`; keys in `overlay` win, nested tables
/// merge key by key.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Apply `GLISSANDO_*` (and `RUST_LOG`) overrides from the process environment.
pub fn apply_env_overrides(config: &mut GlissConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Apply overrides from any variable lookup.
///
/// Values that do not parse are skipped and not recorded as overrides.
pub fn apply_overrides_from<F>(config: &mut GlissConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut apply = |key: &str, set: &mut dyn FnMut(String) -> bool| {
        if let Some(v) = lookup(key) {
            if set(v) {
                sources.env_overrides.push(key.to_string());
            }
        }
    };

    apply("GLISSANDO_TEMPO", &mut |v| match v.trim().parse() {
        Ok(tempo) => {
            config.playback.tempo = tempo;
            true
        }
        Err(_) => false,
    });
    apply("GLISSANDO_LEAD_IN", &mut |v| match v.trim().parse() {
        Ok(seconds) => {
            config.playback.lead_in_seconds = seconds;
            true
        }
        Err(_) => false,
    });
    apply("GLISSANDO_LOOP", &mut |v| match parse_bool(&v) {
        Some(looping) => {
            config.playback.looping = looping;
            true
        }
        None => false,
    });
    apply("GLISSANDO_MODE", &mut |v| match v.parse::<PlaybackMode>() {
        Ok(mode) => {
            config.playback.mode = mode;
            true
        }
        Err(_) => false,
    });
    apply("GLISSANDO_SAMPLE_RATE", &mut |v| match v.trim().parse() {
        Ok(rate) => {
            config.playback.sample_rate = rate;
            true
        }
        Err(_) => false,
    });
    apply("GLISSANDO_LOG_LEVEL", &mut |v| {
        config.telemetry.log_level = v;
        true
    });
    // RUST_LOG wins over GLISSANDO_LOG_LEVEL
    apply("RUST_LOG", &mut |v| {
        config.telemetry.log_level = v;
        true
    });
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // $VAR/rest/of/path
        let (var_name, rest) = stripped.split_once('/').unwrap_or((stripped, ""));
        if let Ok(var_value) = env::var(var_name) {
            let base = PathBuf::from(var_value);
            return if rest.is_empty() { base } else { base.join(rest) };
        }
    }

    PathBuf::from(path)
}
