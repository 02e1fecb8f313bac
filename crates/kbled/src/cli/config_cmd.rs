//! `config` subcommand — show current configuration and file path.

use std::path::{Path, PathBuf};

use super::{Config, ConfigOutput, Result, kv, kv_indent, kv_width};

/// Write a default config file at `path` unless one already exists.
/// Returns true if a file was written.
fn init_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    Config::default().save_to(path)?;
    Ok(true)
}

pub(super) fn cmd_config(json: bool, init: bool, custom_path: Option<&Path>) -> Result<()> {
    let config_path: Option<PathBuf> = custom_path.map(|p| p.to_path_buf()).or_else(Config::path);

    if init {
        match &config_path {
            Some(p) if init_config(p)? => log::info!("wrote default config to {}", p.display()),
            Some(p) => log::warn!("{} already exists, leaving it untouched", p.display()),
            None => {
                return Err(kbled_lib::KbledError::Config(
                    "no config directory on this platform".into(),
                ));
            }
        }
    }

    let config = super::load_config(config_path.as_deref());
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());

    if json {
        let output = ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            settings: config,
        };
        let json_str = serde_json::to_string_pretty(&output).map_err(|e| {
            kbled_lib::KbledError::Config(format!("JSON serialization failed: {e}"))
        })?;
        println!("{json_str}");
        return Ok(());
    }

    // Human-readable output
    let w = kv_width(&["Config file:"], &["device_filter:", "verbose:"]);

    match &config_path {
        Some(p) if config_exists => kv("Config file:", format_args!("{} (loaded)", p.display()), w),
        Some(p) => kv(
            "Config file:",
            format_args!("{} (not found, using defaults)", p.display()),
            w,
        ),
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    println!("Settings:");
    let filter_label = if config.device_filter.trim().is_empty() {
        "(all keyboards)"
    } else {
        config.device_filter.as_str()
    };
    kv_indent("device_filter:", filter_label, w);
    kv_indent("verbose:", config.verbose, w);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmd_config_with_missing_file_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(cmd_config(false, false, Some(&path)).is_ok());
        assert!(cmd_config(true, false, Some(&path)).is_ok());
        assert!(!path.exists());
    }

    #[test]
    fn init_writes_defaults_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kbled").join("config.toml");

        assert!(init_config(&path).unwrap());
        let (config, warnings) = Config::load_from(&path);
        assert!(warnings.is_empty());
        assert_eq!(config, Config::default());

        std::fs::write(&path, "verbose = true\n").unwrap();
        assert!(!init_config(&path).unwrap());
        let (config, _) = Config::load_from(&path);
        assert!(config.verbose);
    }

    #[test]
    fn cmd_config_init_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        cmd_config(false, true, Some(&path)).unwrap();
        assert!(path.exists());
    }
}
