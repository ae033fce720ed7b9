//! Configuration loading
//!
//! Layers, lowest priority first: the embedded defaults, the global
//! `~/.coco/config.toml`, the project `.coco` file in the working directory,
//! then `COCO__SECTION__KEY` environment variables.

use anyhow::{Context, Result};
use coco_core::{coco_home, CocoConfig};
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Name of the per-project settings file
pub const PROJECT_FILE: &str = ".coco";

/// Global settings file
pub fn global_config_path() -> PathBuf {
    coco_home().join("config.toml")
}

/// Project settings file for `root`
pub fn project_config_path(root: &Path) -> PathBuf {
    root.join(PROJECT_FILE)
}

/// Load configuration for a working directory
pub fn load_config(root: &Path) -> Result<CocoConfig> {
    load_layers(&global_config_path(), &project_config_path(root))
}

fn load_layers(global: &Path, project: &Path) -> Result<CocoConfig> {
    let config = Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        .add_source(File::from(global).format(FileFormat::Toml).required(false))
        .add_source(File::from(project).format(FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix("COCO")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults_match_typed_defaults() {
        let parsed: CocoConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed, CocoConfig::default());
    }

    #[test]
    fn test_project_file_overrides_global() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("config.toml");
        let project = dir.path().join(".coco");
        std::fs::write(&global, "[model]\nsimple_model = \"global-small\"\n[agent]\nmax_steps = 4\n")
            .unwrap();
        std::fs::write(&project, "[agent]\nmax_steps = 12\n[safety]\nconfirm_file_writes = false\n")
            .unwrap();

        let config = load_layers(&global, &project).unwrap();

        assert_eq!(config.model.simple_model, "global-small");
        assert_eq!(config.agent.max_steps, 12);
        assert!(!config.safety.confirm_file_writes);
        assert!(config.safety.confirm_shell_commands);
        assert_eq!(config.memory.max_token_limit, 4000);
    }

    #[test]
    fn test_missing_files_are_optional() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_layers(&dir.path().join("none.toml"), &dir.path().join(".coco")).unwrap();
        assert_eq!(config.index.query_results, 5);
    }
}
