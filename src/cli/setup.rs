//! `/setup`: per-repository model and safety choices
//!
//! Answers are merged into the project `.coco` file; keys the wizard does
//! not ask about are left as they were.

use super::prompts;
use crate::settings::project_config_path;
use anyhow::{Context, Result};
use coco_core::CocoConfig;
use std::path::{Path, PathBuf};

/// Values collected by the wizard
#[derive(Debug, Clone, PartialEq)]
pub struct SetupChoices {
    pub complex_model: String,
    pub simple_model: String,
    pub confirm_file_writes: bool,
    pub confirm_shell_commands: bool,
}

impl SetupChoices {
    fn from_config(config: &CocoConfig) -> Self {
        Self {
            complex_model: config.model.complex_model.clone(),
            simple_model: config.model.simple_model.clone(),
            confirm_file_writes: config.safety.confirm_file_writes,
            confirm_shell_commands: config.safety.confirm_shell_commands,
        }
    }
}

/// Ask for each setting (current values as defaults) and save them
pub fn run(root: &Path, config: &CocoConfig) -> Result<PathBuf> {
    let current = SetupChoices::from_config(config);
    let choices = SetupChoices {
        complex_model: prompts::text("Model for editing and planning:", &current.complex_model)?,
        simple_model: prompts::text("Model for questions and routing:", &current.simple_model)?,
        confirm_file_writes: prompts::confirm(
            "Ask before writing files?",
            current.confirm_file_writes,
            None,
        )?,
        confirm_shell_commands: prompts::confirm(
            "Ask before running commands?",
            current.confirm_shell_commands,
            None,
        )?,
    };
    save(root, &choices)
}

/// Merge `choices` into the project file
pub fn save(root: &Path, choices: &SetupChoices) -> Result<PathBuf> {
    let path = project_config_path(root);
    let mut doc: toml::Table = match std::fs::read_to_string(&path) {
        Ok(text) => text
            .parse()
            .with_context(|| format!("{} is not valid TOML", path.display()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => toml::Table::new(),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };

    let model = section(&mut doc, "model")?;
    model.insert("complex_model".into(), choices.complex_model.clone().into());
    model.insert("simple_model".into(), choices.simple_model.clone().into());

    let safety = section(&mut doc, "safety")?;
    safety.insert("confirm_file_writes".into(), choices.confirm_file_writes.into());
    safety.insert("confirm_shell_commands".into(), choices.confirm_shell_commands.into());

    let text = toml::to_string_pretty(&doc).context("Failed to serialize settings")?;
    std::fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "Project settings saved");
    Ok(path)
}

fn section<'a>(doc: &'a mut toml::Table, name: &str) -> Result<&'a mut toml::Table> {
    doc.entry(name)
        .or_insert(toml::Value::Table(toml::Table::new()))
        .as_table_mut()
        .with_context(|| format!("[{name}] in the project file is not a table"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::load_config;

    fn choices() -> SetupChoices {
        SetupChoices {
            complex_model: "claude-big".to_string(),
            simple_model: "claude-small".to_string(),
            confirm_file_writes: false,
            confirm_shell_commands: true,
        }
    }

    #[test]
    fn test_save_creates_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = save(dir.path(), &choices()).unwrap();
        assert_eq!(path, dir.path().join(".coco"));

        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.model.complex_model, "claude-big");
        assert_eq!(config.model.simple_model, "claude-small");
        assert!(!config.safety.confirm_file_writes);
    }

    #[test]
    fn test_save_keeps_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".coco"),
            "[index]\nchunk_size = 500\n\n[model]\ntemperature = 0.3\n",
        )
        .unwrap();

        save(dir.path(), &choices()).unwrap();
        let doc: toml::Table = std::fs::read_to_string(dir.path().join(".coco"))
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(doc["index"]["chunk_size"].as_integer(), Some(500));
        assert_eq!(doc["model"]["temperature"].as_float(), Some(0.3));
        assert_eq!(doc["model"]["complex_model"].as_str(), Some("claude-big"));
    }

    #[test]
    fn test_save_rejects_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".coco"), "model = [").unwrap();
        assert!(save(dir.path(), &choices()).is_err());
    }
}
