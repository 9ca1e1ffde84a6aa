//! Code related to CLI interface for managing the settings file
use crate::settings::{Settings, get_settings_file_path};
use anyhow::{Context, Result, ensure};
use clap::Subcommand;
use std::fs;
use std::path::Path;

/// Subcommands for settings
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Get the path to where the settings file is read from
    Path,
    /// Write the contents of a placeholder `settings.toml` to the console
    DumpDefault,
    /// Create a placeholder settings file, if one does not already exist
    Init,
}

impl SettingsSubcommands {
    /// Execute the supplied settings subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Path => handle_path_command(),
            Self::DumpDefault => handle_dump_default_command()?,
            Self::Init => handle_init_command(&get_settings_file_path())?,
        }

        Ok(())
    }
}

/// Handle the `path` command
fn handle_path_command() {
    println!("{}", get_settings_file_path().display());
}

/// Handle the `dump-default` command
fn handle_dump_default_command() -> Result<()> {
    print!("{}", Settings::default_file_contents()?);
    Ok(())
}

/// Handle the `init` command
fn handle_init_command(file_path: &Path) -> Result<()> {
    ensure!(
        !file_path.exists(),
        "Settings file already exists: {}",
        file_path.display()
    );

    if let Some(dir_path) = file_path.parent() {
        // Create parent directory
        fs::create_dir_all(dir_path)
            .with_context(|| format!("Failed to create directory: {}", dir_path.display()))?;
    }

    // Create placeholder settings file
    fs::write(file_path, Settings::default_file_contents()?)?;
    println!("Created settings file: {}", file_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_handle_init_command() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("gridcast").join("settings.toml");
        handle_init_command(&file_path).unwrap();
        assert!(file_path.is_file());

        // Existing files are left alone
        assert!(handle_init_command(&file_path).is_err());
    }
}
