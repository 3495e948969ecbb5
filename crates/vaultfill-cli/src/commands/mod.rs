pub mod completion;
pub mod detect;
pub mod fill;
pub mod generate;
pub mod watch;

use anyhow::{Context, Result};
use std::path::Path;
use vaultfill_core::Settings;

/// Settings from `--config` when given, defaults otherwise
pub fn load_settings(config: Option<&Path>) -> Result<Settings> {
    match config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Ok(Settings::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_config() {
        let settings = load_settings(None).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_bad_config_names_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = load_settings(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to load settings"));
    }
}
