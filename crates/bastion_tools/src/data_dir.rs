//! Data directory layout.
//!
//! A data directory holds up to two RON files. Either may be missing, in
//! which case the built-in defaults are used.

use std::fs;
use std::path::{Path, PathBuf};

use bastion_core::config::BalanceConfig;
use bastion_core::data::Catalog;

use crate::error::{Result, ToolError};

/// Building, enemy, synergy and upgrade tables.
pub const CATALOG_FILE: &str = "catalog.ron";
/// Balance tunables.
pub const BALANCE_FILE: &str = "balance.ron";

/// Catalog and balance loaded together.
#[derive(Debug, Clone)]
pub struct DataSet {
    /// Static tables.
    pub catalog: Catalog,
    /// Balance tunables.
    pub config: BalanceConfig,
}

impl Default for DataSet {
    fn default() -> Self {
        Self {
            catalog: Catalog::standard(),
            config: BalanceConfig::default(),
        }
    }
}

impl DataSet {
    /// Load from `dir`, or the built-in data when `dir` is `None`.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let Some(dir) = dir else {
            return Ok(Self::default());
        };
        let mut data = Self::default();
        let catalog_path = dir.join(CATALOG_FILE);
        if catalog_path.exists() {
            let source = read_to_string(&catalog_path)?;
            data.catalog = Catalog::from_ron_str(&source, &catalog_path.display().to_string())?;
        }
        let balance_path = dir.join(BALANCE_FILE);
        if balance_path.exists() {
            let source = read_to_string(&balance_path)?;
            data.config = BalanceConfig::from_ron_str(&source, &balance_path.display().to_string())?;
        }
        tracing::debug!(dir = %dir.display(), "Loaded data set");
        Ok(data)
    }

    /// Write both files into `dir`, creating it if needed.
    ///
    /// Returns the paths written.
    pub fn export(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|e| ToolError::io(dir, e))?;
        let catalog_path = dir.join(CATALOG_FILE);
        write(&catalog_path, &self.catalog.to_ron_string()?)?;
        let balance_path = dir.join(BALANCE_FILE);
        write(&balance_path, &self.config.to_ron_string()?)?;
        Ok(vec![catalog_path, balance_path])
    }
}

pub(crate) fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| ToolError::io(path, e))
}

pub(crate) fn write(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| ToolError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dir_uses_defaults() {
        let data = DataSet::load(None).unwrap();
        assert!(data.catalog.building("scrap_collector").is_some());
    }

    #[test]
    fn test_export_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let written = DataSet::default().export(dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|p| p.exists()));

        let loaded = DataSet::load(Some(dir.path())).unwrap();
        assert_eq!(loaded.config, BalanceConfig::default());
        assert_eq!(
            loaded.catalog.buildings().count(),
            Catalog::standard().buildings().count()
        );
    }

    #[test]
    fn test_partial_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BalanceConfig::default();
        config.prestige.min_prestige_wave = 30;
        write(&dir.path().join(BALANCE_FILE), &config.to_ron_string().unwrap()).unwrap();

        let loaded = DataSet::load(Some(dir.path())).unwrap();
        assert_eq!(loaded.config.prestige.min_prestige_wave, 30);
        assert!(loaded.catalog.building("turret").is_some());
    }

    #[test]
    fn test_broken_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join(CATALOG_FILE), "(buildings: [").unwrap();
        let err = DataSet::load(Some(dir.path())).unwrap_err();
        assert!(err.to_string().contains(CATALOG_FILE));
    }
}
