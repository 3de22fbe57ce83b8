//! Data validation utilities.

use std::path::{Path, PathBuf};

use bastion_core::config::BalanceConfig;
use bastion_core::data::Catalog;
use bastion_core::simulation::Game;
use serde::Serialize;

use crate::data_dir::{read_to_string, BALANCE_FILE, CATALOG_FILE};
use crate::error::{Result, ToolError};

/// Outcome for one data file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    /// File checked.
    pub path: PathBuf,
    /// Problems found; empty when the file is valid.
    pub problems: Vec<String>,
}

/// Outcome of validating a data directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// One entry per file present.
    pub files: Vec<FileReport>,
    /// Problems starting a game from the combined data.
    pub startup_problems: Vec<String>,
}

impl ValidationReport {
    /// No problems anywhere.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.startup_problems.is_empty() && self.files.iter().all(|f| f.problems.is_empty())
    }

    /// Every problem, prefixed with its source.
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        self.files
            .iter()
            .flat_map(|f| f.problems.iter().map(move |p| format!("{}: {p}", f.path.display())))
            .chain(self.startup_problems.iter().map(|p| format!("startup: {p}")))
            .collect()
    }
}

fn problems_of(err: bastion_core::error::GameError) -> Vec<String> {
    match err {
        bastion_core::error::GameError::ValidationError { errors } => errors,
        other => vec![other.to_string()],
    }
}

/// Validate all RON data files in a directory.
///
/// Parse and validation problems end up in the report; only IO failures
/// and an empty directory are errors.
///
/// # Errors
///
/// Returns an error if a file cannot be read or no data file is present.
pub fn validate_data_directory(path: &Path) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();
    let mut catalog = Some(Catalog::standard());
    let mut config = Some(BalanceConfig::default());

    let catalog_path = path.join(CATALOG_FILE);
    if catalog_path.exists() {
        let source = read_to_string(&catalog_path)?;
        match Catalog::from_ron_str(&source, CATALOG_FILE) {
            Ok(c) => {
                report.files.push(FileReport {
                    path: catalog_path,
                    problems: Vec::new(),
                });
                catalog = Some(c);
            }
            Err(e) => {
                report.files.push(FileReport {
                    path: catalog_path,
                    problems: problems_of(e),
                });
                catalog = None;
            }
        }
    }

    let balance_path = path.join(BALANCE_FILE);
    if balance_path.exists() {
        let source = read_to_string(&balance_path)?;
        match BalanceConfig::from_ron_str(&source, BALANCE_FILE) {
            Ok(c) => {
                report.files.push(FileReport {
                    path: balance_path,
                    problems: Vec::new(),
                });
                config = Some(c);
            }
            Err(e) => {
                report.files.push(FileReport {
                    path: balance_path,
                    problems: problems_of(e),
                });
                config = None;
            }
        }
    }

    if report.files.is_empty() {
        return Err(ToolError::NoDataFiles(path.to_path_buf()));
    }

    if let (Some(catalog), Some(config)) = (catalog, config) {
        report.startup_problems = startup_problems(catalog, config);
    }

    for problem in report.problems() {
        tracing::warn!("{problem}");
    }
    Ok(report)
}

/// Start a game from the data and run the invariant checks on it.
fn startup_problems(catalog: Catalog, config: BalanceConfig) -> Vec<String> {
    if !catalog.buildings().any(|b| b.unlock_wave() <= 1) {
        return vec!["no building is unlocked at the start".to_string()];
    }
    match Game::new(config, catalog, 0) {
        Ok(game) => {
            let mut problems = game.validate_invariants();
            if game.combat().current_enemy.is_none() {
                problems.push("no enemy spawns on wave 1".to_string());
            }
            problems
        }
        Err(e) => problems_of(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_dir::{write, DataSet};

    #[test]
    fn test_exported_defaults_validate() {
        let dir = tempfile::tempdir().unwrap();
        DataSet::default().export(dir.path()).unwrap();
        let report = validate_data_directory(dir.path()).unwrap();
        assert_eq!(report.files.len(), 2);
        assert!(report.is_ok(), "{:?}", report.problems());
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            validate_data_directory(dir.path()),
            Err(ToolError::NoDataFiles(_))
        ));
    }

    #[test]
    fn test_invalid_balance_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BalanceConfig::default();
        config.waves.boss_interval = 0;
        config.builders.starting_builders = config.builders.max_builders + 1;
        let source = ron::ser::to_string(&config).unwrap();
        write(&dir.path().join(BALANCE_FILE), &source).unwrap();

        let report = validate_data_directory(dir.path()).unwrap();
        assert!(!report.is_ok());
        assert_eq!(report.files[0].problems.len(), 2);
        assert!(report.startup_problems.is_empty());
    }

    #[test]
    fn test_unparseable_catalog_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join(CATALOG_FILE), "not ron at all").unwrap();
        let report = validate_data_directory(dir.path()).unwrap();
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].problems.len(), 1);
        assert!(report.problems()[0].contains(CATALOG_FILE));
    }
}
