//! YAML portfolio files
//!
//! Directory structure:
//! ~/.flowplan/
//!   flowplan.log
//!   portfolios/
//!     household.yaml
//!     household.optimized.yaml

use std::fs;
use std::path::{Path, PathBuf};

use flowplan_core::optimization::GeneticConfig;
use flowplan_core::{AccountSnapshot, SimulationSettings};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything needed to run or optimize one portfolio.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PortfolioFile {
    #[serde(default)]
    pub settings: SimulationSettings,

    #[serde(default)]
    pub accounts: Vec<AccountSnapshot>,

    /// Optimizer tuning; defaults apply to anything left out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimizer: Option<GeneticConfig>,
}

impl PortfolioFile {
    pub fn from_yaml(content: &str) -> Result<Self, StorageError> {
        serde_saphyr::from_str(content).map_err(|e| StorageError::Parse(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String, StorageError> {
        serde_saphyr::to_string(self).map_err(|e| StorageError::Serialize(e.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse portfolio YAML: {0}")]
    Parse(String),
    #[error("failed to serialize portfolio YAML: {0}")]
    Serialize(String),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub fn load_portfolio(path: &Path) -> Result<PortfolioFile, StorageError> {
    let content = fs::read_to_string(path).map_err(io_error(path))?;
    let file = PortfolioFile::from_yaml(&content)?;
    tracing::debug!(path = %path.display(), accounts = file.accounts.len(), "portfolio loaded");
    Ok(file)
}

pub fn save_portfolio(path: &Path, file: &PortfolioFile) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let yaml = file.to_yaml()?;
    fs::write(path, yaml).map_err(io_error(path))?;
    tracing::debug!(path = %path.display(), "portfolio saved");
    Ok(())
}

/// The per-user data directory.
pub struct DataDirectory {
    root: PathBuf,
}

impl DataDirectory {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// `~/.flowplan/`, or `./.flowplan/` without a home directory
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".flowplan")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn portfolios_dir(&self) -> PathBuf {
        self.root.join("portfolios")
    }

    pub fn portfolio_path(&self, name: &str) -> PathBuf {
        self.portfolios_dir()
            .join(format!("{}.yaml", sanitize_filename(name)))
    }

    pub fn init(&self) -> Result<(), StorageError> {
        let dir = self.portfolios_dir();
        fs::create_dir_all(&dir).map_err(io_error(&dir))
    }

    /// Resolve a command-line argument: an existing path wins, otherwise it
    /// names a portfolio in the data directory.
    pub fn resolve(&self, name_or_path: &str) -> PathBuf {
        let path = PathBuf::from(name_or_path);
        if path.exists() {
            path
        } else {
            self.portfolio_path(name_or_path)
        }
    }

    /// Names of the saved portfolios, sorted.
    pub fn list(&self) -> Result<Vec<String>, StorageError> {
        let dir = self.portfolios_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = fs::read_dir(&dir)
            .map_err(io_error(&dir))?
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "yaml" || ext == "yml") {
                    path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
                } else {
                    None
                }
            })
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Sanitize a filename to be safe for the filesystem
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ' ' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowplan_core::{Frequency, InstrumentKind, YearMonth};
    use tempfile::TempDir;

    fn sample() -> PortfolioFile {
        PortfolioFile {
            settings: SimulationSettings {
                age: 35,
                ..Default::default()
            },
            accounts: vec![
                AccountSnapshot::new(InstrumentKind::Salary, "Job", YearMonth::new(2025, 1), YearMonth::new(2030, 12))
                    .balance(6_000.0)
                    .transfer("Checking", Frequency::Monthly, 20.0, 0.0),
                AccountSnapshot::new(InstrumentKind::Cash, "Checking", YearMonth::new(2025, 1), YearMonth::new(2030, 12)),
            ],
            optimizer: None,
        }
    }

    #[test]
    fn test_save_and_load_portfolio() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("plan.yaml");

        save_portfolio(&path, &sample()).unwrap();
        let loaded = load_portfolio(&path).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let yaml = "accounts:\n  - kind: cash\n    name: Checking\n    start: { year: 2025, month: 1 }\n    finish: { year: 2025, month: 12 }\n";
        let file = PortfolioFile::from_yaml(yaml).unwrap();
        assert_eq!(file.settings, SimulationSettings::default());
        assert_eq!(file.accounts.len(), 1);
        assert!(file.accounts[0].transfers.is_empty());
        assert!(file.optimizer.is_none());
    }

    #[test]
    fn test_load_errors() {
        let temp_dir = TempDir::new().unwrap();
        let missing = load_portfolio(&temp_dir.path().join("absent.yaml"));
        assert!(matches!(missing, Err(StorageError::Io { .. })));

        let path = temp_dir.path().join("broken.yaml");
        fs::write(&path, "accounts: [ {kind: spaceship} ]").unwrap();
        assert!(matches!(load_portfolio(&path), Err(StorageError::Parse(_))));
    }

    #[test]
    fn test_data_directory_lists_and_resolves() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = DataDirectory::new(temp_dir.path().join(".flowplan"));
        assert!(data_dir.list().unwrap().is_empty());

        data_dir.init().unwrap();
        save_portfolio(&data_dir.portfolio_path("household"), &sample()).unwrap();
        save_portfolio(&data_dir.portfolio_path("alt/plan"), &sample()).unwrap();

        assert_eq!(data_dir.list().unwrap(), vec!["alt_plan", "household"]);
        assert_eq!(data_dir.resolve("household"), data_dir.portfolio_path("household"));

        let explicit = temp_dir.path().join("elsewhere.yaml");
        fs::write(&explicit, "").unwrap();
        assert_eq!(data_dir.resolve(explicit.to_str().unwrap()), explicit);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("simple"), "simple");
        assert_eq!(sanitize_filename("with spaces"), "with spaces");
        assert_eq!(sanitize_filename("with/slash"), "with_slash");
        assert_eq!(sanitize_filename("test:colon"), "test_colon");
    }
}
