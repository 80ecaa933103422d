use crate::errors::{FormError, Result};
use crate::types::{Credentials, ManualLoginDetails};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Tabular test data and flat key/value settings the scenarios read.
///
/// Rows are addressed the way a spreadsheet is: row 0 is the header, data
/// starts at row 1.
pub trait DataSource: Send + Sync {
    fn value(&self, dataset: &str, row: usize, column: usize) -> Result<String>;

    fn config(&self, key: &str) -> Result<String>;

    /// Username and password from columns 0 and 1 of `row`.
    fn credentials(&self, dataset: &str, row: usize) -> Result<Credentials> {
        Ok(Credentials {
            username: self.value(dataset, row, 0)?,
            password: self.value(dataset, row, 1)?,
        })
    }

    fn manual_login_details(&self) -> Result<ManualLoginDetails> {
        Ok(ManualLoginDetails {
            entity_id: self.config("ENTITY_ID")?,
            user_id: self.config("USER_ID")?,
            role: self.config("ROLE")?,
            full_name: self.config("FULL_NAME")?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryDataSource {
    #[serde(default)]
    datasets: HashMap<String, Vec<Vec<String>>>,
    #[serde(default)]
    config: HashMap<String, String>,
}

impl MemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row to `dataset`, creating it on first use.
    pub fn with_row<I, S>(mut self, dataset: &str, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.datasets
            .entry(dataset.to_string())
            .or_default()
            .push(cells.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_config(mut self, key: &str, value: impl Into<String>) -> Self {
        self.config.insert(key.to_string(), value.into());
        self
    }
}

impl DataSource for MemoryDataSource {
    fn value(&self, dataset: &str, row: usize, column: usize) -> Result<String> {
        let rows = self
            .datasets
            .get(dataset)
            .ok_or_else(|| FormError::DataNotFound(format!("dataset '{}'", dataset)))?;
        rows.get(row)
            .and_then(|cells| cells.get(column))
            .cloned()
            .ok_or_else(|| {
                FormError::DataNotFound(format!("{} row {} column {}", dataset, row, column))
            })
    }

    fn config(&self, key: &str) -> Result<String> {
        self.config
            .get(key)
            .cloned()
            .ok_or_else(|| FormError::DataNotFound(format!("config key '{}'", key)))
    }
}

/// Data loaded from a JSON document:
/// `{"datasets": {"Name": [["header"], ["cell"]]}, "config": {"KEY": "value"}}`.
#[derive(Debug, Clone)]
pub struct JsonDataSource {
    path: PathBuf,
    data: MemoryDataSource,
}

impl JsonDataSource {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let data: MemoryDataSource = serde_json::from_str(&raw)?;
        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for JsonDataSource {
    fn value(&self, dataset: &str, row: usize, column: usize) -> Result<String> {
        self.data.value(dataset, row, column)
    }

    fn config(&self, key: &str) -> Result<String> {
        self.data.config(key)
    }
}
