//! Dataset registry and in-memory table handling
//!
//! The registry is a collaborator of the engine: it resolves an opaque
//! [`DatasetRef`] either into an in-memory [`Table`] or into a pair of file
//! paths whose reading is deferred to the adapter. [`DirRegistry`] is the
//! bundled filesystem-backed implementation; anything else can be plugged in
//! behind [`DatasetRegistry`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::DriftError;

/// Suffix of label files next to their dataset file
const LABEL_FILE_SUFFIX: &str = ".labels.csv";

// ============================================================================
// DATASET REFERENCE
// ============================================================================

/// Opaque key identifying a dataset within a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetRef {
    pub collection: String,
    pub name: String,
}

impl DatasetRef {
    pub fn new(collection: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.name)
    }
}

// ============================================================================
// TABLE AND SERIES DATA
// ============================================================================

/// Fully materialized numeric dataset table
///
/// Column layout convention: timestamp first, feature column(s) in the
/// middle, ground-truth label last.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    rows: Vec<Vec<f64>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }
}

/// Feature data handed to an in-process algorithm
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesData {
    /// Single feature column
    Univariate(Vec<f64>),
    /// One row per timestep, one entry per feature column
    Multivariate(Vec<Vec<f64>>),
}

impl SeriesData {
    /// Number of timesteps
    pub fn len(&self) -> usize {
        match self {
            SeriesData::Univariate(values) => values.len(),
            SeriesData::Multivariate(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split a loaded table into feature data and the label column.
///
/// More than three columns is a multivariate slice (everything between the
/// timestamp and the label), exactly three columns is a single feature
/// column, anything else is an unexpected shape.
pub fn split_series(table: &Table, dataset: &DatasetRef) -> Result<(SeriesData, Vec<f64>), DriftError> {
    let columns = table.n_columns();
    if columns < 3 {
        return Err(DriftError::DatasetShape {
            dataset: dataset.to_string(),
            rows: table.n_rows(),
            columns,
        });
    }

    let labels: Vec<f64> = table.rows().iter().map(|row| row[columns - 1]).collect();
    let series = if columns > 3 {
        SeriesData::Multivariate(
            table
                .rows()
                .iter()
                .map(|row| row[1..columns - 1].to_vec())
                .collect(),
        )
    } else {
        SeriesData::Univariate(table.rows().iter().map(|row| row[1]).collect())
    };

    Ok((series, labels))
}

// ============================================================================
// FILE READING
// ============================================================================

/// Read a CSV file into a [`Table`], skipping a non-numeric header line.
pub fn read_table(path: &Path) -> Result<Table, DriftError> {
    let text = fs::read_to_string(path)?;
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed: Result<Vec<f64>, _> = line
            .split(',')
            .map(|field| field.trim().parse::<f64>())
            .collect();
        match parsed {
            Ok(row) => {
                if let Some(first) = rows.first() {
                    if row.len() != first.len() {
                        return Err(DriftError::Execution(format!(
                            "ragged CSV line {} in '{}': expected {} fields, got {}",
                            lineno + 1,
                            path.display(),
                            first.len(),
                            row.len()
                        )));
                    }
                }
                rows.push(row);
            }
            // First line may be a header
            Err(e) if lineno > 0 => {
                return Err(DriftError::Execution(format!(
                    "malformed CSV line {} in '{}': {}",
                    lineno + 1,
                    path.display(),
                    e
                )))
            }
            Err(_) => {}
        }
    }

    Ok(Table::new(rows))
}

/// Read a flat numeric vector, one value per line.
///
/// Used for the container scores artifact and for standalone label files.
/// A missing or malformed file is a hard read error, never an empty vector.
pub fn read_vector(path: &Path) -> Result<Vec<f64>, DriftError> {
    let text = fs::read_to_string(path).map_err(|e| DriftError::ResultRead {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;

    let mut values = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value = line.trim().parse::<f64>().map_err(|e| DriftError::ResultRead {
            path: path.to_path_buf(),
            details: format!("line {}: {}", lineno + 1, e),
        })?;
        values.push(value);
    }

    if values.is_empty() {
        return Err(DriftError::ResultRead {
            path: path.to_path_buf(),
            details: "file contains no values".to_string(),
        });
    }
    Ok(values)
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Resolves dataset references into tables or file paths
pub trait DatasetRegistry: Send + Sync {
    /// Materialize the full dataset table in memory
    fn load(&self, dataset: &DatasetRef) -> Result<Table, DriftError>;

    /// Resolve the dataset into (data file, optional label file)
    fn paths(&self, dataset: &DatasetRef) -> Result<(PathBuf, Option<PathBuf>), DriftError>;
}

/// Filesystem-backed registry with a `<root>/<collection>/<name>.csv` layout
pub struct DirRegistry {
    root: PathBuf,
}

impl DirRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn data_path(&self, dataset: &DatasetRef) -> PathBuf {
        self.root
            .join(&dataset.collection)
            .join(format!("{}.csv", dataset.name))
    }

    fn label_path(&self, dataset: &DatasetRef) -> PathBuf {
        self.root
            .join(&dataset.collection)
            .join(format!("{}{}", dataset.name, LABEL_FILE_SUFFIX))
    }

    /// Discover all datasets under the registry root
    pub fn list(&self) -> Vec<DatasetRef> {
        let mut found = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(2)
            .max_depth(2)
            .into_iter()
            .filter_map(Result::ok)
        {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy();
            if !name.ends_with(".csv") || name.ends_with(LABEL_FILE_SUFFIX) {
                continue;
            }
            let collection = path
                .parent()
                .and_then(Path::file_name)
                .map(|c| c.to_string_lossy().into_owned());
            if let Some(collection) = collection {
                found.push(DatasetRef::new(collection, name.trim_end_matches(".csv")));
            }
        }
        found.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        found
    }
}

impl DatasetRegistry for DirRegistry {
    fn load(&self, dataset: &DatasetRef) -> Result<Table, DriftError> {
        read_table(&self.data_path(dataset))
    }

    fn paths(&self, dataset: &DatasetRef) -> Result<(PathBuf, Option<PathBuf>), DriftError> {
        let data = self.data_path(dataset);
        if !data.exists() {
            return Err(DriftError::Execution(format!(
                "dataset '{}' not found at {}",
                dataset,
                data.display()
            )));
        }
        let labels = self.label_path(dataset);
        Ok((data, labels.exists().then_some(labels)))
    }
}
