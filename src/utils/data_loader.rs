//! Data loading and artifact persistence

use crate::error::{AuditError, Result};
use crate::table::Table;
use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Loader for source tables
pub struct DataLoader {
    /// Number of rows used for schema inference
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: None,
        }
    }

    /// Set the number of rows used to infer column dtypes (`None` scans all rows)
    pub fn with_infer_schema_length(mut self, n: Option<usize>) -> Self {
        self.infer_schema_length = n;
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: &Path) -> Result<Table> {
        if !path.exists() {
            return Err(AuditError::SourceNotFound {
                path: path.display().to_string(),
            });
        }
        let file = File::open(path)?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .into_reader_with_file_handle(file)
            .finish()?;

        Ok(Table::new(df))
    }

    /// Load a Parquet file
    pub fn load_parquet(&self, path: &Path) -> Result<DataFrame> {
        if !path.exists() {
            return Err(AuditError::SourceNotFound {
                path: path.display().to_string(),
            });
        }
        let file = File::open(path)?;
        Ok(ParquetReader::new(file).finish()?)
    }
}

/// Writes artifacts atomically: the content goes to a temporary file in the
/// destination directory which is then renamed over the final path.
pub struct DataSaver;

impl DataSaver {
    /// Save a frame as Parquet
    pub fn save_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
        let mut tmp = Self::staging_file(path)?;
        ParquetWriter::new(tmp.as_file_mut()).finish(df)?;
        Self::commit(tmp, path)
    }

    /// Save any serializable value as pretty-printed JSON
    pub fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
        let mut tmp = Self::staging_file(path)?;
        let json = serde_json::to_string_pretty(value)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        Self::commit(tmp, path)
    }

    fn staging_file(path: &Path) -> Result<NamedTempFile> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        Ok(NamedTempFile::new_in(dir)?)
    }

    fn commit(tmp: NamedTempFile, path: &Path) -> Result<()> {
        tmp.persist(path).map_err(|e| AuditError::IoError(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_csv(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("data.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "a,b,c").unwrap();
        writeln!(file, "1,x,3").unwrap();
        writeln!(file, "4,?,6").unwrap();
        writeln!(file, "7,y,").unwrap();
        path
    }

    #[test]
    fn test_load_csv() {
        let dir = TempDir::new().unwrap();
        let path = create_test_csv(&dir);
        let table = DataLoader::new().load_csv(&path).unwrap();

        assert_eq!(table.height(), 3);
        assert_eq!(table.width(), 3);
        assert_eq!(table.numeric_values("c").unwrap()[2], None);
    }

    #[test]
    fn test_late_text_value_keeps_column_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("late.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "diag_1,n").unwrap();
        for i in 0..12_000 {
            writeln!(file, "{},{}", 250 + i % 50, i).unwrap();
        }
        writeln!(file, "V57,12000").unwrap();
        drop(file);

        let table = DataLoader::new().load_csv(&path).unwrap();
        assert_eq!(table.height(), 12_001);
        assert!(table.is_text("diag_1"));
        assert_eq!(table.text_values("diag_1").unwrap()[12_000].as_deref(), Some("V57"));
    }

    #[test]
    fn test_missing_source() {
        let result = DataLoader::new().load_csv(Path::new("/nonexistent/data.csv"));
        assert!(matches!(result, Err(AuditError::SourceNotFound { .. })));
    }

    #[test]
    fn test_parquet_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("preds.parquet");
        let mut df = df!("y_pred" => &[0i64, 1, 1]).unwrap();

        DataSaver::save_parquet(&mut df, &path).unwrap();
        let loaded = DataLoader::new().load_parquet(&path).unwrap();
        assert_eq!(loaded.height(), 3);
    }

    #[test]
    fn test_save_json_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(&path, "stale").unwrap();

        DataSaver::save_json(&serde_json::json!({"ok": true}), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"ok\": true"));
    }
}
