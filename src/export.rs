//! Spreadsheet export of the appointment snapshot.
//!
//! Serializes the current snapshot to a CSV file with a deterministic name.
//! An empty snapshot is a precondition failure surfaced to the user; no file
//! is produced in that case.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::Cita;

/// Deterministic export file name
pub const EXPORT_FILE_NAME: &str = "citas.csv";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No appointments to export")]
    Empty,

    #[error("Failed to write export file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to flush export file: {0}")]
    Io(#[from] std::io::Error),
}

/// Write the snapshot to `citas.csv` inside `dir`, in snapshot order.
/// Column headers are the remote table's own column names.
pub fn export_citas(citas: &[Cita], dir: &Path) -> Result<PathBuf, ExportError> {
    if citas.is_empty() {
        return Err(ExportError::Empty);
    }

    let path = dir.join(EXPORT_FILE_NAME);
    let mut writer = csv::Writer::from_path(&path)?;
    for cita in citas {
        writer.serialize(cita)?;
    }
    writer.flush()?;

    Ok(path)
}

/// Default export destination: the user's download directory when known
pub fn default_export_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CitaStatus;

    fn cita(id: i64, name: &str) -> Cita {
        Cita {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: Some("600111222".to_string()),
            date: "2026-03-01".to_string(),
            time: "10:00".to_string(),
            reason: Some("Revision".to_string()),
            status: Some(CitaStatus::Confirmed),
        }
    }

    #[test]
    fn test_empty_snapshot_produces_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = export_citas(&[], dir.path());

        assert!(matches!(result, Err(ExportError::Empty)));
        assert!(!dir.path().join(EXPORT_FILE_NAME).exists());
    }

    #[test]
    fn test_export_writes_deterministic_file() {
        let dir = tempfile::tempdir().unwrap();
        let citas = vec![cita(1, "Ana"), cita(2, "Luis")];

        let path = export_citas(&citas, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("citas.csv"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        // Header uses the table's wire column names
        assert_eq!(
            lines.next().unwrap(),
            "id,nombre,email,telefono,fecha,hora,motivo,estado"
        );
        assert_eq!(lines.clone().count(), 2);
        assert!(contents.contains("Ana"));
        assert!(contents.contains("confirmada"));
    }

    #[test]
    fn test_export_preserves_snapshot_order() {
        let dir = tempfile::tempdir().unwrap();
        let citas = vec![cita(2, "Luis"), cita(1, "Ana")];

        let path = export_citas(&citas, dir.path()).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<&str> = contents.lines().skip(1).collect();
        assert!(rows[0].starts_with("2,Luis"));
        assert!(rows[1].starts_with("1,Ana"));
    }
}
