use super::{AnalyticsExport, ExportError};
use std::io::Write;
use std::path::Path;

/// Render an analytics export as pretty-printed JSON
pub fn to_json_string(export: &AnalyticsExport) -> Result<String, ExportError> {
    serde_json::to_string_pretty(export).map_err(|e| ExportError::SerializationError(e.to_string()))
}

/// Export any serializable data structure to JSON
pub fn export_json<T, P>(data: &T, output_path: P) -> Result<(), ExportError>
where
    T: serde::Serialize,
    P: AsRef<Path>,
{
    let json_data = serde_json::to_string_pretty(data)
        .map_err(|e| ExportError::SerializationError(e.to_string()))?;

    let mut file = std::fs::File::create(output_path)?;
    file.write_all(json_data.as_bytes())?;

    Ok(())
}
