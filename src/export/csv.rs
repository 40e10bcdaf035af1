use super::{ExportError, SeriesVectors};
use csv::Writer;
use std::path::Path;

/// Export sensor vectors as CSV, one row per sample index
///
/// Vectors of different lengths are padded with empty cells.
pub fn export_series_vectors<P: AsRef<Path>>(
    vectors: &SeriesVectors,
    output_path: P,
) -> Result<(), ExportError> {
    if vectors.is_empty() {
        return Err(ExportError::InsufficientData(
            "session has no sensor samples".to_string(),
        ));
    }

    let mut writer = Writer::from_path(output_path)?;
    write_series_vectors(&mut writer, vectors)?;
    writer.flush()?;

    Ok(())
}

fn write_series_vectors<W: std::io::Write>(
    writer: &mut Writer<W>,
    vectors: &SeriesVectors,
) -> Result<(), ExportError> {
    writer.write_record([
        "sample",
        "heart_rate",
        "power",
        "cadence",
        "ground_contact_time",
        "vertical_oscillation",
    ])?;

    let cell = |values: &[f64], index: usize| {
        values.get(index).map_or(String::new(), |v| v.to_string())
    };

    for index in 0..vectors.max_len() {
        writer.write_record([
            index.to_string(),
            cell(&vectors.heart_rate, index),
            cell(&vectors.power, index),
            cell(&vectors.cadence, index),
            cell(&vectors.ground_contact_time, index),
            cell(&vectors.vertical_oscillation, index),
        ])?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_export_series_vectors() {
        let vectors = SeriesVectors {
            heart_rate: vec![140.0, 141.5, 143.0],
            power: vec![220.0, 225.0],
            ..SeriesVectors::default()
        };

        let temp_file = NamedTempFile::new().unwrap();
        export_series_vectors(&vectors, temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "sample,heart_rate,power,cadence,ground_contact_time,vertical_oscillation"
        );
        assert_eq!(lines[1], "0,140,220,,,");
        assert_eq!(lines[2], "1,141.5,225,,,");
        assert_eq!(lines[3], "2,143,,,,");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_empty_vectors_rejected() {
        let temp_file = NamedTempFile::new().unwrap();
        let result = export_series_vectors(&SeriesVectors::default(), temp_file.path());
        assert!(matches!(result, Err(ExportError::InsufficientData(_))));
    }
}
