//! 評価履歴のCSV出力（表表示と同じ列順）

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::types::EvaluationRecord;

pub const CSV_HEADER: [&str; 5] = ["file_id", "predicted_digit", "confidence", "true_digit", "timestamp"];

/// 任意の Writer に履歴を書き出す
pub fn write_history_csv<W: Write>(writer: W, records: &[EvaluationRecord]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(CSV_HEADER)
        .context("CSVヘッダー書き込みエラー")?;

    for record in records {
        let true_digit = record.true_digit.map(|d| d.to_string()).unwrap_or_default();
        let confidence = format!("{:.4}", record.confidence);
        let predicted = record.predicted_digit.to_string();
        csv_writer
            .write_record([
                record.file_id.as_str(),
                predicted.as_str(),
                confidence.as_str(),
                true_digit.as_str(),
                record.timestamp.as_deref().unwrap_or(""),
            ])
            .with_context(|| format!("CSV書き込みエラー: {}", record.file_id))?;
    }

    csv_writer.flush().context("CSVフラッシュエラー")?;
    Ok(())
}

/// ファイルに履歴を書き出す
pub fn export_history_csv(path: &Path, records: &[EvaluationRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create parent directory: {:?}", parent))?;
        }
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create csv file: {:?}", path))?;
    write_history_csv(file, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PredictionResult;

    #[test]
    fn test_write_history_csv() {
        let pred = PredictionResult {
            predicted_digit: 3,
            confidence: 0.875,
        };
        let records = vec![
            EvaluationRecord::pending("three.png", &pred).confirm(3, "19/10/26\n09:30"),
            EvaluationRecord::pending("pending.png", &pred),
        ];

        let mut buf = Vec::new();
        write_history_csv(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, CSV_HEADER);

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "three.png");
        assert_eq!(&rows[0][2], "0.8750");
        assert_eq!(&rows[0][3], "3");
        assert_eq!(&rows[0][4], "19/10/26\n09:30");
        assert_eq!(&rows[1][3], "");
    }

    #[test]
    fn test_export_history_csv_creates_parent_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out").join("history.csv");
        export_history_csv(&path, &[]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), CSV_HEADER.join(","));
    }
}
