//! 評価履歴
//!
//! 追記のみ。同じ file_id のレコードは1件だけ保持する。

use log::info;

use crate::error::DuplicateError;
use crate::types::EvaluationRecord;

use super::statistics::Statistics;

#[derive(Debug, Clone, Default)]
pub struct EvaluationHistory {
    records: Vec<EvaluationRecord>,
}

impl EvaluationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同じファイルが既に評価済みか
    pub fn contains(&self, file_id: &str) -> bool {
        self.records.iter().any(|r| r.file_id == file_id)
    }

    /// 末尾に追加する。評価済みのファイルなら何も変更せずエラー
    pub fn append(&mut self, record: EvaluationRecord) -> Result<(), DuplicateError> {
        if self.contains(&record.file_id) {
            return Err(DuplicateError {
                file_id: record.file_id,
            });
        }
        info!(
            "評価を保存: {} (予測 {}, 正解 {:?})",
            record.file_id, record.predicted_digit, record.true_digit
        );
        self.records.push(record);
        Ok(())
    }

    /// 挿入順のレコード
    pub fn records(&self) -> &[EvaluationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn statistics(&self) -> Statistics {
        Statistics::from_records(&self.records)
    }
}
