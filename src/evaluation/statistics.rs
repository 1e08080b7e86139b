//! 評価履歴の統計
//!
//! グラフ・表の描画側が使う値だけを計算する。

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::EvaluationRecord;

/// 正解数字ごとの的中状況
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DigitAccuracy {
    pub correct: usize,
    pub total: usize,
}

impl DigitAccuracy {
    /// 的中率 (0.0〜1.0)
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }

    /// 的中率（%）。棒グラフ用
    pub fn accuracy_percent(&self) -> f64 {
        self.accuracy() * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Statistics {
    /// 正解が確定したレコードのみを正解数字でまとめたもの
    pub accuracy_by_digit: BTreeMap<u8, DigitAccuracy>,
    /// 各レコード時点での累積的中数（挿入順）
    pub cumulative_correct: Vec<usize>,
    /// (時刻, 信頼度)（挿入順）
    pub confidence_series: Vec<(Option<String>, f32)>,
}

impl Statistics {
    pub fn from_records(records: &[EvaluationRecord]) -> Self {
        let mut accuracy_by_digit: BTreeMap<u8, DigitAccuracy> = BTreeMap::new();
        let mut cumulative_correct = Vec::with_capacity(records.len());
        let mut confidence_series = Vec::with_capacity(records.len());
        let mut running = 0;

        for record in records {
            if let Some(truth) = record.true_digit {
                let entry = accuracy_by_digit.entry(truth).or_default();
                entry.total += 1;
                if record.is_correct() {
                    entry.correct += 1;
                }
            }
            if record.is_correct() {
                running += 1;
            }
            cumulative_correct.push(running);
            confidence_series.push((record.timestamp.clone(), record.confidence));
        }

        Self {
            accuracy_by_digit,
            cumulative_correct,
            confidence_series,
        }
    }

    /// レコード数
    pub fn total(&self) -> usize {
        self.cumulative_correct.len()
    }

    /// 的中数
    pub fn correct(&self) -> usize {
        self.cumulative_correct.last().copied().unwrap_or(0)
    }

    /// 全体の的中率。正解確定済みのレコードが分母
    pub fn overall_accuracy(&self) -> f64 {
        let evaluated: usize = self.accuracy_by_digit.values().map(|d| d.total).sum();
        if evaluated == 0 {
            0.0
        } else {
            self.correct() as f64 / evaluated as f64
        }
    }
}
