//! モデルメタデータの定義
//!
//! tar.gz 形式のモデルバンドルに metadata.json として格納される。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::{DIGIT_SIZE, NUM_DIGITS};

/// 画素値を 1/255 でスケーリングする正規化（[0, 1]）
pub const NORMALIZATION_UNIT: &str = "unit";

/// モデルメタデータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// クラスラベル（インデックス順）
    /// 例: ["0", "1", ..., "9"]
    pub class_labels: Vec<String>,

    /// モデル入力サイズ（正方形、通常28）
    pub model_input_size: u32,

    /// 学習時の入力正規化方式
    /// 現在は "unit"（/255）のみ対応
    #[serde(default = "default_normalization")]
    pub normalization: String,

    /// アーキテクチャの説明（表示用）
    #[serde(default)]
    pub architecture: String,

    /// バンドル作成時刻（RFC3339形式）
    pub created_at: String,
}

fn default_normalization() -> String {
    NORMALIZATION_UNIT.to_string()
}

impl ModelMetadata {
    /// 数字分類モデル用のメタデータを作成
    pub fn digits() -> Self {
        Self {
            class_labels: (0..NUM_DIGITS).map(|d| d.to_string()).collect(),
            model_input_size: DIGIT_SIZE as u32,
            normalization: default_normalization(),
            architecture: "conv32-pool-conv64-pool-conv128-flatten-dense10".to_string(),
            created_at: chrono::Local::now().to_rfc3339(),
        }
    }

    /// 推論側の前処理と一致するか確認する
    pub fn validate(&self) -> Result<()> {
        if self.model_input_size as usize != DIGIT_SIZE {
            anyhow::bail!(
                "モデル入力サイズが不正です: {} (期待: {})",
                self.model_input_size,
                DIGIT_SIZE
            );
        }
        if self.class_labels.len() != NUM_DIGITS {
            anyhow::bail!(
                "クラス数が不正です: {} (期待: {})",
                self.class_labels.len(),
                NUM_DIGITS
            );
        }
        if self.normalization != NORMALIZATION_UNIT {
            anyhow::bail!("未対応の正規化方式です: {}", self.normalization);
        }
        Ok(())
    }

    /// メタデータをJSON文字列に変換
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize metadata to JSON")
    }

    /// JSON文字列からメタデータを生成
    pub fn from_json_string(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize metadata from JSON")
    }
}
