use image::GrayImage;
use serde::{Deserialize, Serialize};

/// モデル入力の一辺（ピクセル）
pub const DIGIT_SIZE: usize = 28;

/// 分類クラス数（数字 0〜9）
pub const NUM_DIGITS: usize = 10;

/// 低信頼度とみなす閾値（表示用）
pub const LOW_CONFIDENCE_THRESHOLD: f32 = 0.70;

/// アップロードされたグレースケール画像
///
/// ファイル名は履歴の重複判定キーとして使う。
#[derive(Debug, Clone)]
pub struct RawImage {
    pub file_id: String,
    pub pixels: GrayImage,
}

impl RawImage {
    pub fn new(file_id: impl Into<String>, pixels: GrayImage) -> Self {
        Self {
            file_id: file_id.into(),
            pixels,
        }
    }

    /// (高さ, 幅)
    pub fn shape(&self) -> (usize, usize) {
        (self.pixels.height() as usize, self.pixels.width() as usize)
    }

    pub fn total(&self) -> usize {
        self.pixels.as_raw().len()
    }

    pub fn samples(&self) -> &[u8] {
        self.pixels.as_raw()
    }
}

/// 分類器への入力テンソル [1, 28, 28, 1]
///
/// 1チャネルなので NHWC と NCHW のメモリ配置は同一。
#[derive(Debug, Clone, PartialEq)]
pub struct DigitTensor {
    values: Vec<f32>,
}

impl DigitTensor {
    pub const SHAPE: [usize; 4] = [1, DIGIT_SIZE, DIGIT_SIZE, 1];

    /// 要素数が 28x28 でなければ None
    pub(crate) fn from_values(values: Vec<f32>) -> Option<Self> {
        if values.len() == DIGIT_SIZE * DIGIT_SIZE {
            Some(Self { values })
        } else {
            None
        }
    }

    pub fn shape(&self) -> [usize; 4] {
        Self::SHAPE
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// (y, x) の値
    pub fn at(&self, y: usize, x: usize) -> Option<f32> {
        if y >= DIGIT_SIZE || x >= DIGIT_SIZE {
            return None;
        }
        self.values.get(y * DIGIT_SIZE + x).copied()
    }
}

/// 予測結果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_digit: u8,
    pub confidence: f32,
}

impl PredictionResult {
    pub fn is_low_confidence(&self) -> bool {
        self.confidence < LOW_CONFIDENCE_THRESHOLD
    }

    /// メトリクス表示用の文字列。低信頼度ならマイナス記号を付ける（赤表示用）
    pub fn confidence_label(&self) -> String {
        let sign = if self.is_low_confidence() { "-" } else { "" };
        format!("{}{:.2}%", sign, self.confidence * 100.0)
    }
}

/// 評価履歴の1レコード
///
/// `true_digit` と `timestamp` はユーザーが正解を確定するまで未設定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub file_id: String,
    pub predicted_digit: u8,
    pub confidence: f32,
    #[serde(default)]
    pub true_digit: Option<u8>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl EvaluationRecord {
    /// 正解未確定のレコードを作成
    pub fn pending(file_id: impl Into<String>, prediction: &PredictionResult) -> Self {
        Self {
            file_id: file_id.into(),
            predicted_digit: prediction.predicted_digit,
            confidence: prediction.confidence,
            true_digit: None,
            timestamp: None,
        }
    }

    /// 正解と時刻を一度だけ埋めたレコードを返す
    pub fn confirm(self, true_digit: u8, timestamp: impl Into<String>) -> Self {
        Self {
            true_digit: Some(true_digit),
            timestamp: Some(timestamp.into()),
            ..self
        }
    }

    /// 正解が確定していて予測と一致する場合のみ true
    pub fn is_correct(&self) -> bool {
        self.true_digit == Some(self.predicted_digit)
    }
}
