//! エラー定義
//!
//! すべてのエラーはユーザーに表示され、新しい操作（再アップロード等）を求める。
//! 自動リトライは行わない。

use thiserror::Error;

/// アップロードされたファイルを画像として読めない
#[derive(Error, Debug)]
pub enum InputError {
    #[error("対応していない拡張子です: '{file_name}' (対応: png, tif, jpg, bmp, jpeg)")]
    UnsupportedExtension { file_name: String },

    #[error("画像をデコードできません '{file_name}': {source}")]
    Decode {
        file_name: String,
        #[source]
        source: image::ImageError,
    },
}

/// デコード済み画像がドメイン制約を満たさない
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("画像のサイズは {expected:?} である必要があります。読み込まれた画像は {actual:?} です。")]
    Shape {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("画像が不正です（黒画素の割合 {zero_fraction:.2}）。黒背景に白で数字を描いた画像を読み込んでください。")]
    Content { zero_fraction: f64 },
}

/// 分類器の呼び出しに失敗した
#[derive(Error, Debug)]
#[error("予測中にエラーが発生しました: {0}")]
pub struct PredictionError(#[source] pub anyhow::Error);

/// 同じファイルの評価を二重に保存しようとした
#[derive(Error, Debug, Clone, PartialEq)]
#[error("'{file_id}' の評価は既に保存されています")]
pub struct DuplicateError {
    pub file_id: String,
}

/// セッション操作のエラー
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Prediction(#[from] PredictionError),

    #[error(transparent)]
    Duplicate(#[from] DuplicateError),

    #[error("予測する画像が読み込まれていません")]
    NoImageLoaded,

    #[error("評価する予測がありません")]
    NoPrediction,

    #[error("正解の数字は 0〜9 で指定してください: {0}")]
    InvalidDigit(u8),
}

impl SessionError {
    /// 情報通知として扱うエラー（処理は中断するが致命的ではない）
    pub fn is_notice(&self) -> bool {
        matches!(self, SessionError::Duplicate(_))
    }
}
