//! 手書き数字認識のコア
//!
//! 画像の検証・前処理、CNN による推論、評価履歴と統計を提供する。

#![recursion_limit = "256"]
pub mod types;
pub mod error;

// 入力画像の検証と前処理
pub mod analyzer;
pub mod prediction;
pub mod evaluation;
pub mod session;
pub mod model;
pub mod ml;

pub use analyzer::{decode_upload, is_accepted_file, preprocess, validate};
pub use error::{DuplicateError, InputError, PredictionError, SessionError, ValidationError};
pub use evaluation::{export_history_csv, EvaluationHistory, Statistics};
pub use ml::ClassifierLoader;
pub use model::AppConfig;
pub use prediction::{Classifier, PredictionService};
pub use session::{SessionState, SharedSession};
pub use types::{DigitTensor, EvaluationRecord, PredictionResult, RawImage};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// ロガーを初期化する
///
/// `RUST_LOG` が未設定なら `info` レベルで出力する。二度目以降の呼び出しは何もしない。
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    if env_logger::Builder::from_env(env).try_init().is_ok() {
        log::info!("digit_recognizer {} initialized", VERSION);
    }
}
