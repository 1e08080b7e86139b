//! アップロード画像の解析（検証と前処理）

pub mod validator;
pub mod preprocess;

pub use validator::{validate, zero_fraction, MAX_ZERO_FRACTION, MIN_ZERO_FRACTION};
pub use preprocess::{decode_upload, is_accepted_file, preprocess, ACCEPTED_EXTENSIONS};
