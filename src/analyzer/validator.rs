//! アップロード画像の検証
//!
//! - 黒画素（値0）の割合が 95% 超、または 10% 未満なら内容エラー
//! - サイズが 28x28 以外ならサイズエラー
//!
//! 両方に違反する場合は内容エラーを優先して報告する。

use crate::error::ValidationError;
use crate::types::{RawImage, DIGIT_SIZE};

/// 黒画素割合の上限（これを超えると数字が描かれていない）
pub const MAX_ZERO_FRACTION: f64 = 0.95;

/// 黒画素割合の下限（これ未満だと黒背景の画像ではない）
pub const MIN_ZERO_FRACTION: f64 = 0.10;

/// 画像を検証する。副作用なし
pub fn validate(image: &RawImage) -> Result<(), ValidationError> {
    check_content(image.samples())?;
    check_shape(image.shape())
}

/// 黒画素の割合 (0.0〜1.0)。空画像は 0.0
pub fn zero_fraction(samples: &[u8]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    count_zeros(samples) as f64 / samples.len() as f64
}

fn count_zeros(samples: &[u8]) -> usize {
    samples.iter().filter(|&&v| v == 0).count()
}

fn check_content(samples: &[u8]) -> Result<(), ValidationError> {
    // 件数で比較するので空画像はここを通過し、サイズ検査で弾かれる
    let total = samples.len() as f64;
    let zeros = count_zeros(samples) as f64;

    if zeros > MAX_ZERO_FRACTION * total || zeros < MIN_ZERO_FRACTION * total {
        return Err(ValidationError::Content {
            zero_fraction: zero_fraction(samples),
        });
    }
    Ok(())
}

pub(crate) fn check_shape(actual: (usize, usize)) -> Result<(), ValidationError> {
    let expected = (DIGIT_SIZE, DIGIT_SIZE);
    if actual != expected {
        return Err(ValidationError::Shape { expected, actual });
    }
    Ok(())
}
