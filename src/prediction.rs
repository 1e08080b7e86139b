//! 予測サービス
//!
//! 前処理済みテンソルを分類器に1回だけ渡し、確率ベクトルから
//! 予測数字（argmax）と信頼度（最大確率）を求める。

use std::sync::Arc;

use anyhow::Result;
use log::{debug, info};

use crate::error::PredictionError;
use crate::types::{DigitTensor, PredictionResult, NUM_DIGITS};

/// 学習済み分類器
///
/// 入力 [1, 28, 28, 1]、出力は数字 0〜9 の確率ベクトル。
pub trait Classifier: Send + Sync {
    fn predict(&self, tensor: &DigitTensor) -> Result<Vec<f32>>;
}

/// 予測サービス
#[derive(Clone)]
pub struct PredictionService {
    classifier: Arc<dyn Classifier>,
}

impl PredictionService {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// テンソルを分類する。失敗時はリトライしない
    pub fn predict(&self, tensor: &DigitTensor) -> Result<PredictionResult, PredictionError> {
        let probabilities = self.classifier.predict(tensor).map_err(PredictionError)?;
        debug!("確率ベクトル: {:?}", probabilities);

        let result = summarize(&probabilities).map_err(PredictionError)?;
        info!(
            "予測: {} (信頼度 {:.2}%)",
            result.predicted_digit,
            result.confidence * 100.0
        );
        Ok(result)
    }
}

/// 確率ベクトルから予測結果を作る。同値の場合は小さいインデックスを採用
pub fn summarize(probabilities: &[f32]) -> Result<PredictionResult> {
    if probabilities.len() != NUM_DIGITS {
        anyhow::bail!(
            "確率ベクトルの長さが不正です: {} (期待: {})",
            probabilities.len(),
            NUM_DIGITS
        );
    }
    if let Some(i) = probabilities.iter().position(|p| !p.is_finite()) {
        anyhow::bail!("確率ベクトルに不正な値があります: index {} = {}", i, probabilities[i]);
    }
    if let Some(i) = probabilities.iter().position(|p| !(0.0..=1.0).contains(p)) {
        anyhow::bail!("確率が 0〜1 の範囲外です: index {} = {}", i, probabilities[i]);
    }

    let mut best = 0;
    for (i, &p) in probabilities.iter().enumerate().skip(1) {
        if p > probabilities[best] {
            best = i;
        }
    }

    Ok(PredictionResult {
        predicted_digit: best as u8,
        confidence: probabilities[best],
    })
}

/// テスト用の固定出力分類器
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct FixedClassifier {
        pub output: Vec<f32>,
        pub calls: AtomicUsize,
    }

    impl FixedClassifier {
        pub fn new(output: Vec<f32>) -> Self {
            Self {
                output,
                calls: AtomicUsize::new(0),
            }
        }

        /// 指定した数字に confidence を置き、残りを均等に割り振る
        pub fn confident(digit: usize, confidence: f32) -> Self {
            let rest = (1.0 - confidence) / (NUM_DIGITS - 1) as f32;
            let mut output = vec![rest; NUM_DIGITS];
            output[digit] = confidence;
            Self::new(output)
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Classifier for FixedClassifier {
        fn predict(&self, _tensor: &DigitTensor) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    pub struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn predict(&self, _tensor: &DigitTensor) -> Result<Vec<f32>> {
            anyhow::bail!("モデルが読み込まれていません")
        }
    }

    pub fn blank_tensor() -> DigitTensor {
        DigitTensor::from_values(vec![0.0; 784]).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_argmax_and_confidence() {
        let service = PredictionService::new(Arc::new(FixedClassifier::confident(4, 0.91)));
        let result = service.predict(&blank_tensor()).unwrap();
        assert_eq!(result.predicted_digit, 4);
        assert_eq!(result.confidence, 0.91);
    }

    #[test]
    fn test_tie_breaks_to_lowest_index() {
        let result = summarize(&[0.1; 10]).unwrap();
        assert_eq!(result.predicted_digit, 0);
        assert_eq!(result.confidence, 0.1);

        let mut probs = vec![0.0; 10];
        probs[3] = 0.5;
        probs[8] = 0.5;
        assert_eq!(summarize(&probs).unwrap().predicted_digit, 3);
    }

    #[test]
    fn test_predict_is_deterministic_and_calls_once() {
        let classifier = Arc::new(FixedClassifier::confident(9, 0.55));
        let service = PredictionService::new(classifier.clone());
        let tensor = blank_tensor();

        let first = service.predict(&tensor).unwrap();
        assert_eq!(classifier.calls(), 1);
        let second = service.predict(&tensor).unwrap();
        assert_eq!(classifier.calls(), 2);
        assert_eq!(first, second);
        assert!(first.is_low_confidence());
    }

    #[test]
    fn test_classifier_failure_is_wrapped() {
        let service = PredictionService::new(Arc::new(FailingClassifier));
        let err = service.predict(&blank_tensor()).unwrap_err();
        assert!(err.to_string().contains("モデルが読み込まれていません"));
    }

    #[test]
    fn test_malformed_output_is_prediction_error() {
        let service = PredictionService::new(Arc::new(FixedClassifier::new(vec![1.0; 3])));
        assert!(service.predict(&blank_tensor()).is_err());

        let mut probs = vec![0.1; 10];
        probs[2] = f32::NAN;
        assert!(summarize(&probs).is_err());

        // 範囲外の値はそのまま信頼度にしない
        let mut output = vec![0.0; 10];
        output[0] = -1.0;
        output[3] = 4.2;
        let service = PredictionService::new(Arc::new(FixedClassifier::new(output)));
        assert!(service.predict(&blank_tensor()).is_err());

        let mut probs = vec![0.0; 10];
        probs[5] = 1.0;
        assert_eq!(summarize(&probs).unwrap().confidence, 1.0);
    }
}
