//! ユーザーセッションの状態と操作
//!
//! 画面操作（アップロード、予測、評価の保存）ごとに1回ずつ呼ばれる。
//! 失敗した操作は後続の処理を行わない。

use log::{info, warn};
use std::sync::{Arc, Mutex};

use crate::analyzer::{decode_upload, preprocess, validate};
use crate::error::{DuplicateError, SessionError};
use crate::evaluation::{EvaluationHistory, Statistics};
use crate::prediction::PredictionService;
use crate::types::{EvaluationRecord, PredictionResult, RawImage};

/// 直近の予測（どのファイルに対するものか）
#[derive(Debug, Clone, PartialEq)]
pub struct LastPrediction {
    pub file_id: String,
    pub result: PredictionResult,
}

/// 1ユーザー分のセッション状態
#[derive(Debug, Default)]
pub struct SessionState {
    history: EvaluationHistory,
    uploaded: Option<RawImage>,
    last_prediction: Option<LastPrediction>,
}

/// 同じセッションに並行して操作が来るホスト用
pub type SharedSession = Arc<Mutex<SessionState>>;

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedSession {
        Arc::new(Mutex::new(Self::new()))
    }

    /// 画像をアップロードする
    ///
    /// 画像が変わるので直近の予測は破棄する。検証に失敗した場合は
    /// 読み込み済み画像も破棄する。
    pub fn upload(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), SessionError> {
        self.last_prediction = None;
        self.uploaded = None;

        let image = decode_upload(file_name, bytes).map_err(|e| {
            warn!("アップロードを拒否: {}", e);
            e
        })?;
        self.accept(image)
    }

    /// デコード済みの画像を受け付ける
    pub fn accept(&mut self, image: RawImage) -> Result<(), SessionError> {
        self.last_prediction = None;
        self.uploaded = None;

        if let Err(e) = validate(&image) {
            warn!("画像の検証に失敗: {} ({})", image.file_id, e);
            return Err(e.into());
        }

        info!("画像を読み込みました: {}", image.file_id);
        self.uploaded = Some(image);
        Ok(())
    }

    /// アップロードされた画像を取り除く
    pub fn clear_upload(&mut self) {
        self.uploaded = None;
        self.last_prediction = None;
    }

    /// 読み込み済みで検証を通過した画像のファイル名
    pub fn uploaded_file_id(&self) -> Option<&str> {
        self.uploaded.as_ref().map(|img| img.file_id.as_str())
    }

    pub fn uploaded_image(&self) -> Option<&RawImage> {
        self.uploaded.as_ref()
    }

    /// 予測する。同じ画像に対する予測が既にあればそれを返す
    pub fn predict(&mut self, service: &PredictionService) -> Result<PredictionResult, SessionError> {
        let image = self.uploaded.as_ref().ok_or(SessionError::NoImageLoaded)?;

        if let Some(last) = &self.last_prediction {
            if last.file_id == image.file_id {
                return Ok(last.result);
            }
        }

        let tensor = preprocess(image)?;
        let result = service.predict(&tensor)?;

        self.last_prediction = Some(LastPrediction {
            file_id: image.file_id.clone(),
            result,
        });
        Ok(result)
    }

    pub fn last_prediction(&self) -> Option<&LastPrediction> {
        self.last_prediction.as_ref()
    }

    /// ユーザーが入力した正解とともに直近の予測を履歴に保存する
    ///
    /// 既に保存済みのファイルなら履歴は変更しない。
    pub fn save_evaluation(
        &mut self,
        true_digit: u8,
        timestamp: impl Into<String>,
    ) -> Result<EvaluationRecord, SessionError> {
        let last = self.last_prediction.as_ref().ok_or(SessionError::NoPrediction)?;
        if true_digit > 9 {
            return Err(SessionError::InvalidDigit(true_digit));
        }

        if self.history.contains(&last.file_id) {
            info!("評価は既に保存されています: {}", last.file_id);
            return Err(DuplicateError {
                file_id: last.file_id.clone(),
            }
            .into());
        }

        let record = EvaluationRecord::pending(last.file_id.clone(), &last.result)
            .confirm(true_digit, timestamp);
        self.history.append(record.clone())?;
        Ok(record)
    }

    pub fn history(&self) -> &EvaluationHistory {
        &self.history
    }

    pub fn statistics(&self) -> Statistics {
        self.history.statistics()
    }
}
