//! アプリケーション設定管理モジュール
//!
//! 計算デバイスやモデルのパスなどをJSON形式で保存・読み込みします。

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::NUM_DIGITS;

/// 計算デバイスの種類
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub enum DeviceType {
    /// WGPU (GPU) バックエンド
    Wgpu,
    /// NdArray (CPU) バックエンド
    #[default]
    Cpu,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::Wgpu => write!(f, "WGPU (GPU)"),
            DeviceType::Cpu => write!(f, "CPU (NdArray)"),
        }
    }
}

/// モデル設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// 学習済みモデル（.tar.gz バンドル、または重みファイル）のパス
    pub model_path: String,
    /// 分類クラス数
    pub num_classes: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_path: "models/digit_classifier.tar.gz".to_string(),
            num_classes: 10,
        }
    }
}

/// 評価時刻の表示設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampSettings {
    /// chrono の strftime 形式（日付と時刻を改行で区切る）
    pub format: String,
    /// IANA タイムゾーン名（夏時間は自動で反映される）
    pub timezone: String,
}

impl Default for TimestampSettings {
    fn default() -> Self {
        Self {
            format: "%d/%m/%y\n%H:%M".to_string(),
            timezone: "Europe/Madrid".to_string(),
        }
    }
}

impl TimestampSettings {
    /// タイムゾーン名を解釈する
    pub fn tz(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("不明なタイムゾーンです '{}': {}", self.timezone, e))
    }

    /// 指定時刻を設定の形式で整形
    ///
    /// タイムゾーンが解釈できない場合は UTC で整形する。
    pub fn format_at(&self, instant: DateTime<Utc>) -> String {
        let tz = self.tz().unwrap_or_else(|e| {
            warn!("{}。UTC を使用します", e);
            Tz::UTC
        });
        instant.with_timezone(&tz).format(&self.format).to_string()
    }

    /// 現在時刻を設定の形式で整形
    pub fn now(&self) -> String {
        self.format_at(Utc::now())
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// 計算デバイスの種類
    pub device_type: DeviceType,
    /// モデル設定
    pub model: ModelSettings,
    /// 評価時刻の設定
    #[serde(default)]
    pub timestamp: TimestampSettings,
    /// 最後に評価履歴を書き出したCSVのパス
    #[serde(default)]
    pub last_export_path: Option<String>,
}

impl AppConfig {
    /// 設定ファイルのデフォルトパス
    pub fn default_path() -> PathBuf {
        PathBuf::from("config.json")
    }

    /// 設定を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 推論側の固定値と矛盾しないか確認する
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.model.num_classes != NUM_DIGITS {
            anyhow::bail!(
                "分類クラス数は {} である必要があります: {}",
                NUM_DIGITS,
                self.model.num_classes
            );
        }
        self.timestamp.tz()?;
        Ok(())
    }

    /// 指定パスから設定を読み込む、存在しない・壊れている場合はデフォルト設定を返す
    pub fn load_or_default_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if path.exists() {
            match Self::load(path) {
                Ok(config) => {
                    info!("設定ファイルを読み込みました: {}", path.display());
                    config
                }
                Err(e) => {
                    warn!(
                        "設定ファイルの読み込みに失敗しました ({}): {}。デフォルト設定を使用します",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            }
        } else {
            info!("設定ファイルが存在しません。デフォルト設定を使用します");
            Self::default()
        }
    }

    /// デフォルトパスから設定を読み込む
    pub fn load_or_default() -> Self {
        Self::load_or_default_from(Self::default_path())
    }

    /// 設定を保存する
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// GPU を使うか
    pub fn use_gpu(&self) -> bool {
        self.device_type == DeviceType::Wgpu
    }

    /// モデルパスを設定
    pub fn set_model_path(&mut self, path: String) {
        self.model.model_path = path;
    }

    /// 最後に使用した出力先を更新
    pub fn update_last_export_path<P: AsRef<Path>>(&mut self, path: P) {
        self.last_export_path = Some(path.as_ref().to_string_lossy().to_string());
    }

    /// 設定情報の表示用文字列
    pub fn summary(&self) -> String {
        let mut out = String::from("=== アプリケーション設定 ===\n");
        out.push_str(&format!("計算デバイス: {}\n", self.device_type));
        out.push_str(&format!("モデルパス: {}\n", self.model.model_path));
        out.push_str(&format!("分類クラス数: {}\n", self.model.num_classes));
        out.push_str(&format!("タイムゾーン: {}\n", self.timestamp.timezone));
        if let Some(ref export) = self.last_export_path {
            out.push_str(&format!("最後に使用した出力先: {}\n", export));
        }
        out.push_str("========================");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.device_type, DeviceType::Cpu);
        assert_eq!(config.model.num_classes, 10);
        assert!(!config.use_gpu());
    }

    #[test]
    fn test_serialize_deserialize() {
        let mut config = AppConfig::default();
        config.device_type = DeviceType::Wgpu;
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.device_type, DeviceType::Wgpu);
        assert_eq!(config.model.model_path, deserialized.model.model_path);
    }

    #[test]
    fn test_device_type_display() {
        assert_eq!(format!("{}", DeviceType::Wgpu), "WGPU (GPU)");
        assert_eq!(format!("{}", DeviceType::Cpu), "CPU (NdArray)");
    }

    #[test]
    fn test_timestamp_follows_daylight_saving() {
        let settings = TimestampSettings::default();

        // 冬時間 (UTC+1)
        let winter = Utc.with_ymd_and_hms(2026, 1, 5, 23, 30, 0).unwrap();
        assert_eq!(settings.format_at(winter), "06/01/26\n00:30");

        // 夏時間 (UTC+2)
        let summer = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        assert_eq!(settings.format_at(summer), "01/07/26\n14:00");
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        let settings = TimestampSettings {
            timezone: "Mars/Olympus".to_string(),
            ..TimestampSettings::default()
        };
        assert!(settings.tz().is_err());

        let instant = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        assert_eq!(settings.format_at(instant), "01/07/26\n12:00");
    }

    #[test]
    fn test_config_with_other_class_count_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.model.num_classes = 5;
        config.save(&path).unwrap();

        assert!(config.validate().is_err());
        assert!(AppConfig::load(&path).is_err());
        assert_eq!(AppConfig::load_or_default_from(&path).model.num_classes, NUM_DIGITS);
    }

    #[test]
    fn test_save_and_load_or_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        // 存在しない場合はデフォルト
        assert_eq!(AppConfig::load_or_default_from(&path).model.num_classes, 10);

        let mut config = AppConfig::default();
        config.set_model_path("weights/custom.tar.gz".to_string());
        config.save(&path).unwrap();
        let loaded = AppConfig::load_or_default_from(&path);
        assert_eq!(loaded.model.model_path, "weights/custom.tar.gz");

        // 壊れたファイルもデフォルト
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(
            AppConfig::load_or_default_from(&path).model.model_path,
            ModelSettings::default().model_path
        );
    }
}
