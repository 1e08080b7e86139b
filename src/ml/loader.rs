//! 分類器の遅延読み込み
//!
//! モデルの構築と重みの読み込みは重いので、プロセス内で一度だけ行い
//! 以降は同じ分類器を共有する。読み込みに失敗した場合は記憶せず、次回また試す。

use anyhow::Result;
use log::info;
use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::prediction::{Classifier, PredictionService};

type ClassifierFactory = Box<dyn Fn() -> Result<Arc<dyn Classifier>> + Send + Sync>;

pub struct ClassifierLoader {
    factory: ClassifierFactory,
    cell: OnceCell<Arc<dyn Classifier>>,
}

impl ClassifierLoader {
    /// 任意の生成関数から作成
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Classifier>> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            cell: OnceCell::new(),
        }
    }

    /// 学習済みモデルのパスから作成
    #[cfg(feature = "ml")]
    pub fn from_path<P: Into<std::path::PathBuf>>(model_path: P, use_gpu: bool) -> Self {
        use crate::ml::{InferenceEngine, SharedEngine};

        let model_path = model_path.into();
        Self::new(move || {
            let engine = InferenceEngine::load_with_backend(&model_path, use_gpu)?;
            Ok(Arc::new(SharedEngine::new(engine)) as Arc<dyn Classifier>)
        })
    }

    /// 設定ファイルの内容から作成
    #[cfg(feature = "ml")]
    pub fn from_config(config: &crate::model::AppConfig) -> Self {
        Self::from_path(config.model.model_path.clone(), config.use_gpu())
    }

    /// 分類器を取得する。初回のみ読み込む
    ///
    /// 初回の読み込み中に来た呼び出しは完了を待つ。
    pub fn get(&self) -> Result<Arc<dyn Classifier>> {
        self.cell
            .get_or_try_init(|| {
                info!("分類器を初期化します");
                (self.factory)()
            })
            .cloned()
    }

    /// 読み込み済みの分類器で予測サービスを作る
    pub fn service(&self) -> Result<PredictionService> {
        Ok(PredictionService::new(self.get()?))
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}
