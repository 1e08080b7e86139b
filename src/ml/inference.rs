//! モデル推論機能

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Mutex;

use burn::{
    backend::Wgpu,
    module::Module,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
    tensor::{backend::Backend, Tensor},
};
use burn_ndarray::{NdArray, NdArrayDevice};
use burn_wgpu::WgpuDevice;
use log::info;

use crate::ml::{DigitClassifier, ModelConfig};
use crate::model::{is_bundle_path, load_model_with_metadata, ModelMetadata};
use crate::prediction::Classifier;
use crate::types::{DigitTensor, DIGIT_SIZE};

/// 推論エンジン
///
/// バックエンドごとにモデルとデバイスを保持する。
pub enum InferenceEngine {
    Wgpu {
        model: DigitClassifier<Wgpu>,
        device: WgpuDevice,
        metadata: Option<ModelMetadata>,
    },
    NdArray {
        model: DigitClassifier<NdArray>,
        device: NdArrayDevice,
        metadata: Option<ModelMetadata>,
    },
}

impl InferenceEngine {
    /// モデルを読み込んで推論エンジンを初期化（CPU）
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Self::load_with_backend(model_path, false)
    }

    /// バックエンドを指定してモデルを読み込む
    ///
    /// `.tar.gz` はメタデータ付きバンドル、それ以外は重みファイルとして扱う。
    pub fn load_with_backend<P: AsRef<Path>>(model_path: P, use_gpu: bool) -> Result<Self> {
        let model_path = model_path.as_ref();

        let (metadata, model_binary) = if is_bundle_path(model_path) {
            let (metadata, binary) = load_model_with_metadata(model_path)?;
            metadata
                .validate()
                .context(format!("モデルメタデータが推論設定と一致しません: {:?}", model_path))?;
            (Some(metadata), binary)
        } else {
            let binary = std::fs::read(model_path)
                .context(format!("Failed to read weights file: {:?}", model_path))?;
            (None, binary)
        };

        let engine = if use_gpu {
            let device = WgpuDevice::default();
            let model = restore_model::<Wgpu>(model_binary, &device)?;
            InferenceEngine::Wgpu { model, device, metadata }
        } else {
            let device = NdArrayDevice::Cpu;
            let model = restore_model::<NdArray>(model_binary, &device)?;
            InferenceEngine::NdArray { model, device, metadata }
        };

        info!(
            "モデルを読み込みました: {} ({}, パラメータ数 {})",
            model_path.display(),
            engine.backend_name(),
            engine.num_params()
        );
        Ok(engine)
    }

    /// NdArray バックエンドの既存モデルから作成
    pub fn from_ndarray_model(model: DigitClassifier<NdArray>) -> Self {
        InferenceEngine::NdArray {
            model,
            device: NdArrayDevice::Cpu,
            metadata: None,
        }
    }

    /// 1枚の数字を分類し、10クラスの確率を返す
    pub fn classify(&self, tensor: &DigitTensor) -> Result<Vec<f32>> {
        match self {
            InferenceEngine::Wgpu { model, device, .. } => run_model(model, device, tensor),
            InferenceEngine::NdArray { model, device, .. } => run_model(model, device, tensor),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            InferenceEngine::Wgpu { .. } => "WGPU (GPU)",
            InferenceEngine::NdArray { .. } => "CPU (NdArray)",
        }
    }

    pub fn num_params(&self) -> usize {
        match self {
            InferenceEngine::Wgpu { model, .. } => model.num_params(),
            InferenceEngine::NdArray { model, .. } => model.num_params(),
        }
    }

    /// バンドルから読み込んだ場合のメタデータ
    pub fn metadata(&self) -> Option<&ModelMetadata> {
        match self {
            InferenceEngine::Wgpu { metadata, .. } | InferenceEngine::NdArray { metadata, .. } => {
                metadata.as_ref()
            }
        }
    }
}

/// 重みバイナリからモデルを復元
fn restore_model<B: Backend>(model_binary: Vec<u8>, device: &B::Device) -> Result<DigitClassifier<B>> {
    let model = ModelConfig::digits().init::<B>(device)?;

    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    let record = Recorder::<B>::load(&recorder, model_binary, device)
        .map_err(|e| anyhow::anyhow!("モデル重みの読み込みエラー: {:?}", e))?;

    Ok(model.load_record(record))
}

/// モデルの重みをバイナリに変換（バンドル作成用）
pub fn model_to_bytes<B: Backend>(model: &DigitClassifier<B>) -> Result<Vec<u8>> {
    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    Recorder::<B>::record(&recorder, model.clone().into_record(), ())
        .map_err(|e| anyhow::anyhow!("モデル重みの書き出しエラー: {:?}", e))
}

fn run_model<B: Backend>(
    model: &DigitClassifier<B>,
    device: &B::Device,
    tensor: &DigitTensor,
) -> Result<Vec<f32>> {
    // [1, 28, 28, 1] と [1, 1, 28, 28] は1チャネルなら同じ並び
    let input = Tensor::<B, 1>::from_floats(tensor.values(), device)
        .reshape([1, 1, DIGIT_SIZE, DIGIT_SIZE]);

    let probabilities = model.forward_probabilities(input);

    probabilities
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("推論結果の取得エラー: {:?}", e))
}

/// 共有用の推論エンジン
///
/// burn のパラメータは Sync ではないため Mutex で包む。読み込み後に変更はしない。
pub struct SharedEngine {
    engine: Mutex<InferenceEngine>,
}

impl SharedEngine {
    pub fn new(engine: InferenceEngine) -> Self {
        Self {
            engine: Mutex::new(engine),
        }
    }
}

impl Classifier for SharedEngine {
    fn predict(&self, tensor: &DigitTensor) -> Result<Vec<f32>> {
        let engine = self
            .engine
            .lock()
            .map_err(|_| anyhow::anyhow!("推論エンジンのロックに失敗しました"))?;
        engine.classify(tensor)
    }
}
