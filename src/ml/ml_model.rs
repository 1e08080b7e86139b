//! 数字分類用CNNモデルの定義
//!
//! 学習済み重みを読み込むための固定アーキテクチャ。学習は行わない。

use anyhow::Result;
use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, Relu,
    },
    tensor::{activation::softmax, backend::Backend, Tensor},
};
use log::debug;

use crate::types::{DIGIT_SIZE, NUM_DIGITS};

/// 各畳み込み層の出力チャネル数
const CONV_CHANNELS: [usize; 3] = [32, 64, 128];

/// 畳み込みカーネルサイズ
const KERNEL: usize = 3;

/// モデル設定
#[derive(Config, Debug)]
pub struct ModelConfig {
    /// 分類クラス数
    #[config(default = 10)]
    pub num_classes: usize,
    /// 入力画像サイズ（正方形）
    #[config(default = 28)]
    pub image_size: usize,
}

impl ModelConfig {
    /// 数字分類の既定設定 (28x28 -> 10クラス)
    pub fn digits() -> Self {
        Self::new()
            .with_num_classes(NUM_DIGITS)
            .with_image_size(DIGIT_SIZE)
    }

    /// 各層の出力サイズ（一辺）
    ///
    /// Conv (3x3, no padding): size -> size - 2
    /// Pool (2x2, stride 2): size -> size / 2 (切り捨て)
    pub fn layer_sizes(&self) -> Option<[usize; 5]> {
        let after_conv1 = self.image_size.checked_sub(KERNEL - 1)?;
        let after_pool1 = after_conv1 / 2;
        let after_conv2 = after_pool1.checked_sub(KERNEL - 1)?;
        let after_pool2 = after_conv2 / 2;
        let after_conv3 = after_pool2.checked_sub(KERNEL - 1)?;
        if after_conv3 == 0 {
            return None;
        }
        Some([after_conv1, after_pool1, after_conv2, after_pool2, after_conv3])
    }

    /// Flatten後の特徴次元
    pub fn feature_dim(&self) -> Option<usize> {
        let sizes = self.layer_sizes()?;
        Some(CONV_CHANNELS[2] * sizes[4] * sizes[4])
    }

    /// モデルを初期化（重みは未学習）
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<DigitClassifier<B>> {
        let d = self.feature_dim().ok_or_else(|| {
            anyhow::anyhow!("入力サイズが小さすぎます: {} (最小14x14が必要)", self.image_size)
        })?;

        debug!("[Model] 入力サイズ: {}x{}", self.image_size, self.image_size);
        debug!("[Model] Flatten後の特徴次元 d: {}", d);
        debug!("[Model] Dense: {} -> {}", d, self.num_classes);

        let pool = || {
            MaxPool2dConfig::new([2, 2])
                .with_strides([2, 2])
                .init()
        };

        Ok(DigitClassifier {
            conv1: Conv2dConfig::new([1, CONV_CHANNELS[0]], [KERNEL, KERNEL]).init(device),
            pool1: pool(),
            conv2: Conv2dConfig::new([CONV_CHANNELS[0], CONV_CHANNELS[1]], [KERNEL, KERNEL]).init(device),
            pool2: pool(),
            conv3: Conv2dConfig::new([CONV_CHANNELS[1], CONV_CHANNELS[2]], [KERNEL, KERNEL]).init(device),
            output: LinearConfig::new(d, self.num_classes).init(device),
            activation: Relu::new(),
        })
    }
}

/// 数字分類用CNNモデル
///
/// # アーキテクチャ
/// - {Conv 3x3 + ReLU + MaxPool 2x2} x 2
/// - Conv 3x3 + ReLU
/// - Flatten
/// - Dense: d -> 10
/// - Softmax (予測時)
#[derive(Module, Debug)]
pub struct DigitClassifier<B: Backend> {
    conv1: Conv2d<B>, // 1 -> 32
    pool1: MaxPool2d,
    conv2: Conv2d<B>, // 32 -> 64
    pool2: MaxPool2d,
    conv3: Conv2d<B>, // 64 -> 128
    output: Linear<B>,
    activation: Relu,
}

impl<B: Backend> DigitClassifier<B> {
    /// 順伝播
    ///
    /// - `images`: [batch_size, 1, size, size]
    /// - 戻り値: クラスごとのロジット [batch_size, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = self.conv1.forward(images);
        let x = self.activation.forward(x);
        let x = self.pool1.forward(x);

        let x = self.conv2.forward(x);
        let x = self.activation.forward(x);
        let x = self.pool2.forward(x);

        let x = self.conv3.forward(x);
        let x = self.activation.forward(x);

        let [_, c, h, w] = x.dims();
        let x = x.reshape([batch_size, c * h * w]);

        self.output.forward(x)
    }

    /// クラスごとの確率 [batch_size, num_classes]
    pub fn forward_probabilities(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }
}

/// Keras の summary 形式に近いモデル概要
pub fn model_summary(config: &ModelConfig) -> Result<String> {
    let sizes = config
        .layer_sizes()
        .ok_or_else(|| anyhow::anyhow!("入力サイズが小さすぎます: {}", config.image_size))?;
    let d = CONV_CHANNELS[2] * sizes[4] * sizes[4];

    let conv_params = |c_in: usize, c_out: usize| c_in * c_out * KERNEL * KERNEL + c_out;
    let rows: Vec<(&str, String, usize)> = vec![
        ("input", format!("(1, {0}, {0}, 1)", config.image_size), 0),
        ("conv2d_1", format!("(1, {0}, {0}, {1})", sizes[0], CONV_CHANNELS[0]), conv_params(1, CONV_CHANNELS[0])),
        ("max_pooling2d_1", format!("(1, {0}, {0}, {1})", sizes[1], CONV_CHANNELS[0]), 0),
        ("conv2d_2", format!("(1, {0}, {0}, {1})", sizes[2], CONV_CHANNELS[1]), conv_params(CONV_CHANNELS[0], CONV_CHANNELS[1])),
        ("max_pooling2d_2", format!("(1, {0}, {0}, {1})", sizes[3], CONV_CHANNELS[1]), 0),
        ("conv2d_3", format!("(1, {0}, {0}, {1})", sizes[4], CONV_CHANNELS[2]), conv_params(CONV_CHANNELS[1], CONV_CHANNELS[2])),
        ("flatten", format!("(1, {})", d), 0),
        ("dense (softmax)", format!("(1, {})", config.num_classes), d * config.num_classes + config.num_classes),
    ];

    let total: usize = rows.iter().map(|(_, _, p)| p).sum();
    let rule = "=".repeat(64);

    let mut out = String::new();
    out.push_str(&format!("{:<24}{:<26}{:>14}\n", "Layer", "Output Shape", "Param #"));
    out.push_str(&rule);
    out.push('\n');
    for (name, shape, params) in &rows {
        out.push_str(&format!("{:<24}{:<26}{:>14}\n", name, shape, params));
    }
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!("Total params: {}\n", total));
    Ok(out)
}
