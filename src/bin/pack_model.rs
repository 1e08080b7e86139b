//! burn の重みファイルをメタデータ付きのモデルバンドル (.tar.gz) にまとめる
//!
//! Usage: pack_model <weights.bin> <output.tar.gz>
//!        pack_model --summary

#[cfg(feature = "ml")]
fn main() {
    use digit_recognizer_lib::ml::{model_summary, InferenceEngine, ModelConfig};
    use digit_recognizer_lib::model::{format_metadata_info, save_model_with_metadata, ModelMetadata};
    use std::path::PathBuf;

    digit_recognizer_lib::init_logging();

    let args: Vec<String> = std::env::args().collect();

    if args.len() == 2 && args[1] == "--summary" {
        match model_summary(&ModelConfig::digits()) {
            Ok(summary) => print!("{}", summary),
            Err(err) => eprintln!("モデル概要の作成エラー: {}", err),
        }
        return;
    }

    if args.len() < 3 {
        eprintln!("Usage: pack_model <weights.bin> <output.tar.gz>");
        eprintln!("       pack_model --summary");
        return;
    }

    let weights_path = PathBuf::from(&args[1]);
    let output_path = PathBuf::from(&args[2]);

    // 同じアーキテクチャで読めることを先に確認する
    let engine = match InferenceEngine::load(&weights_path) {
        Ok(e) => e,
        Err(err) => { eprintln!("[Model] 重みファイルを読み込めません: {:#}", err); return; }
    };
    println!("[Model] パラメータ数: {}", engine.num_params());

    let weights = match std::fs::read(&weights_path) {
        Ok(b) => b,
        Err(err) => { eprintln!("[Model] 読み込みエラー: {}", err); return; }
    };

    let metadata = ModelMetadata::digits();
    match save_model_with_metadata(&output_path, &metadata, &weights) {
        Ok(path) => {
            println!("[Model] バンドルを作成しました: {}", path.display());
            println!("{}", format_metadata_info(&metadata));
        }
        Err(err) => eprintln!("[Model] バンドル作成エラー: {:#}", err),
    }
}

#[cfg(not(feature = "ml"))]
fn main() {
    println!("ML機能が有効化されていません");
}
