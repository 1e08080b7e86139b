//! 画像ファイルを順に読み込んで予測し、正解が指定されていれば評価として保存する
//!
//! Usage: predict_digit [--config <path>] [--model <path>] [--gpu] [--export <csv>] <image>[=<digit>] ...

#[cfg(feature = "ml")]
fn main() {
    use digit_recognizer_lib::{
        export_history_csv, init_logging, AppConfig, ClassifierLoader, SessionError, SessionState,
    };
    use std::path::{Path, PathBuf};

    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!(
            "Usage: predict_digit [--config <path>] [--model <path>] [--gpu] [--export <csv>] <image>[=<digit>] ..."
        );
        return;
    }

    let mut config_path = AppConfig::default_path();
    let mut model_override: Option<String> = None;
    let mut force_gpu = false;
    let mut export_path: Option<PathBuf> = None;
    let mut inputs: Vec<(String, Option<u8>)> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => match iter.next() {
                Some(p) => config_path = PathBuf::from(p),
                None => { eprintln!("--config にはパスが必要です"); return; }
            },
            "--model" => match iter.next() {
                Some(p) => model_override = Some(p.clone()),
                None => { eprintln!("--model にはパスが必要です"); return; }
            },
            "--export" => match iter.next() {
                Some(p) => export_path = Some(PathBuf::from(p)),
                None => { eprintln!("--export にはパスが必要です"); return; }
            },
            "--gpu" => force_gpu = true,
            other => {
                // "path=7" の形式で正解を付けられる
                let (path, truth) = match other.rsplit_once('=') {
                    Some((path, digit)) => match digit.parse::<u8>() {
                        Ok(d) => (path.to_string(), Some(d)),
                        Err(_) => { eprintln!("正解の数字が不正です: {}", other); return; }
                    },
                    None => (other.to_string(), None),
                };
                inputs.push((path, truth));
            }
        }
    }

    let mut config = AppConfig::load_or_default_from(&config_path);
    if let Some(model) = model_override {
        config.set_model_path(model);
    }
    if force_gpu {
        config.device_type = digit_recognizer_lib::model::DeviceType::Wgpu;
    }
    println!("{}", config.summary());

    let loader = ClassifierLoader::from_config(&config);
    let service = match loader.service() {
        Ok(s) => s,
        Err(err) => { eprintln!("分類器の読み込みエラー: {:#}", err); return; }
    };

    let mut session = SessionState::new();

    for (path, truth) in &inputs {
        let file_name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.clone());

        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(err) => { eprintln!("✗ {}: 読み込みエラー: {}", path, err); continue; }
        };

        if let Err(err) = session.upload(&file_name, &bytes) {
            eprintln!("✗ {}: {}", file_name, err);
            continue;
        }

        let result = match session.predict(&service) {
            Ok(r) => r,
            Err(err) => { eprintln!("✗ {}: {}", file_name, err); continue; }
        };
        println!(
            "✓ {}: 予測 {} (信頼度 {})",
            file_name,
            result.predicted_digit,
            result.confidence_label()
        );

        if let Some(digit) = truth {
            match session.save_evaluation(*digit, config.timestamp.now()) {
                Ok(record) => println!(
                    "  評価を保存しました (正解 {}, {})",
                    digit,
                    if record.is_correct() { "的中" } else { "不一致" }
                ),
                Err(err @ SessionError::Duplicate(_)) => println!("  {}", err),
                Err(err) => eprintln!("  評価の保存エラー: {}", err),
            }
        }
    }

    let stats = session.statistics();
    if stats.total() > 0 {
        println!("\n=== 評価結果 ===");
        for (digit, acc) in &stats.accuracy_by_digit {
            println!("  {}: {}/{} ({:.1}%)", digit, acc.correct, acc.total, acc.accuracy_percent());
        }
        println!(
            "  全体: {}/{} ({:.1}%)",
            stats.correct(),
            stats.total(),
            stats.overall_accuracy() * 100.0
        );
    }

    if let Some(path) = export_path {
        match export_history_csv(&path, session.history().records()) {
            Ok(()) => {
                println!("評価履歴を書き出しました: {}", path.display());
                config.update_last_export_path(&path);
                if let Err(err) = config.save(&config_path) {
                    eprintln!("設定の保存エラー: {}", err);
                }
            }
            Err(err) => eprintln!("CSV 書き出しエラー: {:#}", err),
        }
    }
}

#[cfg(not(feature = "ml"))]
fn main() {
    println!("ML機能が有効化されていません");
}
