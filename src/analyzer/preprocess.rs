//! アップロード画像のデコードとモデル入力への変換

use std::path::Path;

use crate::error::{InputError, ValidationError};
use crate::types::{DigitTensor, RawImage, DIGIT_SIZE};

use super::validator::check_shape;

/// アップロードを受け付ける拡張子
pub const ACCEPTED_EXTENSIONS: [&str; 5] = ["png", "tif", "jpg", "bmp", "jpeg"];

/// 拡張子が対応形式か（大文字小文字は区別しない）
pub fn is_accepted_file(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            ACCEPTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// アップロードされたバイト列をグレースケール画像にデコード
///
/// カラー画像は輝度に変換する。形式はファイル名ではなく内容から判定する。
pub fn decode_upload(file_name: &str, bytes: &[u8]) -> Result<RawImage, InputError> {
    if !is_accepted_file(file_name) {
        return Err(InputError::UnsupportedExtension {
            file_name: file_name.to_string(),
        });
    }

    let img = image::load_from_memory(bytes).map_err(|source| InputError::Decode {
        file_name: file_name.to_string(),
        source,
    })?;

    Ok(RawImage::new(file_name, img.to_luma8()))
}

/// 28x28 画像を [1, 28, 28, 1] の f32 テンソルへ変換（各画素 / 255）
pub fn preprocess(image: &RawImage) -> Result<DigitTensor, ValidationError> {
    check_shape(image.shape())?;

    let values: Vec<f32> = image
        .samples()
        .iter()
        .map(|&v| v as f32 / 255.0)
        .collect();

    DigitTensor::from_values(values).ok_or(ValidationError::Shape {
        expected: (DIGIT_SIZE, DIGIT_SIZE),
        actual: image.shape(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma, Rgb, RgbImage};
    use std::io::Cursor;

    fn encode(img: &image::DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_accepted_extensions() {
        assert!(is_accepted_file("digit.png"));
        assert!(is_accepted_file("digit.JPEG"));
        assert!(is_accepted_file("scan.tif"));
        assert!(!is_accepted_file("scan.tiff"));
        assert!(!is_accepted_file("digit.gif"));
        assert!(!is_accepted_file("digit"));
    }

    #[test]
    fn test_preprocess_scales_each_pixel() {
        let pixels = GrayImage::from_fn(28, 28, |x, y| Luma([((x * 9 + y) % 256) as u8]));
        let raw = RawImage::new("gradient.png", pixels.clone());

        let tensor = preprocess(&raw).unwrap();
        assert_eq!(tensor.shape(), [1, 28, 28, 1]);
        assert_eq!(tensor.values().len(), 784);
        for y in 0..28u32 {
            for x in 0..28u32 {
                let v = pixels.get_pixel(x, y)[0];
                let t = tensor.at(y as usize, x as usize).unwrap();
                assert_eq!(t, v as f32 / 255.0);
                assert!((0.0..=1.0).contains(&t));
            }
        }
    }

    #[test]
    fn test_preprocess_rejects_wrong_shape() {
        let raw = RawImage::new("big.png", GrayImage::new(29, 28));
        assert_eq!(
            preprocess(&raw),
            Err(ValidationError::Shape {
                expected: (28, 28),
                actual: (28, 29),
            })
        );
    }

    #[test]
    fn test_decode_png_round_trip() {
        let pixels = GrayImage::from_fn(28, 28, |x, _| Luma([if x > 14 { 255 } else { 0 }]));
        let bytes = encode(&image::DynamicImage::ImageLuma8(pixels.clone()), ImageFormat::Png);

        let raw = decode_upload("half.png", &bytes).unwrap();
        assert_eq!(raw.file_id, "half.png");
        assert_eq!(raw.pixels, pixels);
    }

    #[test]
    fn test_decode_converts_color_to_luma() {
        let rgb = RgbImage::from_pixel(28, 28, Rgb([255, 255, 255]));
        let bytes = encode(&image::DynamicImage::ImageRgb8(rgb), ImageFormat::Bmp);

        let raw = decode_upload("white.bmp", &bytes).unwrap();
        assert_eq!(raw.shape(), (28, 28));
        assert!(raw.samples().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode_upload("digit.gif", &[0u8; 4]),
            Err(InputError::UnsupportedExtension { .. })
        ));
        assert!(matches!(
            decode_upload("digit.png", b"not an image"),
            Err(InputError::Decode { .. })
        ));
    }
}
