use image::{imageops::FilterType, DynamicImage, RgbImage};

use crate::modules::inference::InferenceError;

/// Side length of the classifier input (EfficientNetV2-B0 training size)
pub const CLASSIFIER_INPUT_SIZE: u32 = 224;

/// Side length of the segmentation model input
pub const SEGMENTER_INPUT_SIZE: u32 = 640;

/// Dense f32 tensor ready to hand to the runtime
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub shape: Vec<i64>,
    pub data: Vec<f32>,
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, InferenceError> {
    image::load_from_memory(bytes).map_err(|e| InferenceError::Decode(e.to_string()))
}

/// Resize to 224x224 and scale to [0, 1], laid out NHWC `[1, 224, 224, 3]`
pub fn classifier_input(image: &DynamicImage) -> ImageTensor {
    let resized = image
        .resize_exact(
            CLASSIFIER_INPUT_SIZE,
            CLASSIFIER_INPUT_SIZE,
            FilterType::CatmullRom,
        )
        .to_rgb8();

    let data = resized
        .pixels()
        .flat_map(|p| p.0)
        .map(|v| f32::from(v) / 255.0)
        .collect();

    ImageTensor {
        shape: vec![
            1,
            CLASSIFIER_INPUT_SIZE as i64,
            CLASSIFIER_INPUT_SIZE as i64,
            3,
        ],
        data,
    }
}

/// Stretch to `size`x`size` and scale to [0, 1], laid out NCHW `[1, 3, size, size]`
pub fn segmenter_input(image: &RgbImage, size: u32) -> ImageTensor {
    let resized = image::imageops::resize(image, size, size, FilterType::Triangle);
    let plane = (size * size) as usize;
    let mut data = vec![0.0f32; 3 * plane];

    for (i, pixel) in resized.pixels().enumerate() {
        let [r, g, b] = pixel.0;
        data[i] = f32::from(r) / 255.0;
        data[plane + i] = f32::from(g) / 255.0;
        data[2 * plane + i] = f32::from(b) / 255.0;
    }

    ImageTensor {
        shape: vec![1, 3, size as i64, size as i64],
        data,
    }
}
