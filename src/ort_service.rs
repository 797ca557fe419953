use crate::{
    config::ModelConfig,
    error::{ModelError, PredictError},
    model_loader::ModelLoader,
    model_service::{ModelService, Prediction, CLASS_LABELS},
};
use async_trait::async_trait;
use image::imageops::{self, FilterType};
use ndarray::{Array, Array3};
use ort::value::TensorRef;
use std::sync::Arc;

const IMAGE_WIDTH: u32 = 28;
const IMAGE_HEIGHT: u32 = 28;

/// Decodes uploaded bytes into the model's input tensor: a `[1, 28, 28]`
/// array of luminance values scaled to `[0, 1]`.
pub fn preprocess_image(image_data: &[u8]) -> Result<Array3<f32>, PredictError> {
    let image_reader = image::ImageReader::new(std::io::Cursor::new(image_data))
        .with_guessed_format()
        .map_err(|e| PredictError::Validation(format!("error reading image: {}", e)))?;

    let original_img = image_reader
        .decode()
        .map_err(|e| PredictError::Validation(format!("error decoding image: {}", e)))?;

    let grayscale = original_img.to_luma8();
    let img = imageops::resize(&grayscale, IMAGE_WIDTH, IMAGE_HEIGHT, FilterType::CatmullRom);

    let mut input = Array::zeros((1, IMAGE_HEIGHT as usize, IMAGE_WIDTH as usize));
    for (x, y, pixel) in img.enumerate_pixels() {
        input[[0, y as usize, x as usize]] = (pixel.0[0] as f32) / 255.;
    }

    Ok(input)
}

fn prediction_from_output(probabilities: Vec<f32>) -> Result<Prediction, PredictError> {
    let (class_index, _) = probabilities
        .iter()
        .copied()
        .enumerate()
        .reduce(|accum, row| if row.1 > accum.1 { row } else { accum })
        .ok_or_else(|| PredictError::Internal("model returned an empty output".to_string()))?;

    let class_label = CLASS_LABELS
        .get(class_index)
        .ok_or_else(|| {
            PredictError::Internal(format!("class index {} has no label", class_index))
        })?
        .to_string();

    Ok(Prediction {
        class_label,
        probabilities,
    })
}

#[derive(Clone)]
pub struct OrtModelService {
    loader: Arc<ModelLoader>,
}

impl OrtModelService {
    pub fn new(model_config: &ModelConfig) -> Self {
        Self {
            loader: Arc::new(ModelLoader::new(model_config)),
        }
    }

    /// Forces the one-time model load. Called at startup so the service can
    /// refuse to start when the artifact is missing or undeserializable.
    pub fn warm_up(&self) -> Result<(), ModelError> {
        self.loader.ensure_loaded().map(|_| ())
    }

    pub fn predict(&self, input: &Array3<f32>) -> Result<Prediction, PredictError> {
        let output = self.run_inference(input)?;
        prediction_from_output(output)
    }

    fn run_inference(&self, input: &Array3<f32>) -> Result<Vec<f32>, PredictError> {
        let session_lock = self
            .loader
            .ensure_loaded()
            .map_err(|e| PredictError::Internal(e.to_string()))?;
        let mut session = session_lock
            .lock()
            .map_err(|e| PredictError::Internal(format!("session mutex poisoned: {}", e)))?;

        let output_name = session
            .outputs()
            .first()
            .map(|output| output.name().to_string())
            .ok_or_else(|| PredictError::Internal("model has no outputs".to_string()))?;

        let tensor_ref = TensorRef::from_array_view(input.view())
            .map_err(|e| PredictError::Internal(format!("failed to build tensor: {}", e)))?;

        let input_tensor = ort::inputs![tensor_ref];

        let outputs = session
            .run(input_tensor)
            .map_err(|e| PredictError::Internal(format!("inference failed: {}", e)))?;

        let (shape, data) = outputs[output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| PredictError::Internal(format!("failed to extract tensor: {}", e)))?;

        tracing::debug!("Output {} with shape {:?}", output_name, shape);

        Ok(data.to_vec())
    }
}

#[async_trait]
impl ModelService for OrtModelService {
    async fn classify(&self, image_data: &[u8]) -> Result<Prediction, PredictError> {
        let input = preprocess_image(image_data)?;
        self.predict(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb};
    use std::io::Cursor;

    fn encode_gray_png(width: u32, height: u32, value: u8) -> Vec<u8> {
        let img = ImageBuffer::<Luma<u8>, Vec<u8>>::from_pixel(width, height, Luma([value]));
        let mut image_data: Vec<u8> = Vec::new();
        img.write_to(&mut Cursor::new(&mut image_data), image::ImageFormat::Png)
            .unwrap();
        image_data
    }

    #[test]
    fn test_preprocess_grayscale_image() {
        let input = preprocess_image(&encode_gray_png(100, 100, 128)).unwrap();

        assert_eq!(input.shape(), &[1, 28, 28]);
        assert!(input.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_preprocess_color_image() {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(64, 48, Rgb([255, 0, 0]));
        let mut image_data: Vec<u8> = Vec::new();
        img.write_to(&mut Cursor::new(&mut image_data), image::ImageFormat::Png)
            .unwrap();

        let input = preprocess_image(&image_data).unwrap();

        assert_eq!(input.shape(), &[1, 28, 28]);
        assert!(input.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_preprocess_white_image_scales_to_one() {
        let input = preprocess_image(&encode_gray_png(28, 28, 255)).unwrap();

        assert!(input.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_preprocess_rejects_undecodable_bytes() {
        let err = preprocess_image(b"not an image").unwrap_err();

        assert!(matches!(err, PredictError::Validation(_)));
    }

    #[test]
    fn test_prediction_label_is_argmax() {
        let mut output = vec![0.01; 10];
        output[7] = 0.9;

        let prediction = prediction_from_output(output).unwrap();

        assert_eq!(prediction.class_label, "7");
        assert_eq!(prediction.probabilities.len(), 10);
        assert_eq!(prediction.probabilities[7], 0.9);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let output = vec![0.1, 0.2, 0.05, 0.3, 0.05, 0.1, 0.05, 0.05, 0.05, 0.05];

        let first = prediction_from_output(output.clone()).unwrap();
        let second = prediction_from_output(output).unwrap();

        assert_eq!(first.class_label, second.class_label);
        assert_eq!(first.probabilities, second.probabilities);
    }

    #[test]
    fn test_prediction_rejects_empty_output() {
        let err = prediction_from_output(Vec::new()).unwrap_err();

        assert!(matches!(err, PredictError::Internal(_)));
    }

    #[test]
    fn test_prediction_rejects_unlabeled_class_index() {
        // 11 scores, max at index 10, one past the label set.
        let mut output = vec![0.0; 11];
        output[10] = 1.0;

        let err = prediction_from_output(output).unwrap_err();

        assert!(matches!(err, PredictError::Internal(_)));
    }
}
