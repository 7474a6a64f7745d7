use crate::config::ModelConfig;
use crate::error::AppError;
use crate::models::classify_types::Prediction;
use image::DynamicImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;

/// Resize shortest edge to ceil(crop_size / crop_pct), center crop, normalize,
/// and lay the pixels out as a 1xCxHxW tensor.
pub fn preprocess_image(img: &DynamicImage, config: &ModelConfig) -> Result<Array4<f32>, AppError> {
    let crop_size = config.crop_size;
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return Err(AppError::invalid_image("Image has no pixels"));
    }

    // Resize so the shortest edge is ceil(crop_size / crop_pct)
    let resize_size = (crop_size as f32 / config.crop_pct).ceil() as u32;
    let (new_w, new_h) = if w < h {
        (resize_size, ((h as f32 / w as f32) * resize_size as f32).round() as u32)
    } else {
        (((w as f32 / h as f32) * resize_size as f32).round() as u32, resize_size)
    };
    let resized = img.resize_exact(new_w, new_h, image::imageops::FilterType::Triangle);

    // Center crop to crop_size x crop_size
    let crop_x = (new_w.saturating_sub(crop_size)) / 2;
    let crop_y = (new_h.saturating_sub(crop_size)) / 2;
    let cropped = resized.crop_imm(crop_x, crop_y, crop_size, crop_size);
    let rgb = cropped.to_rgb8();

    // HWC -> CHW, normalizing on the way.
    let hw = (crop_size * crop_size) as usize;
    let mut data = vec![0f32; 3 * hw];
    for (i, pixel) in rgb.into_raw().chunks_exact(3).enumerate() {
        for c in 0..3 {
            data[c * hw + i] = (pixel[c] as f32 / 255.0 - config.mean[c]) / config.std[c];
        }
    }

    Array4::from_shape_vec((1, 3, crop_size as usize, crop_size as usize), data)
        .map_err(|e| AppError::classification(format!("Failed to create tensor: {}", e)))
}

pub fn run_inference(
    session: &mut Session,
    input: Array4<f32>,
    labels: &[String],
    top_k: usize,
) -> Result<Vec<Prediction>, AppError> {
    // Single-input model, take whatever it calls it
    let input_name = session
        .inputs()
        .first()
        .map(|input| input.name().to_string())
        .ok_or_else(|| AppError::classification("Model declares no inputs"))?;

    let input_tensor = Value::from_array(input)
        .map_err(|e| AppError::classification(format!("Failed to create tensor value: {}", e)))?;

    // Run inference
    let outputs = session
        .run(ort::inputs![input_name.as_str() => input_tensor])
        .map_err(|e| AppError::classification(format!("Inference failed: {}", e)))?;

    // Get the first output tensor
    let output_value = outputs
        .values()
        .next()
        .ok_or_else(|| AppError::classification("Model produced no outputs"))?;

    let (_, logits) = output_value
        .try_extract_tensor::<f32>()
        .map_err(|e| AppError::classification(format!("Failed to extract output tensor: {}", e)))?;

    Ok(rank_predictions(logits, labels, top_k))
}

/// Softmax over the logits, then the `top_k` best labels in descending order.
pub fn rank_predictions(logits: &[f32], labels: &[String], top_k: usize) -> Vec<Prediction> {
    if logits.is_empty() {
        return Vec::new();
    }

    // Apply softmax
    let max_logit = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exp_sum: f32 = logits.iter().map(|&x| (x - max_logit).exp()).sum();

    let mut indexed: Vec<(usize, f32)> = logits
        .iter()
        .map(|&x| (x - max_logit).exp() / exp_sum)
        .enumerate()
        .collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    // Get top-K predictions
    indexed
        .into_iter()
        .take(top_k)
        .map(|(idx, confidence)| {
            let label = labels
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("class_{}", idx));
            Prediction { label, confidence }
        })
        .collect()
}
