use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use ndarray::Array4;
use rayon::prelude::*;

use crate::{
    config::PipelineConfig,
    types::{NormalizedTensor, RawImage},
};

/// Stretches the image to `input_size`² and normalizes each channel with the
/// configured mean/std, producing a planar `1×3×H×W` tensor.
pub fn prepare_image(image: &RawImage, config: &PipelineConfig) -> Result<NormalizedTensor> {
    let size = config.input_size;
    if size == 0 {
        return Err(anyhow!("model input size must be non-zero"));
    }
    let resized = resize_rgb(image, size)?;

    let data: Vec<f32> = (0..3usize)
        .into_par_iter()
        .flat_map_iter(|channel| {
            let mean = config.mean[channel];
            let std = config.std[channel];
            resized
                .chunks_exact(3)
                .map(move |px| (px[channel] as f32 / 255.0 - mean) / std)
        })
        .collect();

    let input = Array4::<f32>::from_shape_vec((1, 3, size as usize, size as usize), data)
        .map_err(|err| anyhow!("failed to build input tensor: {err}"))?;

    Ok(NormalizedTensor::new(input))
}

fn resize_rgb(image: &RawImage, size: u32) -> Result<Vec<u8>> {
    if image.width() == size && image.height() == size {
        return Ok(image.rgb().to_vec());
    }

    let src_image = fir::images::Image::from_vec_u8(
        image.width(),
        image.height(),
        image.rgb().to_vec(),
        fir::PixelType::U8x3,
    )?;
    let mut dst_image = fir::images::Image::new(size, size, fir::PixelType::U8x3);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;

    Ok(dst_image.into_vec())
}
