// THEORY:
// The `Segmenter` is the first stage of the per-frame pipeline. It answers a purely
// local question for every pixel, "could this be note material?", and packs the
// answers into a binary `Mask` of the same size as the frame.
//
// Stages, in order:
// 1.  **Quantization (optional)**: k-means the frame down to a few colours so that
//     lighting noise does not leave holes in the note or confetti around it.
// 2.  **Colour space**: every pixel is converted to 8-bit HSV.
// 3.  **Threshold**: a pixel is foreground iff all three channels fall inside the
//     closed `ColorRange`.
// 4.  **Opening**: erosion then dilation with a square element removes speckle that
//     is thinner than the kernel. An optional extra dilation reconnects a note that
//     glare has split in two, at the risk of merging neighbours.
//
// The segmenter is stateless; it owns nothing between frames.

use crate::config::PipelineConfig;
use crate::core_modules::hsv::HsvPixel;
use crate::core_modules::quantizer;
use crate::error::VisionError;
use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use log::trace;

/// A colour frame from the camera.
pub type Frame = RgbImage;

/// Binary segmentation result: 255 marks note material, 0 marks background.
pub type Mask = GrayImage;

pub const FOREGROUND: Luma<u8> = Luma([255]);

/// Produces the note mask for one frame.
pub fn segment(frame: &Frame, config: &PipelineConfig) -> Result<Mask, VisionError> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(VisionError::InvalidFrame {
            width,
            height,
            reason: "frame has no pixels",
        });
    }

    let quantized;
    let source = if config.quantization.enabled() {
        quantized = quantizer::quantize(frame, &config.quantization);
        &quantized
    } else {
        frame
    };

    let mut mask = threshold(source, config);

    let radius = config.morphology.radius();
    if radius > 0 {
        mask = morphology::open(&mask, Norm::LInf, radius);
    }
    if config.morphology.extra_dilation {
        mask = morphology::dilate(&mask, Norm::LInf, radius.max(1));
    }

    trace!(
        "segmented {}x{} frame, {} foreground pixels",
        width,
        height,
        mask.pixels().filter(|p| p[0] != 0).count()
    );
    Ok(mask)
}

/// HSV in-range test for every pixel.
pub fn threshold(frame: &Frame, config: &PipelineConfig) -> Mask {
    let (width, height) = frame.dimensions();
    let mut mask = GrayImage::new(width, height);
    for (x, y, pixel) in frame.enumerate_pixels() {
        if config.color_range.contains(HsvPixel::from(pixel)) {
            mask.put_pixel(x, y, FOREGROUND);
        }
    }
    mask
}
