//! Sample dataset generator
//!
//! Renders short text strings onto plain white canvases and writes the
//! matching label manifest, producing a small dataset the evaluation
//! job can run against out of the box.

use crate::storage::LABELS_FILE;
use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::path::Path;
use tracing::info;

/// Canvas size of every generated image
pub const IMAGE_WIDTH: u32 = 300;
pub const IMAGE_HEIGHT: u32 = 100;

/// Font used when no override is given
pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

const FONT_SCALE: f32 = 24.0;

/// The canonical sample set: (filename, rendered text)
pub const SAMPLE_TEXTS: [(&str, &str); 8] = [
    ("image_001.jpg", "Hello World"),
    ("image_002.jpg", "Machine Learning"),
    ("image_003.jpg", "Optical Character Recognition"),
    ("image_004.jpg", "Deep Learning OCR"),
    ("image_005.jpg", "Training Dataset"),
    ("image_006.jpg", "Sample Text 123"),
    ("image_007.jpg", "Pattern Matching"),
    ("image_008.jpg", "Neural Networks"),
];

/// Load a TTF/OTF font from disk
pub fn load_font(path: &Path) -> Result<FontVec> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read font file {:?}", path))?;
    FontVec::try_from_vec(bytes).with_context(|| format!("Failed to parse font file {:?}", path))
}

/// Render one label text centered on a white canvas
pub fn render_label_image(text: &str, font: &FontVec) -> RgbImage {
    let mut image = RgbImage::from_pixel(IMAGE_WIDTH, IMAGE_HEIGHT, Rgb([255, 255, 255]));

    let scale = PxScale::from(FONT_SCALE);
    let (text_width, text_height) = text_size(scale, font, text);

    let x = ((IMAGE_WIDTH as i32 - text_width as i32) / 2).max(0);
    let y = ((IMAGE_HEIGHT as i32 - text_height as i32) / 2).max(0);

    draw_text_mut(&mut image, Rgb([0, 0, 0]), x, y, scale, font, text);

    image
}

/// The manifest matching [`SAMPLE_TEXTS`]
pub fn manifest_content() -> String {
    let mut content = String::new();
    for (filename, text) in SAMPLE_TEXTS {
        content.push_str(filename);
        content.push('\t');
        content.push_str(text);
        content.push('\n');
    }
    content
}

/// Generate the sample dataset into `output_dir`.
///
/// Writes one image per entry of [`SAMPLE_TEXTS`] plus the `labels.txt`
/// manifest. Returns the number of images written.
pub fn generate_dataset(output_dir: &Path, font: &FontVec) -> Result<usize> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create dataset directory {:?}", output_dir))?;

    for (filename, text) in SAMPLE_TEXTS {
        let path = output_dir.join(filename);
        let image = render_label_image(text, font);
        image
            .save(&path)
            .with_context(|| format!("Failed to write image {:?}", path))?;
        info!("Created {:?}", path);
    }

    let labels_path = output_dir.join(LABELS_FILE);
    std::fs::write(&labels_path, manifest_content())
        .with_context(|| format!("Failed to write manifest {:?}", labels_path))?;

    info!(
        "Dataset created with {} samples at {:?}",
        SAMPLE_TEXTS.len(),
        output_dir
    );

    Ok(SAMPLE_TEXTS.len())
}
