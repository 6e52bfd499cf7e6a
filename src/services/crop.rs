use super::image_set::{CROPPED_SUBDIR, list_images};
use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use image::GenericImageView;
use std::fs;

/// Summary of a crop run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CropReport {
    pub processed: usize,
    pub skipped: Vec<String>,
    pub output_dir: Utf8PathBuf,
}

/// Rows removed from an image of `height` pixels.
pub fn rows_to_crop(height: u32, fraction: f64) -> u32 {
    ((height as f64 * fraction).round() as u32).min(height.saturating_sub(1))
}

/// Trim `fraction` of the height off the bottom of every pool image in
/// `source_dir` and write the results to `source_dir/_cropped/`.
///
/// Files whose dimensions can't be read are skipped and listed in the report.
pub fn crop_bottom(source_dir: &Utf8Path, fraction: f64) -> Result<CropReport> {
    if !(0.0..1.0).contains(&fraction) {
        bail!("Crop fraction must be in [0, 1), got {}", fraction);
    }

    let output_dir = source_dir.join(CROPPED_SUBDIR);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir))?;

    tracing::info!("Cropping images in {} (fraction {:.2})", source_dir, fraction);

    let mut report = CropReport {
        output_dir: output_dir.clone(),
        ..CropReport::default()
    };

    for path in list_images(source_dir)? {
        let Some(name) = path.file_name() else { continue };

        let img = match image::open(&path) {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!("Skip {}: {}", name, e);
                report.skipped.push(name.to_string());
                continue;
            }
        };

        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            tracing::warn!("Skip {}: missing dimensions", name);
            report.skipped.push(name.to_string());
            continue;
        }

        let crop_rows = rows_to_crop(height, fraction);
        let out_path = output_dir.join(name);
        img.crop_imm(0, 0, width, height - crop_rows)
            .save(&out_path)
            .with_context(|| format!("Failed to write cropped image: {}", out_path))?;

        report.processed += 1;
        tracing::info!(
            "{} -> {}/{} (removed {}px ~ {:.0}%)",
            name,
            CROPPED_SUBDIR,
            name,
            crop_rows,
            fraction * 100.0
        );
    }

    tracing::info!(
        "Cropped {} files, skipped {}. Output: {}",
        report.processed,
        report.skipped.len(),
        report.output_dir
    );
    Ok(report)
}
