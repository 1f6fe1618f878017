//! Raster image pipeline.
//!
//! Every file matched by `images.sources` (`img/src/*.*` by default, so
//! dotfiles and extensionless names are never picked up), except SVG,
//! goes through three passes:
//!
//! 1. AVIF at the configured quality and speed
//! 2. lossless WebP
//! 3. optimized original format: PNG re-encoded with best compression and
//!    adaptive filtering, JPEG re-encoded at the configured quality, the
//!    smaller of re-encoded and original bytes kept; other formats copied
//!
//! Each pass checks staleness against its own derived file, so a pass only
//! touches sources that are newer than (or missing) its output. Files in a
//! pass are converted in parallel with rayon.
//!
//! AVIF sources are skipped with a warning: the `image` crate encodes AVIF
//! but cannot decode it.

use super::{extension, file_stem, read_bytes, write_output, TaskError, TaskOutcome};
use crate::build::{discover_files, is_stale, BuildContext};
use crate::config::ImagesConfig;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::DynamicImage;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// One conversion pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePass {
    /// Encode to AVIF
    Avif,
    /// Encode to lossless WebP
    Webp,
    /// Recompress in the source's own format
    Optimize,
}

impl ImagePass {
    /// Passes in execution order.
    pub const ALL: [ImagePass; 3] = [ImagePass::Avif, ImagePass::Webp, ImagePass::Optimize];

    /// Derived file this pass writes for `source`, or `None` when the pass
    /// does not apply.
    ///
    /// WebP sources skip the optimize pass: its output would be the WebP
    /// pass's file.
    pub fn derived_path(&self, source: &Path, dest: &Path) -> Option<PathBuf> {
        let stem = file_stem(source);
        match self {
            ImagePass::Avif => Some(dest.join(format!("{}.avif", stem))),
            ImagePass::Webp => Some(dest.join(format!("{}.webp", stem))),
            ImagePass::Optimize => {
                let ext = extension(source);
                if ext == "webp" {
                    return None;
                }
                let name = source.file_name()?;
                Some(dest.join(name))
            }
        }
    }
}

/// Whether a staging file is a candidate raster source.
pub fn is_raster_source(path: &Path) -> bool {
    extension(path) != "svg"
}

/// Whether the source can be decoded at all.
pub fn is_decodable_source(path: &Path) -> bool {
    extension(path) != "avif"
}

fn decode(path: &Path) -> Result<DynamicImage, TaskError> {
    image::open(path).map_err(|source| TaskError::Image { path: path.to_path_buf(), source })
}

/// Encoders below accept 8-bit RGB(A) only.
fn to_rgb8_family(img: DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}

/// Encode a source to AVIF.
pub fn encode_avif(source: &Path, config: &ImagesConfig) -> Result<Vec<u8>, TaskError> {
    let img = to_rgb8_family(decode(source)?);
    let mut out = Vec::new();
    img.write_with_encoder(AvifEncoder::new_with_speed_quality(
        &mut out,
        config.avif_speed,
        config.avif_quality,
    ))
    .map_err(|e| TaskError::Image { path: source.to_path_buf(), source: e })?;
    Ok(out)
}

/// Encode a source to lossless WebP.
pub fn encode_webp(source: &Path) -> Result<Vec<u8>, TaskError> {
    let img = to_rgb8_family(decode(source)?);
    let mut out = Vec::new();
    img.write_with_encoder(WebPEncoder::new_lossless(&mut out))
        .map_err(|e| TaskError::Image { path: source.to_path_buf(), source: e })?;
    Ok(out)
}

/// Recompress a source in its own format, keeping whichever is smaller.
pub fn optimize(source: &Path, config: &ImagesConfig) -> Result<Vec<u8>, TaskError> {
    let original = read_bytes(source)?;
    let reencoded = match extension(source).as_str() {
        "png" => {
            let img = decode(source)?;
            let mut out = Vec::new();
            img.write_with_encoder(PngEncoder::new_with_quality(
                &mut out,
                CompressionType::Best,
                FilterType::Adaptive,
            ))
            .map_err(|e| TaskError::Image { path: source.to_path_buf(), source: e })?;
            Some(out)
        }
        "jpg" | "jpeg" => {
            let img = DynamicImage::ImageRgb8(decode(source)?.to_rgb8());
            let mut out = Vec::new();
            img.write_with_encoder(JpegEncoder::new_with_quality(&mut out, config.jpeg_quality))
                .map_err(|e| TaskError::Image { path: source.to_path_buf(), source: e })?;
            Some(out)
        }
        _ => {
            // Still has to be an image.
            decode(source)?;
            None
        }
    };

    Ok(match reencoded {
        Some(bytes) if bytes.len() < original.len() => bytes,
        _ => original,
    })
}

fn run_pass(
    pass: ImagePass,
    sources: &[PathBuf],
    dest: &Path,
    config: &ImagesConfig,
) -> Result<Vec<PathBuf>, TaskError> {
    let mut stale = Vec::new();
    for source in sources {
        let Some(derived) = pass.derived_path(source, dest) else {
            continue;
        };
        if is_stale(source, &derived).map_err(|e| TaskError::io(source, e))? {
            stale.push((source, derived));
        }
    }

    tracing::debug!(?pass, stale = stale.len(), total = sources.len(), "image pass");

    stale
        .par_iter()
        .map(|(source, derived)| {
            let bytes = match pass {
                ImagePass::Avif => encode_avif(source, config)?,
                ImagePass::Webp => encode_webp(source)?,
                ImagePass::Optimize => optimize(source, config)?,
            };
            write_output(derived, &bytes)
        })
        .collect()
}

/// Run the `images` task.
pub fn run(ctx: &BuildContext) -> Result<TaskOutcome, TaskError> {
    let config = &ctx.config().images;
    let dest = ctx.in_root(&config.dest);

    let mut outcome = TaskOutcome::new();
    let mut sources = Vec::new();
    for path in discover_files(&ctx.root_dir(), &config.sources)? {
        if !is_raster_source(&path) {
            continue;
        }
        if !is_decodable_source(&path) {
            outcome.warn(format!("{}: AVIF sources cannot be decoded, skipped", path.display()));
            continue;
        }
        sources.push(path);
    }

    for pass in ImagePass::ALL {
        outcome.outputs.extend(run_pass(pass, &sources, &dest, config)?);
    }
    Ok(outcome)
}
