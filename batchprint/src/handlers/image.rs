//! Raster images.

use image::ImageReader;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use tiff::decoder::Decoder as TiffDecoder;
use tracing::debug;

use super::{report_print, subject};
use crate::automation::{BundledViewer, Launcher, ShellVerb, invoke_verb};
use crate::config::PrintSettings;
use crate::document::{FileType, extension_of};
use crate::handler::{FallbackChain, Handler, HandlerError, PageCount, classify_failure};

/// Files shorter than this cannot hold a valid image header.
const MIN_IMAGE_BYTES: u64 = 10;

/// Bytes read for signature sniffing.
const SNIFF_BYTES: usize = 32;

/// Formats without a leading signature; only their extension is checked.
const UNSNIFFABLE: &[&str] = &[".tga", ".dib"];

const MULTI_FRAME: &[&str] = &[".tif", ".tiff"];

/// One page per image, one page per frame for TIFF.
///
/// Printing tries the bundled viewer, then the shell print verb, and finally
/// opens the image for manual printing.
pub struct ImageHandler {
    launcher: Arc<dyn Launcher>,
    viewer: BundledViewer,
}

impl ImageHandler {
    /// Create a handler printing through `viewer` or the shell.
    pub fn new(launcher: Arc<dyn Launcher>, viewer: BundledViewer) -> Self {
        Self { launcher, viewer }
    }
}

fn has_image_signature(path: &Path) -> bool {
    let mut header = Vec::with_capacity(SNIFF_BYTES);
    let read = File::open(path).and_then(|f| f.take(SNIFF_BYTES as u64).read_to_end(&mut header));
    read.is_ok() && image::guess_format(&header).is_ok()
}

/// Count frames by advancing through the image directory chain.
fn tiff_frames(path: &Path) -> Result<i64, HandlerError> {
    let file = File::open(path).map_err(|e| classify_failure(&e.to_string()))?;
    let mut decoder =
        TiffDecoder::new(BufReader::new(file)).map_err(|e| classify_failure(&format!("TIFF: {e}")))?;

    let mut frames = 1;
    while decoder.more_images() {
        decoder
            .next_image()
            .map_err(|e| classify_failure(&format!("TIFF frame {}: {e}", frames + 1)))?;
        frames += 1;
    }
    Ok(frames)
}

/// Check that the header decodes; formats the decoder does not know pass.
fn verify_header(path: &Path) -> Result<(), HandlerError> {
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| classify_failure(&e.to_string()))?;
    if reader.format().is_none() {
        debug!(file = %subject(path), "unknown image format, assuming one page");
        return Ok(());
    }
    reader
        .into_dimensions()
        .map(|_| ())
        .map_err(|e| classify_failure(&e.to_string()))
}

impl Handler for ImageHandler {
    fn name(&self) -> &'static str {
        "image"
    }

    fn supported_file_types(&self) -> &[FileType] {
        &[FileType::Image]
    }

    fn supported_extensions(&self) -> &[&'static str] {
        FileType::Image.extensions()
    }

    fn can_handle(&self, path: &Path) -> bool {
        if !path.is_file() || !self.claims_extension(path) {
            return false;
        }
        let large_enough = std::fs::metadata(path)
            .map(|m| m.len() >= MIN_IMAGE_BYTES)
            .unwrap_or(false);
        if !large_enough {
            return false;
        }
        let sniffable = extension_of(path)
            .map(|ext| !UNSNIFFABLE.contains(&ext.as_str()))
            .unwrap_or(false);
        !sniffable || has_image_signature(path)
    }

    fn count_pages(&self, path: &Path) -> Result<PageCount, HandlerError> {
        let multi_frame = extension_of(path)
            .map(|ext| MULTI_FRAME.contains(&ext.as_str()))
            .unwrap_or(false);

        if multi_frame {
            PageCount::exact(tiff_frames(path)?)
        } else {
            verify_header(path)?;
            PageCount::exact(1)
        }
    }

    fn print_document(&self, path: &Path, settings: &PrintSettings) -> bool {
        let launcher = self.launcher.as_ref();
        let print_verb = ShellVerb::print_on(settings.printer_name());

        let result = FallbackChain::new(subject(path))
            .attempt_if(self.viewer.is_available(), "bundled viewer", || {
                self.viewer.print(launcher, path, settings)
            })
            .attempt("print verb", || invoke_verb(launcher, path, &print_verb))
            .attempt("open", || invoke_verb(launcher, path, &ShellVerb::Open))
            .run();
        report_print(self.name(), path, result)
    }
}
