//! Shared fixtures for the integration tests.
//!
//! Fixtures are generated into temporary directories; external engines are
//! replaced by in-process stand-ins so the tests run on any machine.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use batchprint::automation::{
    BundledViewer, CommandOutcome, Launcher, OfficeApp, OfficeEngine, OfficeMeasurement,
};
use batchprint::config::PrintSettings;
use batchprint::handlers::Engines;
use batchprint::{FileType, Handler, HandlerError, HandlerRegistry, PageCount};
use lopdf::{Document, Object, dictionary};
use tiff::encoder::{TiffEncoder, colortype};

/// Write a PDF with `pages` blank pages.
pub fn write_pdf(path: &Path, pages: usize) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(pages);
    for _ in 0..pages {
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }
        .into(),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// Write a file shaped like a password-protected Office package: an OLE
/// compound file behind an OOXML extension.
pub fn write_encrypted(path: &Path) {
    let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    bytes.resize(512, 0);
    File::create(path).unwrap().write_all(&bytes).unwrap();
}

/// Write a grayscale TIFF with `frames` pages.
pub fn write_tiff(path: &Path, frames: usize) {
    let mut file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(&mut file).unwrap();
    for _ in 0..frames {
        encoder
            .write_image::<colortype::Gray8>(8, 8, &[64u8; 64])
            .unwrap();
    }
}

/// Write a small PNG.
pub fn write_png(path: &Path) {
    image::RgbImage::from_pixel(8, 8, image::Rgb([0, 128, 255]))
        .save(path)
        .unwrap();
}

/// Write a text file and return its path.
pub fn write_text(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// Launcher for a machine without any external program.
#[derive(Debug, Default)]
pub struct NoPrograms;

impl Launcher for NoPrograms {
    fn run(&self, program: &Path, _args: &[String], _env: &[(&str, String)]) -> io::Result<CommandOutcome> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} not found", program.display()),
        ))
    }

    fn locate(&self, _program: &str) -> Option<PathBuf> {
        None
    }
}

/// Office suite answering every measurement with a fixed reply per app.
#[derive(Default)]
pub struct StubOffice {
    replies: HashMap<OfficeApp, OfficeMeasurement>,
    prints: Mutex<Vec<(OfficeApp, PathBuf)>>,
}

impl StubOffice {
    pub fn with_reply(mut self, app: OfficeApp, reply: OfficeMeasurement) -> Self {
        self.replies.insert(app, reply);
        self
    }

    pub fn prints(&self) -> Vec<(OfficeApp, PathBuf)> {
        self.prints.lock().unwrap().clone()
    }
}

impl OfficeEngine for StubOffice {
    fn is_available(&self, app: OfficeApp) -> bool {
        self.replies.contains_key(&app)
    }

    fn measure(&self, app: OfficeApp, _path: &Path) -> Result<OfficeMeasurement, HandlerError> {
        self.replies
            .get(&app)
            .cloned()
            .ok_or_else(|| HandlerError::missing(app.display_name()))
    }

    fn print(&self, app: OfficeApp, path: &Path, _settings: &PrintSettings) -> Result<(), HandlerError> {
        if !self.is_available(app) {
            return Err(HandlerError::missing(app.display_name()));
        }
        self.prints.lock().unwrap().push((app, path.to_path_buf()));
        Ok(())
    }
}

/// Engines built around `office`, with no programs and no bundled viewer.
pub fn engines(office: StubOffice) -> Engines {
    Engines {
        launcher: Arc::new(NoPrograms),
        office: Arc::new(office),
        viewer: BundledViewer::new("/nonexistent/batchprint-viewer"),
    }
}

/// Handler driven by file contents, for printing and timing scenarios.
///
/// Content `fail` makes the job fail, `slow` blocks for [`SLOW_CALL`],
/// anything else succeeds. Counting reports the number of lines.
pub struct ScriptedHandler {
    name: &'static str,
    extensions: &'static [&'static str],
    file_types: &'static [FileType],
    log: Mutex<Vec<(String, PrintSettings)>>,
}

/// How long a `slow` document blocks.
pub const SLOW_CALL: Duration = Duration::from_secs(3);

impl ScriptedHandler {
    pub fn new(name: &'static str, extensions: &'static [&'static str]) -> Self {
        Self {
            name,
            extensions,
            file_types: &[FileType::Text, FileType::Pdf],
            log: Mutex::new(Vec::new()),
        }
    }

    /// Handler for `.txt` and `.pdf`.
    pub fn plain() -> Self {
        Self::new("scripted", &[".txt", ".pdf"])
    }

    /// File names printed so far, in order.
    pub fn printed(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Settings passed with each print call.
    pub fn settings_seen(&self) -> Vec<PrintSettings> {
        self.log.lock().unwrap().iter().map(|(_, s)| s.clone()).collect()
    }

    fn script(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap_or_default()
    }
}

impl Handler for ScriptedHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supported_file_types(&self) -> &[FileType] {
        self.file_types
    }

    fn supported_extensions(&self) -> &[&'static str] {
        self.extensions
    }

    fn count_pages(&self, path: &Path) -> Result<PageCount, HandlerError> {
        let script = Self::script(path);
        match script.trim() {
            "fail" => Err(HandlerError::corrupted("scripted failure")),
            "slow" => {
                std::thread::sleep(SLOW_CALL);
                PageCount::exact(1)
            }
            "zero" => PageCount::exact(0),
            _ => PageCount::exact(script.lines().count().max(1) as i64),
        }
    }

    fn print_document(&self, path: &Path, settings: &PrintSettings) -> bool {
        let script = Self::script(path);
        if script.trim() == "slow" {
            std::thread::sleep(SLOW_CALL);
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.log.lock().unwrap().push((name, settings.clone()));
        script.trim() != "fail"
    }
}

/// Registry holding only `handler`.
pub fn registry_of(handler: Arc<ScriptedHandler>) -> HandlerRegistry {
    HandlerRegistry::with_handlers([handler as Arc<dyn Handler>])
}
