//! Static readers for Office Open XML packages.
//!
//! These work without an office suite installed. They only read what the
//! package already records, so results from `docProps/app.xml` are the
//! values saved by the last editor, not a fresh pagination.

use quick_xml::Reader;
use quick_xml::events::Event;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::document::extension_of;
use crate::handler::HandlerError;

/// Signature of an OLE compound file.
const CFB_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const OOXML_EXTENSIONS: &[&str] = &[".docx", ".pptx", ".xlsx"];

/// Whether the file starts with the OLE compound file signature.
///
/// # Errors
///
/// Returns the I/O error if the file cannot be read.
pub fn is_compound_file(path: &Path) -> io::Result<bool> {
    let mut header = [0u8; 8];
    let mut file = File::open(path)?;
    match file.read_exact(&mut header) {
        Ok(()) => Ok(header == CFB_MAGIC),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Reject password-protected OOXML files before any engine is started.
///
/// Office stores encrypted `.docx`/`.pptx`/`.xlsx` files as OLE compound
/// files instead of zip packages. Legacy binary formats are compound files
/// by nature and are not checked.
///
/// # Errors
///
/// [`HandlerError::Encrypted`] for an encrypted package or an unreadable file.
pub fn ensure_not_encrypted(path: &Path) -> Result<(), HandlerError> {
    let is_ooxml = extension_of(path)
        .map(|ext| OOXML_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);
    if !is_ooxml {
        return Ok(());
    }

    match is_compound_file(path) {
        Ok(true) => Err(HandlerError::encrypted("password-protected package")),
        Ok(false) => Ok(()),
        Err(e) => Err(HandlerError::encrypted(format!("cannot read file: {e}"))),
    }
}

fn open_package(path: &Path) -> Result<ZipArchive<File>, HandlerError> {
    let file = File::open(path).map_err(|e| HandlerError::encrypted(format!("cannot read file: {e}")))?;
    ZipArchive::new(file).map_err(zip_error)
}

fn zip_error(err: ZipError) -> HandlerError {
    match err {
        ZipError::Io(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            HandlerError::encrypted(e.to_string())
        }
        ZipError::UnsupportedArchive(detail) if detail.contains("Password") => {
            HandlerError::encrypted(detail)
        }
        other => HandlerError::corrupted(format!("not a valid package: {other}")),
    }
}

/// Count `ppt/slides/slideN.xml` parts in a presentation package.
///
/// # Errors
///
/// [`HandlerError::Corrupted`] for an invalid package.
pub fn count_slide_parts(path: &Path) -> Result<i64, HandlerError> {
    let archive = open_package(path)?;
    let count = archive.file_names().filter(|name| is_slide_part(name)).count();
    Ok(count as i64)
}

fn is_slide_part(name: &str) -> bool {
    name.strip_prefix("ppt/slides/slide")
        .and_then(|rest| rest.strip_suffix(".xml"))
        .map(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// Read an integer property such as `Pages` or `Slides` from `docProps/app.xml`.
///
/// Returns `Ok(None)` when the package has no such property.
///
/// # Errors
///
/// [`HandlerError::Corrupted`] for an invalid package or malformed XML.
pub fn read_app_property(path: &Path, property: &str) -> Result<Option<i64>, HandlerError> {
    let mut archive = open_package(path)?;
    let mut xml = String::new();
    match archive.by_name("docProps/app.xml") {
        Ok(mut part) => {
            part.read_to_string(&mut xml)
                .map_err(|e| HandlerError::corrupted(format!("docProps/app.xml: {e}")))?;
        }
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(zip_error(e)),
    }
    parse_app_property(&xml, property)
}

fn parse_app_property(xml: &str, property: &str) -> Result<Option<i64>, HandlerError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut inside = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => inside = e.local_name().as_ref() == property.as_bytes(),
            Ok(Event::Text(text)) if inside => {
                let value = text
                    .unescape()
                    .map_err(|e| HandlerError::corrupted(format!("docProps/app.xml: {e}")))?;
                return Ok(value.trim().parse::<i64>().ok());
            }
            Ok(Event::End(_)) => inside = false,
            Ok(Event::Eof) => return Ok(None),
            Ok(_) => {}
            Err(e) => return Err(HandlerError::corrupted(format!("docProps/app.xml: {e}"))),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Minimal packages written at test time.

    use std::fs::File;
    use std::io::Write;
    use std::path::Path;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    pub fn write_package(path: &Path, parts: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, body) in parts {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    pub fn app_xml(property: &str, value: u32) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <Properties xmlns=\"http://schemas.openxmlformats.org/officeDocument/2006/extended-properties\">\
             <Application>Microsoft Office</Application><{property}>{value}</{property}></Properties>"
        )
    }

    pub fn write_pptx(path: &Path, slides: usize) {
        let names: Vec<String> = (1..=slides)
            .map(|i| format!("ppt/slides/slide{i}.xml"))
            .collect();
        let mut parts: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), "<p:sld/>")).collect();
        parts.push(("ppt/slides/_rels/slide1.xml.rels", "<Relationships/>"));
        parts.push(("ppt/presentation.xml", "<p:presentation/>"));
        write_package(path, &parts);
    }

    pub fn write_encrypted(path: &Path) {
        let mut bytes = super::CFB_MAGIC.to_vec();
        bytes.extend_from_slice(&[0u8; 504]);
        std::fs::write(path, bytes).unwrap();
    }
}
