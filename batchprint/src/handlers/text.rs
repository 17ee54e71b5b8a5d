//! Plain text files.
//!
//! Page counts simulate what a plain-text printer would do: wrap long lines
//! at a fixed column and break pages at a fixed line count. The result is
//! always reported as approximate.

use encoding_rs::{CoderResult, Encoding, GBK, UTF_8, UTF_16LE, WINDOWS_1252};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::{report_print, subject};
use crate::automation::{Launcher, ShellVerb, invoke_verb, launch, require_success};
use crate::config::PrintSettings;
use crate::document::FileType;
use crate::handler::{FallbackChain, Handler, HandlerError, PageCount, classify_failure};

/// Characters per printed line before wrapping.
pub const COLUMNS_PER_LINE: usize = 75;

/// Lines per printed page.
pub const LINES_PER_PAGE: usize = 50;

/// Minimum share of printable characters for a decoding to be accepted.
const MIN_PRINTABLE_RATIO: f64 = 0.8;

/// Bytes sampled when deciding whether a file is text.
const SAMPLE_BYTES: u64 = 2048;

/// Decodings tried, in order, when the file carries no byte order mark.
const CANDIDATES: [&Encoding; 4] = [UTF_8, GBK, UTF_16LE, WINDOWS_1252];

fn printable_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut printable = 0usize;
    for c in text.chars() {
        total += 1;
        if c != char::REPLACEMENT_CHARACTER && (!c.is_control() || matches!(c, '\n' | '\r' | '\t')) {
            printable += 1;
        }
    }
    if total == 0 { 1.0 } else { printable as f64 / total as f64 }
}

fn decode_as(encoding: &'static Encoding, bytes: &[u8], last: bool) -> Option<String> {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let mut text = String::with_capacity(decoder.max_utf8_buffer_length(bytes.len())?);
    let (result, _, had_errors) = decoder.decode_to_string(bytes, &mut text, last);
    (result == CoderResult::InputEmpty && !had_errors).then_some(text)
}

/// With `last` unset, a sequence cut off at the end of `bytes` is not an error.
fn decode(bytes: &[u8], last: bool) -> Option<String> {
    let with_bom = Encoding::for_bom(bytes)
        .and_then(|(encoding, bom_len)| decode_as(encoding, &bytes[bom_len..], last));
    if with_bom.is_some() {
        return with_bom;
    }

    CANDIDATES.iter().find_map(|&encoding| {
        let text = decode_as(encoding, bytes, last)?;
        if printable_ratio(&text) < MIN_PRINTABLE_RATIO {
            return None;
        }
        debug!(encoding = encoding.name(), "decoded text");
        Some(text)
    })
}

/// Decode raw bytes, honouring a byte order mark when present.
///
/// Returns `None` when no candidate encoding yields mostly printable text.
pub fn decode_text(bytes: &[u8]) -> Option<String> {
    decode(bytes, true)
}

/// Whether the start of the file decodes as text.
fn looks_like_text(path: &Path) -> bool {
    let mut sample = Vec::with_capacity(SAMPLE_BYTES as usize);
    let read = File::open(path).and_then(|file| file.take(SAMPLE_BYTES).read_to_end(&mut sample));
    match read {
        Ok(_) => decode(&sample, false).is_some(),
        Err(e) => {
            debug!(file = %subject(path), error = %e, "cannot sample text file");
            false
        }
    }
}

/// Pages needed to print `text`, at least one.
///
/// Trailing whitespace never causes a wrap. A final line break does not
/// start another line.
pub fn paginate(text: &str) -> usize {
    let lines: usize = text
        .lines()
        .map(|line| line.trim_end().chars().count().div_ceil(COLUMNS_PER_LINE).max(1))
        .sum();
    lines.div_ceil(LINES_PER_PAGE).max(1)
}

/// Estimates pages by simulated wrapping and prints through Notepad or the shell.
pub struct TextHandler {
    launcher: Arc<dyn Launcher>,
}

impl TextHandler {
    /// Create a handler spawning programs through `launcher`.
    pub fn new(launcher: Arc<dyn Launcher>) -> Self {
        Self { launcher }
    }

    fn print_with_notepad(&self, path: &Path, printer: Option<&str>) -> Result<(), HandlerError> {
        let launcher = self.launcher.as_ref();
        let notepad = launcher
            .locate("notepad")
            .ok_or_else(|| HandlerError::missing("notepad"))?;

        let file = path.display().to_string();
        let args = match printer {
            Some(name) => vec!["/pt".to_string(), file, name.to_string()],
            None => vec!["/p".to_string(), file],
        };
        let outcome = launch(launcher, &notepad, "notepad", &args, &[])?;
        require_success(outcome).map(|_| ())
    }
}

impl Handler for TextHandler {
    fn name(&self) -> &'static str {
        "text"
    }

    fn supported_file_types(&self) -> &[FileType] {
        &[FileType::Text]
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &[".txt"]
    }

    fn can_handle(&self, path: &Path) -> bool {
        path.is_file() && self.claims_extension(path) && looks_like_text(path)
    }

    fn count_pages(&self, path: &Path) -> Result<PageCount, HandlerError> {
        let bytes = std::fs::read(path).map_err(|e| classify_failure(&e.to_string()))?;
        let text = decode_text(&bytes)
            .ok_or_else(|| HandlerError::corrupted("unrecognised text encoding"))?;
        PageCount::estimated(paginate(&text) as i64)
    }

    fn print_document(&self, path: &Path, settings: &PrintSettings) -> bool {
        let launcher = self.launcher.as_ref();
        let printer = settings.printer_name();
        let print_verb = ShellVerb::print_on(printer);

        let result = FallbackChain::new(subject(path))
            .attempt("notepad", || self.print_with_notepad(path, printer))
            .attempt("print verb", || invoke_verb(launcher, path, &print_verb))
            .attempt("open", || invoke_verb(launcher, path, &ShellVerb::Open))
            .run();
        report_print(self.name(), path, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::testing::FakeLauncher;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case::empty("", 1)]
    #[case::short("hello\nworld\n", 1)]
    #[case::exactly_one_page(&"line\n".repeat(50), 1)]
    #[case::one_more_line(&"line\n".repeat(51), 2)]
    #[case::wrapped(&format!("{}\n", "x".repeat(151)).repeat(20), 2)]
    #[case::padded_to_width(&format!("{}{}\n", "x".repeat(75), " ".repeat(5)).repeat(50), 1)]
    #[case::blank_but_padded(&format!("{}\n", " ".repeat(200)).repeat(50), 1)]
    fn test_paginate(#[case] text: &str, #[case] pages: usize) {
        assert_eq!(paginate(text), pages);
    }

    #[test]
    fn test_blank_lines_count() {
        assert_eq!(paginate(&"\n".repeat(120)), 3);
    }

    #[test]
    fn test_decode_utf8_with_bom() {
        let bytes = b"\xEF\xBB\xBFhello";
        assert_eq!(decode_text(bytes).unwrap(), "hello");
    }

    #[test]
    fn test_decode_utf16_without_bom() {
        let bytes: Vec<u8> = "plain words".encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        assert_eq!(decode_text(&bytes).unwrap(), "plain words");
    }

    #[test]
    fn test_decode_gbk() {
        let (bytes, _, _) = GBK.encode("中文文本内容");
        assert_eq!(decode_text(&bytes).unwrap(), "中文文本内容");
    }

    #[test]
    fn test_decode_rejects_binary() {
        let mut bytes = vec![0u8; 256];
        bytes[..4].copy_from_slice(b"MZ\x90\0");
        assert!(decode_text(&bytes).is_none());
    }

    #[test]
    fn test_accepts_text_with_split_sequence_at_sample_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        let mut contents = "a".repeat(2047);
        contents.push('é');
        std::fs::write(&path, contents).unwrap();

        let handler = TextHandler::new(Arc::new(FakeLauncher::default()));
        assert!(handler.can_handle(&path));
    }

    #[test]
    fn test_rejects_binary_renamed_to_txt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("setup.txt");
        let mut bytes = vec![0u8; 4096];
        bytes[..4].copy_from_slice(b"MZ\x90\0");
        std::fs::write(&path, bytes).unwrap();

        let handler = TextHandler::new(Arc::new(FakeLauncher::default()));
        assert!(!handler.can_handle(&path));
        assert!(!handler.can_handle(&dir.path().join("absent.txt")));
    }

    #[test]
    fn test_count_pages_is_estimated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "row\n".repeat(101)).unwrap();

        let handler = TextHandler::new(Arc::new(FakeLauncher::default()));
        let count = handler.count_pages(&path).unwrap();
        assert_eq!(count.pages(), 3);
        assert!(count.is_approximate());
    }

    #[test]
    fn test_print_with_notepad_to_printer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hi").unwrap();
        let fake = Arc::new(FakeLauncher::with_programs(&["notepad"]));
        let mut settings = PrintSettings::new();
        settings.printer = Some("Front Desk".to_string());

        assert!(TextHandler::new(fake.clone()).print_document(&path, &settings));
        let calls = fake.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].args,
            vec!["/pt".to_string(), path.display().to_string(), "Front Desk".to_string()]
        );
    }

    #[test]
    fn test_print_without_any_tool_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hi").unwrap();

        let fake = Arc::new(FakeLauncher::default());
        assert!(!TextHandler::new(fake.clone()).print_document(&path, &PrintSettings::new()));
        assert!(fake.calls().is_empty());
    }
}
