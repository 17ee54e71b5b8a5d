//! PrintTicket based printer configuration.
//!
//! Windows exposes a printer's defaults as PrintTicket XML through the
//! `Get-PrintConfiguration`/`Set-PrintConfiguration` cmdlets. Only the
//! features batchprint manages are touched; everything else in the ticket is
//! written back unchanged.

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use std::sync::Arc;
use tracing::debug;

use super::{DevMode, PrinterBackend};
use crate::automation::{Launcher, launch, powershell, powershell_args, scripts};
use crate::config::{ColorMode, DuplexMode, Orientation, PaperSize};
use crate::{BatchPrintError, Result};

const COPIES_PARAMETER: &str = "psk:JobCopiesAllDocuments";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feature {
    Duplex,
    Color,
    Orientation,
    Paper,
}

impl Feature {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "psk:JobDuplexAllDocumentsContiguously" | "psk:DocumentDuplex" => Some(Self::Duplex),
            "psk:PageOutputColor" => Some(Self::Color),
            "psk:PageOrientation" => Some(Self::Orientation),
            "psk:PageMediaSize" => Some(Self::Paper),
            _ => None,
        }
    }

    /// Option name for the value `mode` holds; `None` leaves the option alone.
    fn option_for(&self, mode: &DevMode) -> Option<&'static str> {
        match self {
            Self::Duplex => Some(match mode.duplex {
                DuplexMode::Off => "psk:OneSided",
                DuplexMode::LongEdge => "psk:TwoSidedLongEdge",
                DuplexMode::ShortEdge => "psk:TwoSidedShortEdge",
            }),
            Self::Color => Some(match mode.color {
                ColorMode::Color => "psk:Color",
                ColorMode::Grayscale => "psk:Grayscale",
            }),
            Self::Orientation => Some(match mode.orientation {
                Orientation::Portrait => "psk:Portrait",
                Orientation::Landscape => "psk:Landscape",
            }),
            Self::Paper => mode.paper.map(|paper| match paper {
                PaperSize::A3 => "psk:ISOA3",
                PaperSize::A4 => "psk:ISOA4",
                PaperSize::A5 => "psk:ISOA5",
                PaperSize::Letter => "psk:NorthAmericaLetter",
                PaperSize::Legal => "psk:NorthAmericaLegal",
                PaperSize::Tabloid => "psk:NorthAmericaTabloid",
            }),
        }
    }

    fn apply_option(&self, option: &str, mode: &mut DevMode) {
        match self {
            Self::Duplex => {
                mode.duplex = match option {
                    "psk:TwoSidedLongEdge" => DuplexMode::LongEdge,
                    "psk:TwoSidedShortEdge" => DuplexMode::ShortEdge,
                    _ => DuplexMode::Off,
                }
            }
            Self::Color => {
                mode.color = if option == "psk:Color" {
                    ColorMode::Color
                } else {
                    ColorMode::Grayscale
                }
            }
            Self::Orientation => {
                mode.orientation = match option {
                    "psk:Landscape" | "psk:ReverseLandscape" => Orientation::Landscape,
                    _ => Orientation::Portrait,
                }
            }
            Self::Paper => {
                mode.paper = match option {
                    "psk:ISOA3" => Some(PaperSize::A3),
                    "psk:ISOA4" => Some(PaperSize::A4),
                    "psk:ISOA5" => Some(PaperSize::A5),
                    "psk:NorthAmericaLetter" => Some(PaperSize::Letter),
                    "psk:NorthAmericaLegal" => Some(PaperSize::Legal),
                    "psk:NorthAmericaTabloid" => Some(PaperSize::Tabloid),
                    _ => None,
                }
            }
        }
    }
}

fn name_attribute(element: &BytesStart<'_>) -> std::result::Result<Option<String>, String> {
    element
        .try_get_attribute("name")
        .map_err(|e| e.to_string())?
        .map(|attr| attr.unescape_value().map(|v| v.into_owned()).map_err(|e| e.to_string()))
        .transpose()
}

/// Tracks where the reader is inside a ticket.
#[derive(Default)]
struct Cursor {
    feature: Option<Feature>,
    in_copies: bool,
    in_value: bool,
}

impl Cursor {
    fn enter(&mut self, element: &BytesStart<'_>) -> std::result::Result<(), String> {
        match element.local_name().as_ref() {
            b"Feature" => self.feature = name_attribute(element)?.as_deref().and_then(Feature::from_name),
            b"ParameterInit" => self.in_copies = name_attribute(element)?.as_deref() == Some(COPIES_PARAMETER),
            b"Value" if self.in_copies => self.in_value = true,
            _ => {}
        }
        Ok(())
    }

    fn leave(&mut self, local_name: &[u8]) {
        match local_name {
            b"Feature" => self.feature = None,
            b"ParameterInit" => self.in_copies = false,
            b"Value" => self.in_value = false,
            _ => {}
        }
    }

    fn option_feature(&self, element: &BytesStart<'_>) -> Option<Feature> {
        (element.local_name().as_ref() == b"Option").then_some(self.feature).flatten()
    }
}

/// Read the managed fields from a PrintTicket.
///
/// Features missing from the ticket keep their [`DevMode::default`] values.
///
/// # Errors
///
/// Returns a description of the XML error.
pub fn parse_ticket(xml: &str) -> std::result::Result<DevMode, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut cursor = Cursor::default();
    let mut mode = DevMode::default();

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => {
                if let Some(feature) = cursor.option_feature(&e)
                    && let Some(option) = name_attribute(&e)?
                {
                    feature.apply_option(&option, &mut mode);
                }
                cursor.enter(&e)?;
            }
            Event::Empty(e) => {
                if let Some(feature) = cursor.option_feature(&e)
                    && let Some(option) = name_attribute(&e)?
                {
                    feature.apply_option(&option, &mut mode);
                }
            }
            Event::Text(text) if cursor.in_value => {
                let value = text.unescape().map_err(|e| e.to_string())?;
                if let Ok(copies) = value.trim().parse::<u16>() {
                    mode.copies = copies.max(1);
                }
            }
            Event::End(e) => cursor.leave(e.local_name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(mode)
}

/// Rewrite the managed fields of a PrintTicket to match `mode`.
///
/// A replaced option loses its child properties; the driver fills them in
/// from the option name when the ticket is applied.
///
/// # Errors
///
/// Returns a description of the XML error.
pub fn rewrite_ticket(xml: &str, mode: &DevMode) -> std::result::Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut cursor = Cursor::default();

    loop {
        let event = reader.read_event().map_err(|e| e.to_string())?;
        match event {
            Event::Start(e) => {
                if let Some(option) = cursor.option_feature(&e).and_then(|f| f.option_for(mode)) {
                    let end = e.name().as_ref().to_vec();
                    reader.read_to_end(QName(&end)).map_err(|e| e.to_string())?;
                    writer
                        .write_event(Event::Empty(replaced_option(&e, option)))
                        .map_err(|e| e.to_string())?;
                    continue;
                }
                cursor.enter(&e)?;
                writer.write_event(Event::Start(e)).map_err(|e| e.to_string())?;
            }
            Event::Empty(e) => {
                let event = match cursor.option_feature(&e).and_then(|f| f.option_for(mode)) {
                    Some(option) => Event::Empty(replaced_option(&e, option)),
                    None => Event::Empty(e),
                };
                writer.write_event(event).map_err(|e| e.to_string())?;
            }
            Event::Text(_) if cursor.in_value => {
                let copies = mode.copies.to_string();
                writer
                    .write_event(Event::Text(BytesText::new(&copies)))
                    .map_err(|e| e.to_string())?;
            }
            Event::End(e) => {
                cursor.leave(e.local_name().as_ref());
                writer.write_event(Event::End(e)).map_err(|e| e.to_string())?;
            }
            Event::Eof => break,
            other => writer.write_event(other).map_err(|e| e.to_string())?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())
}

fn replaced_option(original: &BytesStart<'_>, option: &str) -> BytesStart<'static> {
    let tag = String::from_utf8_lossy(original.name().as_ref()).into_owned();
    BytesStart::new(tag).with_attributes([("name", option)])
}

/// [`PrinterBackend`] driving PrintTicket cmdlets through PowerShell.
pub struct PrintTicketBackend {
    launcher: Arc<dyn Launcher>,
}

impl PrintTicketBackend {
    /// Create a backend spawning PowerShell through `launcher`.
    pub fn new(launcher: Arc<dyn Launcher>) -> Self {
        Self { launcher }
    }

    fn run(&self, printer: &str, script: &str, ticket: Option<String>) -> Result<String> {
        let launcher = self.launcher.as_ref();
        let program = powershell(launcher)
            .ok_or_else(|| BatchPrintError::printer_config(printer, "PowerShell is not available"))?;

        let mut env = vec![("BATCHPRINT_PRINTER", printer.to_string())];
        if let Some(ticket) = ticket {
            env.push(("BATCHPRINT_TICKET", ticket));
        }

        let outcome = launch(launcher, &program, "PowerShell", &powershell_args(script), &env)
            .map_err(|e| BatchPrintError::printer_config(printer, e.to_string()))?;
        if !outcome.success() {
            return Err(BatchPrintError::printer_config(printer, outcome.detail()));
        }
        Ok(outcome.stdout)
    }

    fn read_ticket(&self, printer: &str) -> Result<String> {
        let xml = self.run(printer, scripts::PRINT_TICKET_GET, None)?;
        if xml.trim().is_empty() {
            return Err(BatchPrintError::printer_config(printer, "empty PrintTicket"));
        }
        Ok(xml)
    }
}

impl PrinterBackend for PrintTicketBackend {
    fn read(&self, printer: &str) -> Result<DevMode> {
        let xml = self.read_ticket(printer)?;
        let mode = parse_ticket(&xml).map_err(|e| BatchPrintError::printer_config(printer, e))?;
        debug!(printer, %mode, "read PrintTicket");
        Ok(mode)
    }

    fn write(&self, printer: &str, mode: &DevMode) -> Result<()> {
        let current = self.read_ticket(printer)?;
        let updated = rewrite_ticket(&current, mode).map_err(|e| BatchPrintError::printer_config(printer, e))?;
        self.run(printer, scripts::PRINT_TICKET_SET, Some(updated))?;
        debug!(printer, %mode, "wrote PrintTicket");
        Ok(())
    }
}
