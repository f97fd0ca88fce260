//! Best-effort timestamp for a media file: embedded EXIF capture time first,
//! filesystem modification time second.

use std::{fmt, fs, io::BufReader, path::Path, str};

use chrono::{DateTime, Local, NaiveDateTime};
use exif::{Exif, In, Tag, Value};
use tracing::debug;

/// Layout of every EXIF date/time field.
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Day-bucket folder name layout.
pub const FOLDER_FORMAT: &str = "%Y-%m-%d";

/// The EXIF slots consulted for a capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTag {
    DateTimeOriginal,
    DateTimeDigitized,
    DateTime,
}

impl CaptureTag {
    /// Lookup order, first present slot wins.
    pub const PRIORITY: [CaptureTag; 3] = [
        CaptureTag::DateTimeOriginal,
        CaptureTag::DateTimeDigitized,
        CaptureTag::DateTime,
    ];

    fn exif_tag(self) -> Tag {
        match self {
            CaptureTag::DateTimeOriginal => Tag::DateTimeOriginal,
            CaptureTag::DateTimeDigitized => Tag::DateTimeDigitized,
            CaptureTag::DateTime => Tag::DateTime,
        }
    }
}

impl fmt::Display for CaptureTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            CaptureTag::DateTimeOriginal => "DateTimeOriginal",
            CaptureTag::DateTimeDigitized => "DateTimeDigitized",
            CaptureTag::DateTime => "DateTime",
        };
        f.write_str(name)
    }
}

/// Result of looking for a capture time inside the file itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOutcome {
    Found {
        tag: CaptureTag,
        datetime: NaiveDateTime,
    },
    /// Unreadable file, no EXIF block, no usable tag or a malformed value.
    Missing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    Metadata(CaptureTag),
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDate {
    pub datetime: NaiveDateTime,
    pub source: DateSource,
}

impl ResolvedDate {
    pub fn folder_name(&self) -> String {
        self.datetime.format(FOLDER_FORMAT).to_string()
    }
}

/// Returns `None` only when neither the metadata nor the modification time
/// could be read.
pub fn resolve(path: &Path) -> Option<ResolvedDate> {
    match read_metadata(path) {
        MetadataOutcome::Found { tag, datetime } => {
            debug!("{}: {tag} found: {datetime}", path.display());
            Some(ResolvedDate {
                datetime,
                source: DateSource::Metadata(tag),
            })
        }
        MetadataOutcome::Missing(reason) => {
            debug!(
                "{}: no capture time ({reason}), falling back to modification time",
                path.display()
            );
            read_modified(path).map(|datetime| ResolvedDate {
                datetime,
                source: DateSource::Modified,
            })
        }
    }
}

pub fn read_metadata(path: &Path) -> MetadataOutcome {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) => return MetadataOutcome::Missing(format!("cannot open file: {e}")),
    };

    let mut bufreader = BufReader::new(&file);
    let exif = match exif::Reader::new().read_from_container(&mut bufreader) {
        Ok(exif) => exif,
        Err(e) => return MetadataOutcome::Missing(format!("cannot read EXIF metadata: {e}")),
    };

    capture_time(&exif)
}

/// Only the first non-empty slot is parsed; a malformed value there does not
/// fall through to the next slot.
fn capture_time(exif: &Exif) -> MetadataOutcome {
    let first = CaptureTag::PRIORITY.iter().find_map(|&tag| {
        exif.get_field(tag.exif_tag(), In::PRIMARY)
            .and_then(|field| ascii_bytes(&field.value))
            .map(|bytes| (tag, bytes))
    });

    let (tag, bytes) = match first {
        Some(found) => found,
        None => return MetadataOutcome::Missing("no capture date tag".to_string()),
    };

    let value = match str::from_utf8(bytes) {
        Ok(value) => value,
        Err(e) => return MetadataOutcome::Missing(format!("malformed {tag} value: {e}")),
    };

    match NaiveDateTime::parse_from_str(value, EXIF_DATETIME_FORMAT) {
        Ok(datetime) => MetadataOutcome::Found { tag, datetime },
        Err(e) => MetadataOutcome::Missing(format!("malformed {tag} value {value:?}: {e}")),
    }
}

/// First ASCII component with trailing NULs stripped, if non-empty.
fn ascii_bytes(value: &Value) -> Option<&[u8]> {
    match value {
        Value::Ascii(array) => array
            .first()
            .map(|bytes| {
                let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                &bytes[..end]
            })
            .filter(|bytes| !bytes.is_empty()),
        _ => None,
    }
}

/// Modification time converted to the local calendar.
pub fn read_modified(path: &Path) -> Option<NaiveDateTime> {
    match fs::metadata(path).and_then(|md| md.modified()) {
        Ok(modified) => Some(DateTime::<Local>::from(modified).naive_local()),
        Err(e) => {
            debug!("{}: cannot read modification time: {e}", path.display());
            None
        }
    }
}
