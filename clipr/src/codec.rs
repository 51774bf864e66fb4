//! Cross-desktop clipboard encodings.
//!
//! Two encodings coexist on Linux desktops and neither is a superset of the
//! other, so every copy/cut writes both and a paste consults both:
//!
//! - KDE: `text/uri-list` plus an `application/x-kde-cutselection` side flag
//!   (`1` for cut, `0` for copy).
//! - GNOME: `x-special/gnome-copied-files` whose payload starts with a
//!   `copy` or `cut` line followed by one URI per line.

use bytes::Bytes;
use compact_str::CompactString;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{ClipError, ClipResult};
use crate::item::{ClipboardOperation, ClipboardSet};

pub const MIME_URI_LIST: &str = "text/uri-list";
pub const MIME_KDE_CUT_SELECTION: &str = "application/x-kde-cutselection";
pub const MIME_GNOME_COPIED_FILES: &str = "x-special/gnome-copied-files";

/// Format-tagged clipboard payloads, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeData {
    formats: IndexMap<CompactString, Bytes>,
}

impl MimeData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, format: &str, data: impl Into<Bytes>) {
        self.formats.insert(CompactString::new(format), data.into());
    }

    pub fn get(&self, format: &str) -> Option<&Bytes> {
        self.formats.get(format)
    }

    pub fn has_format(&self, format: &str) -> bool {
        self.formats.contains_key(format)
    }

    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(CompactString::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    fn text(&self, format: &str) -> ClipResult<Option<&str>> {
        self.get(format)
            .map(|bytes| {
                std::str::from_utf8(bytes)
                    .map_err(|e| ClipError::invalid_payload(format, e.to_string()))
            })
            .transpose()
    }
}

/// What one codec could read back from a clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedClipboard {
    pub urls: Vec<PathBuf>,
    /// `None` when the encoding carried no copy/cut information.
    pub operation: Option<ClipboardOperation>,
}

pub trait ClipboardCodec: Send + Sync {
    fn name(&self) -> &'static str;

    fn encode(&self, set: &ClipboardSet, out: &mut MimeData) -> ClipResult<()>;

    /// `Ok(None)` when none of this codec's formats are present.
    fn decode(&self, data: &MimeData) -> ClipResult<Option<DecodedClipboard>>;
}

/// `text/uri-list` + `application/x-kde-cutselection`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KdeCodec;

impl ClipboardCodec for KdeCodec {
    fn name(&self) -> &'static str {
        "kde"
    }

    fn encode(&self, set: &ClipboardSet, out: &mut MimeData) -> ClipResult<()> {
        let mut list = String::new();
        for path in set.urls() {
            list.push_str(path_to_uri(path)?.as_str());
            list.push_str("\r\n");
        }

        let flag: &'static [u8] = if set.is_cut() { b"1" } else { b"0" };
        out.set(MIME_URI_LIST, list);
        out.set(MIME_KDE_CUT_SELECTION, Bytes::from_static(flag));
        Ok(())
    }

    fn decode(&self, data: &MimeData) -> ClipResult<Option<DecodedClipboard>> {
        let Some(list) = data.text(MIME_URI_LIST)? else {
            return Ok(None);
        };

        let urls = list
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(uri_to_path)
            .collect::<ClipResult<Vec<_>>>()?;

        let operation = match data.text(MIME_KDE_CUT_SELECTION)? {
            Some(flag) if flag.trim().starts_with('1') => Some(ClipboardOperation::Cut),
            Some(_) => Some(ClipboardOperation::Copy),
            None => None,
        };

        Ok(Some(DecodedClipboard { urls, operation }))
    }
}

/// `x-special/gnome-copied-files`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GnomeCodec;

impl ClipboardCodec for GnomeCodec {
    fn name(&self) -> &'static str {
        "gnome"
    }

    fn encode(&self, set: &ClipboardSet, out: &mut MimeData) -> ClipResult<()> {
        let mut payload = String::from(set.operation.verb());
        for path in set.urls() {
            payload.push('\n');
            payload.push_str(path_to_uri(path)?.as_str());
        }

        out.set(MIME_GNOME_COPIED_FILES, payload);
        Ok(())
    }

    fn decode(&self, data: &MimeData) -> ClipResult<Option<DecodedClipboard>> {
        let Some(payload) = data.text(MIME_GNOME_COPIED_FILES)? else {
            return Ok(None);
        };

        let mut lines = payload
            .split(['\n', '\0'])
            .map(str::trim)
            .filter(|line| !line.is_empty());

        let verb = lines
            .next()
            .ok_or_else(|| ClipError::invalid_payload(MIME_GNOME_COPIED_FILES, "empty payload"))?;

        let operation = ClipboardOperation::from_verb(verb).ok_or_else(|| {
            ClipError::invalid_payload(MIME_GNOME_COPIED_FILES, format!("unknown verb {verb:?}"))
        })?;

        let urls = lines.map(uri_to_path).collect::<ClipResult<Vec<_>>>()?;

        Ok(Some(DecodedClipboard {
            urls,
            operation: Some(operation),
        }))
    }
}

/// All known codecs, written together and read together.
pub struct CodecSet {
    codecs: Vec<Box<dyn ClipboardCodec>>,
}

impl Default for CodecSet {
    fn default() -> Self {
        Self {
            codecs: vec![Box::new(KdeCodec), Box::new(GnomeCodec)],
        }
    }
}

impl std::fmt::Debug for CodecSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.codecs.iter().map(|c| c.name()))
            .finish()
    }
}

impl CodecSet {
    #[must_use]
    pub fn with_codecs(codecs: Vec<Box<dyn ClipboardCodec>>) -> Self {
        Self { codecs }
    }

    pub fn encode_all(&self, set: &ClipboardSet) -> ClipResult<MimeData> {
        let mut out = MimeData::new();
        for codec in &self.codecs {
            codec.encode(set, &mut out)?;
        }

        trace!(
            marker = "CLIPBOARD_ENCODE",
            operation_type = set.operation.verb(),
            formats = out.formats.len(),
            "encoded clipboard set"
        );
        Ok(out)
    }

    /// Reads the file list from the first codec that has one.
    ///
    /// A paste is a cut if any codec says so (KDE flag or GNOME verb), since
    /// the writing application may have used only one of the encodings.
    pub fn decode(&self, data: &MimeData) -> ClipResult<Option<ClipboardSet>> {
        let mut urls: Option<Vec<PathBuf>> = None;
        let mut is_cut = false;
        let mut first_error: Option<ClipError> = None;

        for codec in &self.codecs {
            match codec.decode(data) {
                Ok(Some(decoded)) => {
                    if urls.is_none() && !decoded.urls.is_empty() {
                        urls = Some(decoded.urls);
                    }
                    is_cut |= decoded.operation == Some(ClipboardOperation::Cut);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        marker = "CLIPBOARD_DECODE_FAILED",
                        operation_type = "clipboard_decode",
                        codec = codec.name(),
                        error = %e,
                        "codec could not read clipboard payload"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        match (urls, first_error) {
            (Some(urls), _) => {
                let operation = if is_cut {
                    ClipboardOperation::Cut
                } else {
                    ClipboardOperation::Copy
                };
                debug!(
                    marker = "CLIPBOARD_DECODE",
                    operation_type = operation.verb(),
                    count = urls.len(),
                    "decoded clipboard payload"
                );
                Ok(Some(ClipboardSet::new(urls, operation)))
            }
            (None, Some(e)) => Err(e),
            (None, None) => Ok(None),
        }
    }
}

fn path_to_uri(path: &Path) -> ClipResult<Url> {
    Url::from_file_path(path).map_err(|()| ClipError::invalid_path(path))
}

fn uri_to_path(uri: &str) -> ClipResult<PathBuf> {
    let url = Url::parse(uri).map_err(|e| ClipError::invalid_payload(MIME_URI_LIST, e.to_string()))?;

    if url.scheme() != "file" {
        return Err(ClipError::UnsupportedScheme(CompactString::new(url.scheme())));
    }

    url.to_file_path()
        .map_err(|()| ClipError::InvalidPath(CompactString::new(uri)))
}
