//! Content-type classification.
//!
//! Maps a file to a destination bucket name in three steps: sniff a bounded
//! header prefix, fall back to an extension lookup when sniffing is
//! inconclusive, then resolve the resulting MIME string against the rule
//! table (exact match, longest prefix, configured default — exactly one
//! bucket per file, always).
//!
//! Notes:
//! - `classify` never fails: an unreadable file lands in the default bucket
//!   with the record flagged as a warning.
//! - The sniffing backend sits behind the `Sniffer` trait so tests can swap
//!   in a canned implementation.

use std::io::Read;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

/// Upper bound on how much of a file the sniffer reads. Magic numbers sit in
/// the first few hundred bytes; 8 KiB covers every format `infer` knows.
pub const SNIFF_LEN: usize = 8192;

/// Content sniffing capability. Implementations judge a MIME type from a
/// bounded header prefix and return `None` when the bytes are inconclusive.
pub trait Sniffer: Send + Sync {
    fn sniff(&self, header: &[u8]) -> Option<String>;
}

/// Default sniffer backed by the `infer` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct InferSniffer;

impl Sniffer for InferSniffer {
    fn sniff(&self, header: &[u8]) -> Option<String> {
        infer::get(header).map(|kind| kind.mime_type().to_string())
    }
}

/// One classification rule: a MIME pattern (full type or `major/` prefix)
/// mapped to a bucket folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: String,
    pub bucket: String,
}

impl Rule {
    pub fn new(pattern: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            bucket: bucket.into(),
        }
    }
}

/// Ordered rule table plus the default bucket for unmatched types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<Rule>,
    default_bucket: String,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>, default_bucket: impl Into<String>) -> Self {
        Self {
            rules,
            default_bucket: default_bucket.into(),
        }
    }

    pub fn default_bucket(&self) -> &str {
        &self.default_bucket
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Resolve a MIME string to a bucket name.
    ///
    /// Exact full-type match wins over prefix matches; among prefix matches
    /// the longest pattern wins, with earlier rules breaking length ties.
    pub fn bucket_for(&self, mime: &str) -> &str {
        let mime = mime.trim();
        if let Some(rule) = self
            .rules
            .iter()
            .find(|r| r.pattern.eq_ignore_ascii_case(mime))
        {
            return &rule.bucket;
        }

        let mut best: Option<&Rule> = None;
        for rule in &self.rules {
            let matched = mime
                .get(..rule.pattern.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(&rule.pattern));
            if matched {
                match best {
                    Some(b) if b.pattern.len() >= rule.pattern.len() => {}
                    _ => best = Some(rule),
                }
            }
        }
        best.map_or(self.default_bucket.as_str(), |r| r.bucket.as_str())
    }

    /// True if `name` is one of the table's bucket folder names (default
    /// included). Used by the organizer's idempotence guard.
    pub fn is_bucket(&self, name: &str) -> bool {
        name == self.default_bucket || self.rules.iter().any(|r| r.bucket == name)
    }
}

impl Default for RuleTable {
    /// Built-in table used when the config file defines no rules.
    fn default() -> Self {
        let rules = [
            ("image/", "Images"),
            ("video/", "Videos"),
            ("audio/", "Audio"),
            ("font/", "Fonts"),
            ("text/", "Documents"),
            ("application/pdf", "PDFs"),
            ("application/msword", "Documents"),
            ("application/vnd.openxmlformats-officedocument.wordprocessingml.document", "Documents"),
            ("application/vnd.ms-excel", "Spreadsheets"),
            ("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet", "Spreadsheets"),
            ("application/vnd.ms-powerpoint", "Presentations"),
            ("application/vnd.openxmlformats-officedocument.presentationml.presentation", "Presentations"),
            ("application/zip", "Archives"),
            ("application/x-rar-compressed", "Archives"),
            ("application/vnd.rar", "Archives"),
            ("application/x-7z-compressed", "Archives"),
            ("application/x-tar", "Archives"),
            ("application/gzip", "Archives"),
            ("application/x-bzip2", "Archives"),
            ("application/json", "Documents"),
            ("application/xml", "Documents"),
            ("application/x-executable", "Executables"),
            ("application/x-msdownload", "Executables"),
            ("application/vnd.microsoft.portable-executable", "Executables"),
        ]
        .into_iter()
        .map(|(pattern, bucket)| Rule::new(pattern, bucket))
        .collect();

        Self {
            rules,
            default_bucket: "Others".to_string(),
        }
    }
}

/// Result of classifying one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub bucket: String,
    /// True when the file's header could not be read and the default bucket
    /// was used as a last resort.
    pub warned: bool,
}

/// Classifies files against a hot-swappable rule table.
///
/// The table sits behind a lock so the surrounding application can replace
/// it at runtime; the new table takes effect on the next `classify` call.
pub struct Classifier {
    table: RwLock<RuleTable>,
    sniffer: Box<dyn Sniffer>,
}

impl Classifier {
    pub fn new(table: RuleTable) -> Self {
        Self::with_sniffer(table, Box::new(InferSniffer))
    }

    pub fn with_sniffer(table: RuleTable, sniffer: Box<dyn Sniffer>) -> Self {
        Self {
            table: RwLock::new(table),
            sniffer,
        }
    }

    /// Swap in a new rule table; picked up by the next `classify` call.
    pub fn replace_table(&self, table: RuleTable) {
        *self
            .table
            .write()
            .unwrap_or_else(PoisonError::into_inner) = table;
    }

    pub fn is_bucket(&self, name: &str) -> bool {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_bucket(name)
    }

    /// Determine the destination bucket for `path`. Never fails: unreadable
    /// files fall back to the default bucket with `warned` set.
    pub fn classify(&self, path: &Path) -> Classification {
        let (mime, warned) = match read_header(path) {
            Ok(header) => {
                let sniffed = if header.is_empty() {
                    None
                } else {
                    self.sniffer.sniff(&header)
                };
                (sniffed.or_else(|| mime_from_extension(path)), false)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read file header; using default bucket");
                (None, true)
            }
        };

        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        let bucket = match &mime {
            Some(m) => table.bucket_for(m).to_string(),
            None => table.default_bucket().to_string(),
        };
        debug!(path = %path.display(), mime = mime.as_deref().unwrap_or("<unknown>"), bucket, "classified");
        Classification { bucket, warned }
    }
}

/// Read at most `SNIFF_LEN` bytes from the start of the file.
fn read_header(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = std::fs::File::open(path)?;
    let mut header = Vec::with_capacity(512);
    file.take(SNIFF_LEN as u64).read_to_end(&mut header)?;
    Ok(header)
}

/// Extension fallback for files whose bytes carry no recognizable magic
/// (plain text, CSV, source code, ...).
fn mime_from_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "txt" | "log" | "ini" | "cfg" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "yml" | "yaml" => "text/plain",
        "rs" | "py" | "c" | "h" | "cpp" | "java" | "go" | "sh" => "text/plain",
        "svg" => "image/svg+xml",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "mkv" => "video/x-matroska",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "7z" => "application/x-7z-compressed",
        "ttf" | "otf" | "woff" | "woff2" => "font/ttf",
        _ => return None,
    };
    Some(mime.to_string())
}
