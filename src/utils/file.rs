//! Filesystem helpers for the document loader.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::Path;

/// Hex-encoded SHA-256 of the given text.
pub fn calculate_checksum(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

const TEXT_EXTENSIONS: &[&str] = &[
    "md", "markdown", "rst", "adoc", "org", "txt", "html", "htm", "json", "yaml", "yml", "toml",
    "xml", "csv",
];

const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "svg", "ico", "pdf", "doc", "docx", "xls", "xlsx", "ppt",
    "pptx", "zip", "tar", "gz", "bz2", "xz", "7z", "mp3", "mp4", "mov", "wav", "exe", "dll", "so",
    "dylib", "o", "db", "sqlite", "sqlite3", "bin",
];

/// Decides whether a path holds ingestable text.
///
/// A known extension settles it either way; anything else is sniffed
/// for NUL bytes in the first 512 bytes.
pub fn is_text_file(path: &Path) -> bool {
    if let Some(ext) = path.extension().map(|e| e.to_string_lossy().to_lowercase()) {
        if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            return true;
        }
        if BINARY_EXTENSIONS.contains(&ext.as_str()) {
            return false;
        }
    }
    sniff_text(path)
}

fn sniff_text(path: &Path) -> bool {
    let Ok(file) = fs::File::open(path) else {
        return false;
    };
    let mut head = [0u8; 512];
    match std::io::BufReader::new(file).read(&mut head) {
        Ok(n) => !head[..n].contains(&0),
        Err(_) => false,
    }
}

/// Reads a UTF-8 file, refusing anything larger than `max_size` bytes.
pub fn read_file_content(path: &Path, max_size: u64) -> std::io::Result<String> {
    let len = fs::metadata(path)?.len();
    if len > max_size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("file is {len} bytes, limit is {max_size}"),
        ));
    }
    fs::read_to_string(path)
}
