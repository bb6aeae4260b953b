use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::guard::file_extension;
use crate::traits::Extractor;

pub const SUPPORTED_EXTENSIONS: [&str; 13] = [
    "txt", "md", "markdown", "rst", "csv", "json", "yaml", "yml", "toml", "html", "htm", "xml", "log",
];

/// Extractor for plain-text formats. The file type tag is the lowercase extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self { Self }
}

impl Extractor for PlainTextExtractor {
    fn supports(&self, path: &Path) -> bool {
        file_extension(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
    }

    fn extract(&self, path: &Path) -> Result<(String, String)> {
        let filetype = file_extension(path)
            .filter(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
            .ok_or_else(|| Error::UnsupportedFileType(path.display().to_string()))?;
        let bytes = fs::read(path).map_err(|e| Error::Extraction(format!("{}: {e}", path.display())))?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        Ok((text, filetype))
    }
}
