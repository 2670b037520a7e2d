//! JSON chapter export.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Serializer;
use serde_json::ser::PrettyFormatter;

use crate::error::Result;
use crate::slice::Chapter;

/// Configuration for JSON export.
#[derive(Debug, Clone)]
pub struct JsonConfig {
    /// Spaces per indentation level.
    pub indent: usize,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self { indent: 1 }
    }
}

/// Writes chapters as a JSON array of `{"title", "content"}` objects.
///
/// Output is UTF-8 with non-ASCII characters written literally.
#[derive(Debug, Clone, Default)]
pub struct JsonExporter {
    config: JsonConfig,
}

impl JsonExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: JsonConfig) -> Self {
        self.config = config;
        self
    }

    /// Serialize `chapters` into `writer`.
    pub fn export<W: Write>(&self, chapters: &[Chapter], writer: W) -> Result<()> {
        let indent = vec![b' '; self.config.indent];
        let mut serializer =
            Serializer::with_formatter(writer, PrettyFormatter::with_indent(&indent));
        chapters.serialize(&mut serializer)?;
        Ok(())
    }

    /// Serialize `chapters` into a file, creating its directory if needed.
    pub fn save<P: AsRef<Path>>(&self, chapters: &[Chapter], path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
            && !dir.exists()
        {
            log::debug!("creating output directory {}", dir.display());
            fs::create_dir_all(dir)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        self.export(chapters, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Write `chapters` to `path` with the default configuration.
pub fn save_chapters<P: AsRef<Path>>(path: P, chapters: &[Chapter]) -> Result<()> {
    JsonExporter::new().save(chapters, path)
}
