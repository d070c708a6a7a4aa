use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tender_core::ResultCard;

use crate::error::SinkError;

/// One line of output. Field names match files written by earlier tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    pub page: u32,
    pub seq: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collected_utc: Option<String>,
}

impl OutputRecord {
    pub fn new(card: &ResultCard, page: u32, seq: u64, collected_utc: Option<String>) -> Self {
        Self {
            title: card.title().to_string(),
            url: card.url().to_string(),
            description: card.description().map(str::to_string),
            page,
            seq,
            collected_utc,
        }
    }
}

/// Append-only destination for harvested records.
pub trait RecordSink {
    fn append(&mut self, record: &OutputRecord) -> Result<(), SinkError>;
    fn flush(&mut self) -> Result<(), SinkError>;
}

/// Appends one JSON object per line to a file.
pub struct JsonlSink {
    path: PathBuf,
    writer: BufWriter<File>,
    lines_written: u64,
}

impl JsonlSink {
    /// Opens `path` for appending, creating it and its directory if needed.
    pub fn open_append(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            prepare_output_dir(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            lines_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }
}

impl RecordSink for JsonlSink {
    fn append(&mut self, record: &OutputRecord) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.lines_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Creates `dir` if missing and checks a file can be created in it.
pub fn prepare_output_dir(dir: &Path) -> Result<(), SinkError> {
    let unusable = |message: String| SinkError::OutputDir {
        path: dir.to_path_buf(),
        message,
    };
    match std::fs::metadata(dir) {
        Ok(meta) if !meta.is_dir() => return Err(unusable("not a directory".into())),
        Ok(_) => {}
        Err(_) => std::fs::create_dir_all(dir).map_err(|e| unusable(e.to_string()))?,
    }
    NamedTempFile::new_in(dir).map_err(|e| unusable(e.to_string()))?;
    Ok(())
}
