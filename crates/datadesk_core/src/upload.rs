//! Client-side preparation of batch uploads: CSV rows, chunking and the
//! statistics accumulated over chunk responses.

use csv::{ReaderBuilder, Trim};
use thiserror::Error;

pub const DEFAULT_CHUNK_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlImageRow {
    pub url: String,
    pub image: String,
}

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("csv file is empty")]
    Empty,
    #[error("the csv must have headers 'url' and 'image' (lowercase)")]
    MissingColumns,
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Parses a CSV with `url` and `image` header columns. Rows where either
/// value is blank or missing are dropped.
pub fn parse_url_image_csv(text: &str) -> Result<Vec<UrlImageRow>, CsvError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?;
    if headers.iter().all(str::is_empty) {
        return Err(CsvError::Empty);
    }
    let url_idx = headers.iter().position(|h| h == "url");
    let image_idx = headers.iter().position(|h| h == "image");
    let (Some(url_idx), Some(image_idx)) = (url_idx, image_idx) else {
        return Err(CsvError::MissingColumns);
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let (Some(url), Some(image)) = (record.get(url_idx), record.get(image_idx)) else {
            continue;
        };
        if url.is_empty() || image.is_empty() {
            continue;
        }
        rows.push(UrlImageRow {
            url: url.to_string(),
            image: image.to_string(),
        });
    }
    Ok(rows)
}

/// Splits rows into consecutive chunks of at most `size` rows.
pub fn split_into_chunks<T: Clone>(rows: &[T], size: usize) -> Vec<Vec<T>> {
    rows.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}

/// Counts reported by the server for one uploaded chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkReport {
    pub total: u64,
    pub success: u64,
    pub errors: u64,
    pub not_found: u64,
}

/// Totals across every chunk of an upload, whatever happened to siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadStats {
    pub total: u64,
    pub success: u64,
    pub errors: u64,
    pub not_found: u64,
    pub failed_chunks: usize,
}

impl UploadStats {
    pub fn absorb(&mut self, report: &ChunkReport) {
        self.total += report.total;
        self.success += report.success;
        self.errors += report.errors;
        self.not_found += report.not_found;
    }

    pub fn record_failed_chunk(&mut self) {
        self.failed_chunks += 1;
    }
}

/// `floor(completed / total * 100)`; 0 for an empty upload.
pub fn chunk_progress_percent(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (completed * 100 / total) as u32
}
