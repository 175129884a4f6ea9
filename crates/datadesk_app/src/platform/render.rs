//! Plain-text rendering of the core view models.

use chrono::Local;
use datadesk_core::upload::UploadStats;
use datadesk_core::{BrowseView, LogEntry, LogKind, PageMode, PollerView, Record};
use datadesk_engine::admin::CollectionStat;
use datadesk_engine::UploadEvent;
use serde_json::Value;

const BAR_WIDTH: usize = 30;
const MAX_CELL: usize = 40;

pub fn render_page(view: &BrowseView, json: bool) -> String {
    let mut out = String::new();
    out.push_str(&page_header(view));
    out.push('\n');

    if view.items.is_empty() {
        out.push_str("(no rows)\n");
        return out;
    }
    if json {
        for item in &view.items {
            out.push_str(&item.to_string());
            out.push('\n');
        }
    } else {
        out.push_str(&render_table(&view.items));
    }
    out
}

fn page_header(view: &BrowseView) -> String {
    let position = match view.mode {
        PageMode::Offset => format!("page {}", view.page),
        PageMode::Cursor => match &view.cursor {
            Some(cursor) => format!("cursor {cursor}"),
            None => "cursor start".to_string(),
        },
    };
    let total = view
        .total
        .map(|total| format!(", {total} total"))
        .unwrap_or_default();
    let links = if view.page_links.is_empty() {
        String::new()
    } else {
        let pages: Vec<String> = view
            .page_links
            .iter()
            .map(|page| {
                if *page == view.page {
                    format!("[{page}]")
                } else {
                    page.to_string()
                }
            })
            .collect();
        format!(" | {}", pages.join(" "))
    };
    let more = if view.can_next { " | more available" } else { "" };
    format!(
        "{position} ({} rows{total}){links}{more}",
        view.items.len()
    )
}

/// Columns are the keys of the first row, in its order.
fn render_table(items: &[Record]) -> String {
    let columns: Vec<String> = match items.first() {
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        _ => {
            return items.iter().map(|item| format!("{item}\n")).collect();
        }
    };

    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| {
            columns
                .iter()
                .map(|column| cell_text(item.get(column)))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    out.push_str(&format_row(&columns, &widths));
    for row in &rows {
        out.push_str(&format_row(row, &widths));
    }
    out
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    format!("{}\n", padded.join("  ").trim_end())
}

fn cell_text(value: Option<&Value>) -> String {
    let text = match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    };
    let text = text.replace(['\n', '\r', '\t'], " ");
    if text.chars().count() > MAX_CELL {
        let cut: String = text.chars().take(MAX_CELL - 3).collect();
        format!("{cut}...")
    } else {
        text
    }
}

pub fn render_log_entry(entry: &LogEntry) -> String {
    let marker = match entry.kind {
        LogKind::Success => " ",
        LogKind::Error => "!",
    };
    format!("{} {marker} {}", Local::now().format("%H:%M:%S"), entry.message)
}

pub fn render_progress(view: &PollerView) -> String {
    let filled = (view.percent.min(100) as usize * BAR_WIDTH) / 100;
    let snapshot = &view.snapshot;
    format!(
        "[{}{}] {:>3}% {}/{} | upserted {} modified {} errors {} | {}",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        view.percent,
        snapshot.processed,
        snapshot.total,
        snapshot.upserted,
        snapshot.modified,
        snapshot.errors.len(),
        view.status_text
    )
}

pub fn render_upload_event(event: &UploadEvent) -> String {
    match event {
        UploadEvent::ChunkStarted { index, rows } => {
            format!("Processing chunk #{} ({rows} rows)...", index + 1)
        }
        UploadEvent::ChunkRetrying {
            index,
            attempt,
            message,
        } => format!("Chunk #{} failed ({message}), retry {attempt}", index + 1),
        UploadEvent::ChunkCompleted {
            index,
            report,
            diagnostics,
        } => {
            let mut line = format!(
                "Chunk #{} completed. Success: {}, Errors: {}, Not Found: {}",
                index + 1,
                report.success,
                report.errors,
                report.not_found
            );
            for diagnostic in diagnostics {
                line.push_str(&format!("\n    {diagnostic}"));
            }
            line
        }
        UploadEvent::ChunkFailed { index, message } => {
            format!("Chunk #{} failed permanently: {message}", index + 1)
        }
        UploadEvent::Progress {
            completed,
            total,
            percent,
        } => format!("Progress: {completed}/{total} chunks ({percent}%)"),
    }
}

pub fn render_upload_summary(stats: &UploadStats) -> String {
    let mut line = format!(
        "Processed {} entries: {} successful, {} errors, {} not found",
        stats.total, stats.success, stats.errors, stats.not_found
    );
    if stats.failed_chunks > 0 {
        line.push_str(&format!(
            " ({} chunks failed, see log)",
            stats.failed_chunks
        ));
    }
    line
}

pub fn render_collection_stats(stats: &[CollectionStat]) -> String {
    let width = stats
        .iter()
        .map(|stat| stat.collection_name.len())
        .max()
        .unwrap_or(0);
    stats
        .iter()
        .map(|stat| {
            format!(
                "{:<width$}  {:>10} docs  {:>12} bytes  {} indexes\n",
                stat.collection_name, stat.document_count, stat.size, stat.index_count
            )
        })
        .collect()
}
