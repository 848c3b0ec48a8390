use anyhow::{anyhow, Context};
use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::record::{AttendanceRecord, WriteMode};
use crate::store::AttendanceStore;

const MANIFEST_ENTRY: &str = "manifest.json";
const DOCUMENT_ENTRY: &str = "document.json";
pub const SNAPSHOT_FORMAT_V1: &str = "attendance-snapshot-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub format: String,
    pub date_count: usize,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub format_detected: String,
    pub date_count: usize,
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

pub fn write_snapshot(doc: &AttendanceRecord, out_path: &Path) -> anyhow::Result<ExportSummary> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let body = serde_json::to_vec_pretty(doc).context("failed to serialize document")?;
    let digest = sha256_hex(&body);
    let manifest = json!({
        "format": SNAPSHOT_FORMAT_V1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": Utc::now().to_rfc3339(),
        "sha256": digest,
        "dateCount": doc.date_count(),
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(DOCUMENT_ENTRY, opts)
        .context("failed to start document entry")?;
    zip.write_all(&body)
        .context("failed to write document entry")?;

    zip.finish().context("failed to finalize snapshot")?;

    Ok(ExportSummary {
        format: SNAPSHOT_FORMAT_V1.to_string(),
        date_count: doc.date_count(),
        sha256: digest,
    })
}

pub fn read_snapshot(in_path: &Path) -> anyhow::Result<(AttendanceRecord, ImportSummary)> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open snapshot {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("snapshot missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != SNAPSHOT_FORMAT_V1 {
        return Err(anyhow!("unsupported snapshot format: {}", format));
    }
    let expected = manifest
        .get("sha256")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let mut body = Vec::new();
    archive
        .by_name(DOCUMENT_ENTRY)
        .context("snapshot missing document.json")?
        .read_to_end(&mut body)
        .context("failed to read document.json")?;
    let actual = sha256_hex(&body);
    if actual != expected {
        return Err(anyhow!(
            "document checksum mismatch: manifest {expected}, content {actual}"
        ));
    }

    let doc = AttendanceRecord::from_json_slice(&body)
        .context("document.json is not an attendance record")?;
    let summary = ImportSummary {
        format_detected: format.to_string(),
        date_count: doc.date_count(),
    };
    Ok((doc, summary))
}

pub fn export_store(store: &AttendanceStore, out_path: &Path) -> anyhow::Result<ExportSummary> {
    let doc = store.get().context("failed to read attendance document")?;
    write_snapshot(&doc, out_path)
}

/// Restores a snapshot over the stored document. Goes through the same validated
/// `put` as the API, always replacing.
pub fn import_store(store: &AttendanceStore, in_path: &Path) -> anyhow::Result<ImportSummary> {
    let (doc, summary) = read_snapshot(in_path)?;
    store
        .put(&doc, WriteMode::Replace)
        .context("failed to write restored document")?;
    Ok(summary)
}
