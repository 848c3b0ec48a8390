use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use attendanced::backup;
use attendanced::record::{AttendanceRecord, WriteMode};
use attendanced::roster::Roster;
use attendanced::store::AttendanceStore;
use serde_json::json;
use zip::write::FileOptions;
use zip::ZipWriter;

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn record(v: serde_json::Value) -> AttendanceRecord {
    serde_json::from_value(v).expect("record json")
}

#[test]
fn snapshot_export_and_restore() {
    let out_dir = temp_dir("attendance-snapshot");
    let bundle = out_dir.join("nested/attendance.zip");
    let roster = Arc::new(Roster::builtin());

    let source = AttendanceStore::in_memory(roster.clone());
    let doc = record(json!({
        "2024-01-01": {"Mathematics": ["101"], "Physics": []},
        "2024-01-03": {"English": ["102", "104"]}
    }));
    source.put(&doc, WriteMode::Replace).expect("seed");

    let export = backup::export_store(&source, &bundle).expect("export");
    assert_eq!(export.format, backup::SNAPSHOT_FORMAT_V1);
    assert_eq!(export.date_count, 2);

    let mut archive = zip::ZipArchive::new(File::open(&bundle).expect("open bundle"))
        .expect("zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    assert!(manifest.contains(&export.sha256));

    let target = AttendanceStore::in_memory(roster);
    target
        .put(&record(json!({"2023-12-01": {"Physics": ["105"]}})), WriteMode::Replace)
        .expect("pre-existing");
    let import = backup::import_store(&target, &bundle).expect("import");
    assert_eq!(import.format_detected, backup::SNAPSHOT_FORMAT_V1);
    assert_eq!(target.get().expect("get"), doc);

    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn tampered_snapshot_is_refused() {
    let out_dir = temp_dir("attendance-snapshot-tampered");
    let bundle = out_dir.join("tampered.zip");
    {
        let mut zip = ZipWriter::new(File::create(&bundle).expect("create"));
        let opts = FileOptions::default();
        zip.start_file("manifest.json", opts).expect("manifest");
        zip.write_all(
            json!({"format": backup::SNAPSHOT_FORMAT_V1, "sha256": "00"})
                .to_string()
                .as_bytes(),
        )
        .expect("write manifest");
        zip.start_file("document.json", opts).expect("document");
        zip.write_all(b"{}").expect("write document");
        zip.finish().expect("finish");
    }

    let err = backup::read_snapshot(&bundle).expect_err("checksum mismatch");
    assert!(err.to_string().contains("checksum"));

    let _ = std::fs::remove_dir_all(out_dir);
}
