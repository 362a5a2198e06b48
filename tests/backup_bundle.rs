use serde_json::json;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

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

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_transcriptd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn transcriptd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

#[test]
fn bundle_roundtrip_restores_into_a_fresh_workspace() {
    let workspace_src = temp_dir("transcriptd-bundle-src");
    let workspace_dst = temp_dir("transcriptd-bundle-dst");
    let out_dir = temp_dir("transcriptd-bundle-out");
    let bundle = out_dir.join("workspace.transcripts.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace_src.to_string_lossy() }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({
            "name": "Jane Roe",
            "admissionNumber": "ADM/2024/050",
            "course": "Welding",
        }),
    );
    let exported = request(
        &mut stdin,
        &mut reader,
        "3",
        "backup.export",
        json!({ "outPath": bundle.to_string_lossy() }),
    );
    let sha = exported
        .pointer("/result/dbSha256")
        .and_then(|v| v.as_str())
        .expect("sha256")
        .to_string();
    assert_eq!(sha.len(), 64);

    // The manifest carries the same checksum.
    let f = std::fs::File::open(&bundle).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    let manifest: serde_json::Value = serde_json::from_str(&manifest).expect("manifest json");
    assert_eq!(
        manifest.get("format").and_then(|v| v.as_str()),
        Some("transcript-workspace-v1")
    );
    assert_eq!(
        manifest.get("dbSha256").and_then(|v| v.as_str()),
        Some(sha.as_str())
    );

    let imported = request(
        &mut stdin,
        &mut reader,
        "4",
        "backup.import",
        json!({
            "inPath": bundle.to_string_lossy(),
            "path": workspace_dst.to_string_lossy(),
        }),
    );
    assert_eq!(
        imported
            .pointer("/result/bundleFormatDetected")
            .and_then(|v| v.as_str()),
        Some("transcript-workspace-v1")
    );

    let listed = request(&mut stdin, &mut reader, "5", "students.list", json!({}));
    let students = listed
        .pointer("/result/students")
        .and_then(|v| v.as_array())
        .expect("students");
    assert_eq!(students.len(), 1);
    assert_eq!(
        students[0].get("admissionNumber").and_then(|v| v.as_str()),
        Some("ADM/2024/050")
    );

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn corrupted_bundle_is_rejected_by_checksum() {
    let workspace_src = temp_dir("transcriptd-corrupt-src");
    let workspace_dst = temp_dir("transcriptd-corrupt-dst");
    let out_dir = temp_dir("transcriptd-corrupt-out");
    let bundle = out_dir.join("workspace.transcripts.zip");
    let tampered = out_dir.join("tampered.transcripts.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace_src.to_string_lossy() }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "2",
        "backup.export",
        json!({ "outPath": bundle.to_string_lossy() }),
    );

    // Rebuild the bundle with the same manifest but a different database.
    {
        let f = std::fs::File::open(&bundle).expect("open bundle");
        let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
        let mut manifest = String::new();
        archive
            .by_name("manifest.json")
            .expect("manifest entry")
            .read_to_string(&mut manifest)
            .expect("read manifest");

        let out = std::fs::File::create(&tampered).expect("create tampered bundle");
        let mut writer = zip::ZipWriter::new(out);
        let opts = zip::write::FileOptions::default();
        writer.start_file("manifest.json", opts).expect("manifest");
        writer.write_all(manifest.as_bytes()).expect("manifest body");
        writer
            .start_file("db/transcripts.sqlite3", opts)
            .expect("db entry");
        writer.write_all(b"tampered payload").expect("db body");
        writer.finish().expect("finish zip");
    }

    let imported = request(
        &mut stdin,
        &mut reader,
        "3",
        "backup.import",
        json!({
            "inPath": tampered.to_string_lossy(),
            "path": workspace_dst.to_string_lossy(),
        }),
    );
    assert_eq!(
        imported.pointer("/error/code").and_then(|v| v.as_str()),
        Some("backup_import_failed")
    );

    drop(stdin);
    let _ = child.wait();
}
