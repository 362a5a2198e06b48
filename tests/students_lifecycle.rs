use serde_json::json;
use std::io::{BufRead, BufReader, Write};
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
fn create_update_delete_cascades_to_the_transcript() {
    let workspace = temp_dir("transcriptd-students");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let created = request(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({
            "name": "Jane Roe",
            "admissionNumber": "ADM/2024/050",
            "course": "Welding",
            "schoolYear": "2024/2025",
        }),
    );
    let mut student = created
        .pointer("/result/student")
        .cloned()
        .expect("created student");
    let student_id = student["id"].as_str().expect("id").to_string();

    // Same admission number is rejected.
    let duplicate = request(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        json!({
            "name": "Someone Else",
            "admissionNumber": "ADM/2024/050",
            "course": "Welding",
        }),
    );
    assert_eq!(
        duplicate.pointer("/error/code").and_then(|v| v.as_str()),
        Some("duplicate_admission_number")
    );

    // Rename flows into the transcript's embedded student copy.
    student["name"] = json!("Jane A. Roe");
    let _ = request(
        &mut stdin,
        &mut reader,
        "4",
        "students.update",
        json!({ "student": student }),
    );
    let transcript = request(
        &mut stdin,
        &mut reader,
        "5",
        "transcripts.get",
        json!({ "studentId": student_id }),
    );
    assert_eq!(
        transcript
            .pointer("/result/transcript/student/name")
            .and_then(|v| v.as_str()),
        Some("Jane A. Roe")
    );

    let deleted = request(
        &mut stdin,
        &mut reader,
        "6",
        "students.delete",
        json!({ "studentId": student_id }),
    );
    assert_eq!(
        deleted.pointer("/result/deleted").and_then(|v| v.as_bool()),
        Some(true)
    );
    let gone = request(
        &mut stdin,
        &mut reader,
        "7",
        "transcripts.get",
        json!({ "studentId": student_id }),
    );
    assert_eq!(
        gone.pointer("/error/code").and_then(|v| v.as_str()),
        Some("not_found")
    );

    // Deleting again reports false rather than an error.
    let again = request(
        &mut stdin,
        &mut reader,
        "8",
        "students.delete",
        json!({ "studentId": student_id }),
    );
    assert_eq!(
        again.pointer("/result/deleted").and_then(|v| v.as_bool()),
        Some(false)
    );

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn records_persist_across_process_restarts() {
    let workspace = temp_dir("transcriptd-persist");

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
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
        drop(stdin);
        let _ = child.wait();
    }

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let listed = request(&mut stdin, &mut reader, "2", "students.list", json!({}));
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
