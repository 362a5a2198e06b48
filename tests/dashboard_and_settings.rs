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
fn stats_aggregate_grades_pass_levels_and_recents() {
    let workspace = temp_dir("transcriptd-dashboard");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let mut transcript_ids = Vec::new();
    for (i, name) in ["One", "Two", "Three", "Four", "Five", "Six"].iter().enumerate() {
        let created = request(
            &mut stdin,
            &mut reader,
            &format!("c{}", i),
            "students.create",
            json!({
                "name": format!("Student {}", name),
                "admissionNumber": format!("ADM/2024/{:03}", i + 1),
                "course": "Welding",
            }),
        );
        transcript_ids.push(
            created
                .pointer("/result/student/transcriptId")
                .and_then(|v| v.as_str())
                .expect("transcript id")
                .to_string(),
        );
    }

    // One graded unit: total 78 is an A.
    let _ = request(
        &mut stdin,
        &mut reader,
        "e1",
        "transcripts.editUnit",
        json!({
            "transcriptId": transcript_ids[0],
            "unitId": "1",
            "field": "total",
            "value": 78.0,
        }),
    );

    let stats = request(&mut stdin, &mut reader, "s1", "dashboard.stats", json!({}));
    assert_eq!(
        stats.pointer("/result/totalStudents").and_then(|v| v.as_u64()),
        Some(6)
    );
    assert_eq!(
        stats
            .pointer("/result/totalTranscripts")
            .and_then(|v| v.as_u64()),
        Some(6)
    );
    assert_eq!(
        stats
            .pointer("/result/gradeDistribution/A")
            .and_then(|v| v.as_u64()),
        Some(1)
    );
    assert_eq!(
        stats.pointer("/result/gradedUnits").and_then(|v| v.as_u64()),
        Some(1)
    );
    assert_eq!(
        stats
            .pointer("/result/completeTranscripts")
            .and_then(|v| v.as_u64()),
        Some(0)
    );
    assert_eq!(
        stats
            .pointer("/result/incompleteTranscripts")
            .and_then(|v| v.as_u64()),
        Some(6)
    );
    // All six transcripts total under 200.
    assert_eq!(
        stats
            .pointer("/result/passLevels/FAIL")
            .and_then(|v| v.as_u64()),
        Some(6)
    );

    let recents = stats
        .pointer("/result/recentStudents")
        .and_then(|v| v.as_array())
        .expect("recent students");
    assert_eq!(recents.len(), 5);
    assert_eq!(
        recents[0].get("name").and_then(|v| v.as_str()),
        Some("Student Six")
    );

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn settings_survive_restart_and_change_the_school_total() {
    let workspace = temp_dir("transcriptd-settings");
    let transcript_id;

    {
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
            }),
        );
        transcript_id = created
            .pointer("/result/student/transcriptId")
            .and_then(|v| v.as_str())
            .expect("transcript id")
            .to_string();

        let _ = request(
            &mut stdin,
            &mut reader,
            "3",
            "transcripts.editUnit",
            json!({
                "transcriptId": transcript_id,
                "unitId": "1",
                "field": "exam",
                "value": 60.0,
            }),
        );
        let _ = request(
            &mut stdin,
            &mut reader,
            "4",
            "transcripts.editUnit",
            json!({
                "transcriptId": transcript_id,
                "unitId": "1",
                "field": "cat",
                "value": 20.0,
            }),
        );

        let updated = request(
            &mut stdin,
            &mut reader,
            "5",
            "settings.update",
            json!({ "settings": { "scoringScheme": "examOnly", "rangePolicy": "accept" } }),
        );
        assert_eq!(
            updated
                .pointer("/result/settings/scoringScheme")
                .and_then(|v| v.as_str()),
            Some("examOnly")
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
    let settings = request(&mut stdin, &mut reader, "2", "settings.get", json!({}));
    assert_eq!(
        settings
            .pointer("/result/settings/scoringScheme")
            .and_then(|v| v.as_str()),
        Some("examOnly")
    );

    // Under exam-only the school total sums exam marks, not unit totals.
    let transcript = request(
        &mut stdin,
        &mut reader,
        "3",
        "transcripts.get",
        json!({ "transcriptId": transcript_id }),
    );
    assert_eq!(
        transcript
            .pointer("/result/schoolTotal")
            .and_then(|v| v.as_f64()),
        Some(60.0)
    );

    drop(stdin);
    let _ = child.wait();
}
