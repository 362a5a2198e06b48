use serde_json::json;
use std::path::PathBuf;

use crate::import::{run_import, ImportError};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{param_str, require_registry};
use crate::ipc::types::{AppState, Request};
use crate::sheet;

fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(path) = param_str(&req.params, "path").map(PathBuf::from) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    let config = state.config;
    let registry = match require_registry(state, &req.id) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let rows = match sheet::decode_rows(&path) {
        Ok(rows) => rows,
        Err(e) => return err(&req.id, "decode_failed", format!("{e:?}"), None),
    };

    match run_import(registry, &rows, &config) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "studentsAdded": summary.students_added,
                "studentsUpdated": summary.students_updated,
                "rowsSkipped": summary.rows_skipped,
            }),
        ),
        Err(ImportError::EmptySheet) => {
            err(&req.id, "empty_sheet", ImportError::EmptySheet.to_string(), None)
        }
        Err(ImportError::NoValidRows) => err(
            &req.id,
            "no_valid_rows",
            ImportError::NoValidRows.to_string(),
            None,
        ),
    }
}

fn handle_template(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(path) = param_str(&req.params, "path").map(PathBuf::from) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    match sheet::write_template(&path) {
        Ok(()) => ok(&req.id, json!({ "path": path.to_string_lossy() })),
        Err(e) => err(&req.id, "write_failed", format!("{e:?}"), None),
    }
}

fn handle_export_transcript(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = param_str(&req.params, "studentId").map(str::to_string);
    let transcript_id = param_str(&req.params, "transcriptId").map(str::to_string);
    let explicit_path = param_str(&req.params, "path").map(PathBuf::from);
    let dir = param_str(&req.params, "dir").map(PathBuf::from);
    if explicit_path.is_none() && dir.is_none() {
        return err(&req.id, "bad_params", "missing params.path or params.dir", None);
    }

    let config = state.config;
    let registry = match require_registry(state, &req.id) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let transcript = match (&student_id, &transcript_id) {
        (Some(sid), _) => registry.transcript_for_student(sid),
        (None, Some(tid)) => registry.transcript(tid),
        (None, None) => {
            return err(
                &req.id,
                "bad_params",
                "missing params.studentId or params.transcriptId",
                None,
            )
        }
    };
    let Some(transcript) = transcript.cloned() else {
        return err(&req.id, "not_found", "transcript not found", None);
    };

    // Explicit path wins; otherwise the file name derives from the student.
    let path = match explicit_path {
        Some(p) => p,
        None => {
            let dir = dir.unwrap_or_default();
            if let Err(e) = std::fs::create_dir_all(&dir) {
                return err(&req.id, "write_failed", format!("{e:?}"), None);
            }
            dir.join(sheet::transcript_filename(&transcript.student.name))
        }
    };
    match sheet::write_transcript(&path, &transcript, &config) {
        Ok(()) => ok(&req.id, json!({ "path": path.to_string_lossy() })),
        Err(e) => err(&req.id, "write_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "sheet.import" => Some(handle_import(state, req)),
        "sheet.template" => Some(handle_template(state, req)),
        "sheet.exportTranscript" => Some(handle_export_transcript(state, req)),
        _ => None,
    }
}
