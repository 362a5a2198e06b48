use serde_json::json;

use crate::calc::{edit_unit_field, pass_level, school_total};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{param_str, require_registry};
use crate::ipc::types::{AppState, Request};
use crate::model::Transcript;

fn transcript_payload(
    id: &str,
    transcript: &Transcript,
    state_config: &crate::calc::CalcConfig,
) -> serde_json::Value {
    let total = school_total(transcript, state_config);
    match serde_json::to_value(transcript) {
        Ok(v) => ok(
            id,
            json!({
                "transcript": v,
                "schoolTotal": total,
                "passLevel": pass_level(total),
            }),
        ),
        Err(e) => err(id, "internal", format!("{e}"), None),
    }
}

/// Lookup by studentId or transcriptId, whichever the caller has at hand.
fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = param_str(&req.params, "studentId").map(str::to_string);
    let transcript_id = param_str(&req.params, "transcriptId").map(str::to_string);
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
    match transcript {
        Some(t) => transcript_payload(&req.id, t, &config),
        None => err(&req.id, "not_found", "transcript not found", None),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(value) = req.params.get("transcript") else {
        return err(&req.id, "bad_params", "missing params.transcript", None);
    };
    let transcript: Transcript = match serde_json::from_value(value.clone()) {
        Ok(v) => v,
        Err(e) => {
            return err(&req.id, "bad_params", format!("invalid transcript: {e}"), None)
        }
    };

    let config = state.config;
    let registry = match require_registry(state, &req.id) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match registry.update_transcript(transcript.clone()) {
        Ok(()) => transcript_payload(&req.id, &transcript, &config),
        Err(e) => err(&req.id, "not_found", format!("{e}"), None),
    }
}

/// Single-cell edit from the transcript editor: clone, edit, replace.
fn handle_edit_unit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(transcript_id) = param_str(&req.params, "transcriptId").map(str::to_string) else {
        return err(&req.id, "bad_params", "missing params.transcriptId", None);
    };
    let Some(unit_id) = param_str(&req.params, "unitId").map(str::to_string) else {
        return err(&req.id, "bad_params", "missing params.unitId", None);
    };
    let Some(field) = param_str(&req.params, "field").map(str::to_string) else {
        return err(&req.id, "bad_params", "missing params.field", None);
    };
    let value = match req.params.get("value") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => match v.as_f64() {
            Some(n) => Some(n),
            None => {
                return err(&req.id, "bad_params", "params.value must be a number or null", None)
            }
        },
    };

    let config = state.config;
    let registry = match require_registry(state, &req.id) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let Some(mut transcript) = registry.transcript(&transcript_id).cloned() else {
        return err(&req.id, "not_found", "transcript not found", None);
    };
    let Some(unit) = transcript.course_units.iter_mut().find(|u| u.id == unit_id) else {
        return err(&req.id, "not_found", "course unit not found", None);
    };
    if !edit_unit_field(unit, &field, value) {
        return err(
            &req.id,
            "bad_params",
            format!("unknown editable field: {}", field),
            None,
        );
    }
    match registry.update_transcript(transcript.clone()) {
        Ok(()) => transcript_payload(&req.id, &transcript, &config),
        Err(e) => err(&req.id, "db_write_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "transcripts.get" => Some(handle_get(state, req)),
        "transcripts.update" => Some(handle_update(state, req)),
        "transcripts.editUnit" => Some(handle_edit_unit(state, req)),
        _ => None,
    }
}
