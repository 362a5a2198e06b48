use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{param_str, require_registry};
use crate::ipc::types::{AppState, Request};
use crate::model::Student;

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let registry = match require_registry(state, &req.id) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match serde_json::to_value(registry.students()) {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(e) => err(&req.id, "internal", format!("{e}"), None),
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = param_str(&req.params, "name").unwrap_or("").trim().to_string();
    let admission_number = param_str(&req.params, "admissionNumber")
        .unwrap_or("")
        .trim()
        .to_string();
    let course = param_str(&req.params, "course").unwrap_or("").trim().to_string();
    let school_year = param_str(&req.params, "schoolYear")
        .unwrap_or("")
        .trim()
        .to_string();
    if name.is_empty() || admission_number.is_empty() || course.is_empty() {
        return err(
            &req.id,
            "bad_params",
            "name, admissionNumber and course are required",
            None,
        );
    }

    let registry = match require_registry(state, &req.id) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    if registry.find_by_admission_number(&admission_number).is_some() {
        return err(
            &req.id,
            "duplicate_admission_number",
            format!("admission number {} already registered", admission_number),
            None,
        );
    }
    match registry.add_student(&name, &admission_number, &course, &school_year) {
        Ok(student) => match serde_json::to_value(&student) {
            Ok(v) => ok(&req.id, json!({ "student": v })),
            Err(e) => err(&req.id, "internal", format!("{e}"), None),
        },
        Err(e) => err(&req.id, "db_write_failed", format!("{e:?}"), None),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(student_value) = req.params.get("student") else {
        return err(&req.id, "bad_params", "missing params.student", None);
    };
    let student: Student = match serde_json::from_value(student_value.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", format!("invalid student: {e}"), None),
    };

    let registry = match require_registry(state, &req.id) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    // The business key must stay unique across the other students.
    if registry
        .students()
        .iter()
        .any(|s| s.admission_number == student.admission_number && s.id != student.id)
    {
        return err(
            &req.id,
            "duplicate_admission_number",
            format!(
                "admission number {} already registered",
                student.admission_number
            ),
            None,
        );
    }
    match registry.update_student(student.clone()) {
        Ok(()) => match serde_json::to_value(&student) {
            Ok(v) => ok(&req.id, json!({ "student": v })),
            Err(e) => err(&req.id, "internal", format!("{e}"), None),
        },
        Err(e) => err(&req.id, "not_found", format!("{e}"), None),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(student_id) = param_str(&req.params, "studentId").map(str::to_string) else {
        return err(&req.id, "bad_params", "missing params.studentId", None);
    };
    let registry = match require_registry(state, &req.id) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match registry.delete_student(&student_id) {
        Ok(deleted) => ok(&req.id, json!({ "deleted": deleted })),
        Err(e) => err(&req.id, "db_write_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_list(state, req)),
        "students.create" => Some(handle_create(state, req)),
        "students.update" => Some(handle_update(state, req)),
        "students.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
