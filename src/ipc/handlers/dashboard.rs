use std::collections::BTreeMap;

use serde_json::json;

use crate::calc::{pass_level, school_total};
use crate::ipc::error::ok;
use crate::ipc::helpers::require_registry;
use crate::ipc::types::{AppState, Request};

/// Read-only aggregate over the registry snapshot, computed on demand.
fn handle_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    let config = state.config;
    let registry = match require_registry(state, &req.id) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let mut grade_distribution: BTreeMap<&str, usize> = BTreeMap::new();
    for grade in ["A", "B", "C", "D", "E"] {
        grade_distribution.insert(grade, 0);
    }
    let mut pass_levels: BTreeMap<String, usize> = BTreeMap::new();
    let mut graded_units = 0usize;
    let mut complete = 0usize;

    for transcript in registry.transcripts() {
        let mut all_graded = !transcript.course_units.is_empty();
        for unit in &transcript.course_units {
            if let Some(grade) = &unit.grade {
                if let Some(count) = grade_distribution.get_mut(grade.as_str()) {
                    *count += 1;
                }
                graded_units += 1;
            } else {
                all_graded = false;
            }
        }
        if all_graded {
            complete += 1;
        }
        let total = school_total(transcript, &config);
        *pass_levels.entry(pass_level(total).to_string()).or_insert(0) += 1;
    }

    // Insertion order doubles as creation order; newest first.
    let recent: Vec<serde_json::Value> = registry
        .students()
        .iter()
        .rev()
        .take(5)
        .map(|s| {
            json!({
                "id": s.id,
                "name": s.name,
                "admissionNumber": s.admission_number,
                "course": s.course,
            })
        })
        .collect();

    ok(
        &req.id,
        json!({
            "totalStudents": registry.students().len(),
            "totalTranscripts": registry.transcripts().len(),
            "completeTranscripts": complete,
            "incompleteTranscripts": registry.transcripts().len() - complete,
            "gradedUnits": graded_units,
            "gradeDistribution": grade_distribution,
            "passLevels": pass_levels,
            "recentStudents": recent,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.stats" => Some(handle_stats(state, req)),
        _ => None,
    }
}
