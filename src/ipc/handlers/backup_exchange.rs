use serde_json::json;
use std::path::PathBuf;

use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::core::open_workspace;
use crate::ipc::helpers::param_str;
use crate::ipc::types::{AppState, Request};

fn handle_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(out_path) = param_str(&req.params, "outPath").map(PathBuf::from) else {
        return err(&req.id, "bad_params", "missing params.outPath", None);
    };
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "no workspace selected", None);
    };

    match backup::export_workspace_bundle(&workspace, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "bundleFormat": summary.bundle_format,
                "dbSha256": summary.db_sha256,
                "outPath": out_path.to_string_lossy(),
            }),
        ),
        Err(e) => err(&req.id, "backup_export_failed", format!("{e:?}"), None),
    }
}

/// Restores a bundle into the workspace and reloads the in-memory snapshot
/// from the restored database.
fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(in_path) = param_str(&req.params, "inPath").map(PathBuf::from) else {
        return err(&req.id, "bad_params", "missing params.inPath", None);
    };
    let workspace = match param_str(&req.params, "path").map(PathBuf::from) {
        Some(p) => p,
        None => match state.workspace.clone() {
            Some(p) => p,
            None => return err(&req.id, "no_workspace", "no workspace selected", None),
        },
    };

    // Drop the open connection before the database file is swapped out.
    state.registry = None;

    let summary = match backup::import_workspace_bundle(&in_path, &workspace) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "backup_import_failed", format!("{e:?}"), None),
    };
    if let Err(e) = open_workspace(state, workspace.clone()) {
        return err(&req.id, "db_open_failed", format!("{e:?}"), None);
    }

    ok(
        &req.id,
        json!({
            "bundleFormatDetected": summary.bundle_format_detected,
            "workspacePath": workspace.to_string_lossy(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.export" => Some(handle_export(state, req)),
        "backup.import" => Some(handle_import(state, req)),
        _ => None,
    }
}
