use serde_json::json;

use crate::calc::CalcConfig;
use crate::db::KEY_SETTINGS;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::require_registry;
use crate::ipc::types::{AppState, Request};

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_registry(state, &req.id) {
        return resp;
    }
    match serde_json::to_value(state.config) {
        Ok(settings) => ok(&req.id, json!({ "settings": settings })),
        Err(e) => err(&req.id, "internal", format!("{e}"), None),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(settings) = req.params.get("settings") else {
        return err(&req.id, "bad_params", "missing params.settings", None);
    };
    let config: CalcConfig = match serde_json::from_value(settings.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", format!("invalid settings: {e}"), None),
    };

    let registry = match require_registry(state, &req.id) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    if let Some(store) = registry.store() {
        if let Err(e) = store.set_json(KEY_SETTINGS, &config) {
            return err(&req.id, "db_write_failed", format!("{e:?}"), None);
        }
    }
    state.config = config;
    match serde_json::to_value(state.config) {
        Ok(settings) => ok(&req.id, json!({ "settings": settings })),
        Err(e) => err(&req.id, "internal", format!("{e}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(handle_get(state, req)),
        "settings.update" => Some(handle_update(state, req)),
        _ => None,
    }
}
