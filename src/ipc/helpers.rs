use crate::ipc::error::err;
use crate::ipc::types::AppState;
use crate::registry::Registry;

/// Every method except health and workspace.select needs an open workspace.
pub fn require_registry<'a>(
    state: &'a mut AppState,
    id: &str,
) -> Result<&'a mut Registry, serde_json::Value> {
    state
        .registry
        .as_mut()
        .ok_or_else(|| err(id, "no_workspace", "no workspace selected", None))
}

pub fn param_str<'a>(params: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}
