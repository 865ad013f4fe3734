//! Remote-tool surface: a small JSON-RPC-style dispatch table mirroring the
//! memory-service verbs, so a transport (stdio, HTTP) can be bolted on
//! later without touching the core.
//!
//! Grounded on the teacher's `cli::commands::execute` dispatch shape
//! (parse params → call one core operation → format result), retargeted
//! from CLI args to a `serde_json::Value` params object.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{CommandError, Error};
use crate::memory::{self, MemoryDb};

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    /// Protocol marker, always `"2.0"`.
    pub jsonrpc: String,
    /// Request id, echoed back in the response.
    pub id: Value,
    /// Method name: one of `remember`, `recall`, `list`, `extract`, `forget`.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// Protocol marker, always `"2.0"`.
    pub jsonrpc: String,
    /// Echoes the request id.
    pub id: Value,
    /// Present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    /// Error code (JSON-RPC standard codes plus a generic -32000 for
    /// application errors).
    pub code: i64,
    /// Human-readable message.
    pub message: String,
}

/// A remote-callable operation over the memory service.
pub trait RemoteTool {
    /// Executes `method` with `params`, returning a result value or error.
    ///
    /// # Errors
    /// Returns [`Error`] if the method is unknown, params are malformed, or
    /// the underlying memory operation fails.
    fn call(&self, method: &str, params: &Value) -> Result<Value, Error>;
}

/// Dispatches memory-service operations over the DB at `db`.
pub struct MemoryRemoteTool<'a> {
    db: &'a MemoryDb,
}

impl<'a> MemoryRemoteTool<'a> {
    /// Wraps `db` for remote dispatch.
    #[must_use]
    pub const fn new(db: &'a MemoryDb) -> Self {
        Self { db }
    }
}

fn param_str(params: &Value, key: &str) -> Result<String, Error> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| Error::Command(CommandError::MissingArgument(key.to_string())))
}

fn param_str_opt(params: &Value, key: &str) -> Option<String> {
    params.get(key).and_then(Value::as_str).map(String::from)
}

fn param_tags(params: &Value) -> Vec<String> {
    params
        .get("tags")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

fn param_usize(params: &Value, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(Value::as_u64)
        .map_or(default, |v| v as usize)
}

impl RemoteTool for MemoryRemoteTool<'_> {
    fn call(&self, method: &str, params: &Value) -> Result<Value, Error> {
        match method {
            "remember" => {
                let content = param_str(params, "content")?;
                let tags = params.get("tags").and_then(Value::as_array).map(|arr| {
                    arr.iter().filter_map(|v| v.as_str().map(String::from)).collect()
                });
                let summary = param_str_opt(params, "summary");
                let source = param_str_opt(params, "source").unwrap_or_else(|| "text".to_string());
                let source_name = param_str_opt(params, "source_name");
                let now = params.get("now").and_then(Value::as_f64).unwrap_or(0.0);
                let id = memory::remember(self.db, &content, tags, summary, &source, source_name, now)?;
                Ok(json!({ "id": id }))
            }
            "recall" => {
                let query = param_str(params, "query")?;
                let tags = param_tags(params);
                let max = param_usize(params, "max", 20);
                let hits = memory::recall(self.db, &query, &tags, max)?;
                let text = memory::recall_for_orchestrator(&hits);
                Ok(json!({ "text": text }))
            }
            "list" => {
                let tags = param_tags(params);
                let offset = param_usize(params, "offset", 0);
                let limit = param_usize(params, "limit", 20);
                let entries = memory::list(self.db, &tags, offset, limit)?;
                Ok(json!({ "entries": entries.iter().map(|e| json!({
                    "id": e.id,
                    "summary": e.summary,
                    "tags": e.tags,
                    "timestamp": e.timestamp,
                    "char_count": e.char_count,
                })).collect::<Vec<_>>() }))
            }
            "extract" => {
                let id = param_str(params, "id")?;
                let grep = param_str_opt(params, "grep");
                let context = param_usize(params, "context", 2);
                let chunk_id = param_str_opt(params, "chunk_id");
                let result = memory::memory_extract(self.db, &id, grep.as_deref(), context, chunk_id.as_deref(), None)?;
                let text = match result {
                    memory::MemoryExtraction::Full(text) | memory::MemoryExtraction::Chunk(text) => text,
                    memory::MemoryExtraction::Grep(hunks) => {
                        hunks.into_iter().map(|h| h.text).collect::<Vec<_>>().join("\n---\n")
                    }
                };
                Ok(json!({ "text": crate::gate::gate("extract", &text) }))
            }
            "forget" => {
                let id = param_str(params, "id")?;
                memory::forget(self.db, &id)?;
                Ok(json!({ "ok": true }))
            }
            other => Err(Error::Command(CommandError::UnknownCommand(other.to_string()))),
        }
    }
}

/// Dispatches a single JSON-RPC request, always returning a well-formed
/// response (errors are carried in the envelope, never panicked).
pub fn dispatch(tool: &dyn RemoteTool, request: &Request) -> Response {
    match tool.call(&request.method, &request.params) {
        Ok(result) => Response {
            jsonrpc: "2.0".to_string(),
            id: request.id.clone(),
            result: Some(result),
            error: None,
        },
        Err(e) => Response {
            jsonrpc: "2.0".to_string(),
            id: request.id.clone(),
            result: None,
            error: Some(RpcError {
                code: -32000,
                message: e.to_string(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(method: &str, params: Value) -> Request {
        Request {
            jsonrpc: "2.0".to_string(),
            id: json!(1),
            method: method.to_string(),
            params,
        }
    }

    #[test]
    fn remember_then_recall_round_trips() {
        let db = MemoryDb::in_memory().expect("open");
        let tool = MemoryRemoteTool::new(&db);

        let remembered = dispatch(&tool, &req("remember", json!({"content": "deploy notes", "tags": ["ops"], "summary": "s", "now": 1.0})));
        assert!(remembered.error.is_none());
        let id = remembered.result.unwrap()["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("m_"));

        let recalled = dispatch(&tool, &req("recall", json!({"query": "deploy"})));
        assert!(recalled.error.is_none());
        let text = recalled.result.unwrap()["text"].as_str().unwrap().to_string();
        assert!(text.contains(&id));
    }

    #[test]
    fn unknown_method_is_an_error_envelope_not_panic() {
        let db = MemoryDb::in_memory().expect("open");
        let tool = MemoryRemoteTool::new(&db);
        let response = dispatch(&tool, &req("unknown_verb", json!({})));
        assert!(response.result.is_none());
        assert!(response.error.is_some());
    }

    #[test]
    fn missing_required_param_is_an_error_envelope() {
        let db = MemoryDb::in_memory().expect("open");
        let tool = MemoryRemoteTool::new(&db);
        let response = dispatch(&tool, &req("remember", json!({})));
        assert!(response.error.is_some());
    }

    #[test]
    fn forget_then_extract_is_not_found() {
        let db = MemoryDb::in_memory().expect("open");
        let tool = MemoryRemoteTool::new(&db);
        let remembered = dispatch(&tool, &req("remember", json!({"content": "x", "tags": ["t"], "summary": "s", "now": 1.0})));
        let id = remembered.result.unwrap()["id"].as_str().unwrap().to_string();
        dispatch(&tool, &req("forget", json!({"id": id.clone()})));
        let response = dispatch(&tool, &req("extract", json!({"id": id})));
        assert!(response.error.is_some());
    }
}
