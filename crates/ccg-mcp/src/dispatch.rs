//! The tool-dispatch shim (§4.9): a hand-rolled JSON-RPC 2.0 stdio loop,
//! narrowed to the three tool calls this bridge exposes. Modeled on the
//! teacher's own `mcp_server.rs`, adapted to async line reads so it can share
//! a runtime with the retry driver, and on `csa-mcp-hub`'s
//! `jsonrpc_result`/`jsonrpc_error` envelope helpers.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use ccg_core::Adapter;

use crate::request_parse;

#[derive(Deserialize)]
struct JsonRpcRequest {
    #[serde(default)]
    #[allow(dead_code)]
    jsonrpc: Option<String>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
    id: Option<Value>,
}

#[derive(Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcErrorBody>,
    id: Option<Value>,
}

#[derive(Serialize)]
struct JsonRpcErrorBody {
    code: i32,
    message: String,
}

fn ok(id: Option<Value>, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        result: Some(result),
        error: None,
        id,
    }
}

fn err(id: Option<Value>, code: i32, message: impl Into<String>) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        result: None,
        error: Some(JsonRpcErrorBody {
            code,
            message: message.into(),
        }),
        id,
    }
}

/// Run the stdio loop until stdin closes. One JSON-RPC request/response per
/// line; a malformed line gets a `-32700` response rather than killing the
/// loop. stdout carries only JSON-RPC framing — log lines and the metrics
/// stream both go to stderr (§4.8, §4.9).
pub async fn run() -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin).lines();
    let mut writer = stdout;

    while let Some(line) = reader.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        debug!(line = trimmed, "received JSON-RPC request");

        let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
            Ok(request) => handle(request).await,
            Err(parse_error) => err(None, -32700, format!("parse error: {parse_error}")),
        };

        if response.id.is_none() && response.result.is_none() && response.error.is_none() {
            // A notification's synthetic "no response" marker (see
            // `notifications/initialized` below) — nothing to write.
            continue;
        }

        write_line(&mut writer, &response).await?;
    }

    Ok(())
}

async fn write_line(writer: &mut tokio::io::Stdout, response: &JsonRpcResponse) -> anyhow::Result<()> {
    let payload = serde_json::to_string(response)?;
    writer.write_all(payload.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

async fn handle(request: JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id.clone();

    match request.method.as_str() {
        "initialize" => ok(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "ccg-mcp", "version": env!("CARGO_PKG_VERSION")},
            }),
        ),
        "notifications/initialized" => JsonRpcResponse {
            jsonrpc: "2.0",
            result: None,
            error: None,
            id: None,
        },
        "tools/list" => ok(id, json!({"tools": tool_catalog()})),
        "tools/call" => match handle_tool_call(request.params).await {
            Ok(value) => ok(id, value),
            Err((code, message)) => err(id, code, message),
        },
        "shutdown" => ok(id, json!({})),
        other => {
            warn!(method = other, "unknown JSON-RPC method");
            err(id, -32601, format!("method not found: {other}"))
        }
    }
}

/// §6: `tools/list` returns the three adapter names with a JSON-schema-shaped
/// parameter description each.
fn tool_catalog() -> Vec<Value> {
    let schema = json!({
        "type": "object",
        "properties": {
            "prompt": {"type": "string", "description": "task prompt"},
            "working_dir": {"type": "string", "description": "absolute working directory"},
            "sandbox": {"type": "string", "enum": ["read-only", "workspace-write", "danger-full-access"]},
            "session_id": {"type": "string", "description": "prior session id to resume"},
            "model": {"type": "string"},
            "yolo": {"type": "boolean"},
            "idle_timeout_secs": {"type": "integer"},
            "wall_timeout_secs": {"type": "integer"},
            "max_retries": {"type": "integer"},
            "return_all_messages": {"type": "boolean"},
            "log_metrics": {"type": "boolean"},
        },
        "required": ["prompt"],
    });

    vec![
        json!({"name": "code-executor", "description": "Hosted-Claude-compatible coding agent", "inputSchema": schema}),
        json!({"name": "reviewer", "description": "Code review agent", "inputSchema": schema}),
        json!({"name": "generalist", "description": "Generalist coding assistant", "inputSchema": schema}),
    ]
}

async fn handle_tool_call(params: Option<Value>) -> Result<Value, (i32, String)> {
    let params = params.ok_or((-32602, "missing params for tools/call".to_string()))?;
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or((-32602, "missing tool name".to_string()))?;
    let adapter = adapter_for_tool_name(name).ok_or((-32601, format!("unknown tool '{name}'")))?;
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

    let req = request_parse::parse(adapter, &arguments).map_err(|e| (-32602, e))?;
    let log_metrics = req.log_metrics;

    let outcome = ccg_retry::invoke(req).await;
    if log_metrics {
        outcome.metrics.emit_to_stderr();
    }

    serde_json::to_value(&outcome.result).map_err(|e| (-32603, e.to_string()))
}

fn adapter_for_tool_name(name: &str) -> Option<Adapter> {
    match name {
        "code-executor" => Some(Adapter::CodeExecutor),
        "reviewer" => Some(Adapter::Reviewer),
        "generalist" => Some(Adapter::Generalist),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let response = handle(JsonRpcRequest {
            jsonrpc: Some("2.0".to_string()),
            method: "initialize".to_string(),
            params: None,
            id: Some(json!(1)),
        })
        .await;
        assert!(response.error.is_none());
        assert_eq!(
            response.result.unwrap()["serverInfo"]["name"],
            json!("ccg-mcp")
        );
    }

    #[tokio::test]
    async fn tools_list_returns_three_adapters() {
        let response = handle(JsonRpcRequest {
            jsonrpc: Some("2.0".to_string()),
            method: "tools/list".to_string(),
            params: None,
            id: Some(json!(2)),
        })
        .await;
        let tools = response.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 3);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let response = handle(JsonRpcRequest {
            jsonrpc: Some("2.0".to_string()),
            method: "bogus".to_string(),
            params: None,
            id: Some(json!(3)),
        })
        .await;
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn tools_call_with_unknown_tool_name_is_method_not_found() {
        let response = handle(JsonRpcRequest {
            jsonrpc: Some("2.0".to_string()),
            method: "tools/call".to_string(),
            params: Some(json!({"name": "nonexistent", "arguments": {}})),
            id: Some(json!(4)),
        })
        .await;
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn tools_call_missing_prompt_is_invalid_params() {
        let response = handle(JsonRpcRequest {
            jsonrpc: Some("2.0".to_string()),
            method: "tools/call".to_string(),
            params: Some(json!({"name": "reviewer", "arguments": {}})),
            id: Some(json!(5)),
        })
        .await;
        assert_eq!(response.error.unwrap().code, -32602);
    }
}
