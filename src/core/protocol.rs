/// MCP Protocol Dispatcher
///
/// JSON-RPC 2.0 request/response structures and the method dispatcher shared
/// by the HTTP and STDIO transports. The dispatcher advertises tools through
/// `ToolRegistry::list` and executes them through `ToolRegistry::invoke`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::InvokeError;
use crate::core::registry::{Arguments, ToolDescriptor, ToolRegistry};

/// MCP protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

/// Server identity reported in `initialize` responses.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    /// Server name as reported to clients
    pub name: String,
    /// Server version string
    pub version: String,
}

/// JSON-RPC 2.0 request. `id` is `None` for notifications.
#[derive(Deserialize, Debug, Clone)]
pub struct MCPRequest {
    /// JSON-RPC version identifier, expected to be "2.0"
    #[serde(default)]
    pub jsonrpc: String,
    /// Request ID for correlating responses. None indicates a notification.
    #[serde(default)]
    pub id: Option<Value>,
    /// MCP method name (e.g., "initialize", "tools/list", "tools/call")
    pub method: String,
    /// Method-specific parameters
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response carrying either a result or an error.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MCPResponse {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Request ID from the original request
    pub id: Option<Value>,
    /// Present when the request succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Present when the request failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MCPError>,
}

impl MCPResponse {
    /// Successful response carrying `result`.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response.
    ///
    /// # Arguments
    /// * `id` - Request ID from the client
    /// * `code` - JSON-RPC error code (e.g., -32601 for method not found)
    /// * `message` - Human-readable error message
    pub fn failure(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(MCPError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MCPError {
    /// JSON-RPC error code
    pub code: i32,
    /// Human-readable error message
    pub message: String,
    /// Optional additional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Tool entry as advertised by `tools/list`.
#[derive(Serialize, Debug, Clone)]
pub struct MCPTool {
    /// Unique tool identifier
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema of the tool's input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl From<&ToolDescriptor> for MCPTool {
    fn from(descriptor: &ToolDescriptor) -> Self {
        Self {
            name: descriptor.name().to_string(),
            description: descriptor.description().to_string(),
            input_schema: descriptor.input_schema(),
        }
    }
}

/// All registered tools in registration order, in wire form.
pub fn list_tools(registry: &ToolRegistry) -> Vec<MCPTool> {
    registry.list().iter().map(|d| MCPTool::from(d.as_ref())).collect()
}

/// Route a request to its method handler.
///
/// Returns `None` for notifications, which never get a response.
pub fn dispatch(info: &ServerInfo, registry: &ToolRegistry, req: MCPRequest) -> Option<MCPResponse> {
    if req.id.is_none() {
        tracing::debug!(method = %req.method, "notification received");
        return None;
    }

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(info, req.id),
        "ping" => MCPResponse::success(req.id, serde_json::json!({})),
        "tools/list" => handle_tools_list(registry, req.id),
        "tools/call" => handle_tools_call(registry, req.id, req.params),
        _ => MCPResponse::failure(
            req.id,
            METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    };
    Some(response)
}

fn handle_initialize(info: &ServerInfo, id: Option<Value>) -> MCPResponse {
    MCPResponse::success(
        id,
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": info.name,
                "version": info.version
            }
        }),
    )
}

fn handle_tools_list(registry: &ToolRegistry, id: Option<Value>) -> MCPResponse {
    MCPResponse::success(id, serde_json::json!({ "tools": list_tools(registry) }))
}

/// Execute a tool. Handler failures are reported in-band with `isError`,
/// lookup and argument failures as JSON-RPC errors.
fn handle_tools_call(registry: &ToolRegistry, id: Option<Value>, params: Option<Value>) -> MCPResponse {
    let Some(params) = params else {
        return MCPResponse::failure(id, INVALID_PARAMS, "Invalid params");
    };

    let tool_name = params.get("name").and_then(Value::as_str).unwrap_or("");
    let arguments = match Arguments::from_value(params.get("arguments").cloned().unwrap_or(Value::Null)) {
        Ok(args) => args,
        Err(reason) => return MCPResponse::failure(id, INVALID_PARAMS, reason),
    };

    match registry.invoke(tool_name, &arguments) {
        Ok(result) => MCPResponse::success(
            id,
            serde_json::json!({
                "content": [
                    {
                        "type": "text",
                        "text": serde_json::to_string(&result).unwrap_or_default()
                    }
                ],
                "structuredContent": result,
                "isError": false
            }),
        ),
        Err(InvokeError::Handler(message)) => {
            tracing::warn!(tool = %tool_name, error = %message, "tool handler failed");
            MCPResponse::success(
                id,
                serde_json::json!({
                    "content": [
                        {
                            "type": "text",
                            "text": format!("Error: {}", message)
                        }
                    ],
                    "isError": true
                }),
            )
        }
        Err(e @ InvokeError::UnknownTool(_)) => MCPResponse::failure(id, METHOD_NOT_FOUND, e.to_string()),
        Err(e @ InvokeError::ArgumentMismatch { .. }) => {
            MCPResponse::failure(id, INVALID_PARAMS, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn info() -> ServerInfo {
        ServerInfo {
            name: "test-server".to_string(),
            version: "9.9.9".to_string(),
        }
    }

    fn request(value: Value) -> MCPRequest {
        serde_json::from_value(value).unwrap()
    }

    fn call(value: Value) -> MCPResponse {
        let registry = tools::initialize_tools(Default::default()).unwrap();
        dispatch(&info(), &registry, request(value)).expect("response expected")
    }

    #[test]
    fn test_initialize() {
        let resp = call(json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize" }));
        assert_eq!(
            resp.result.unwrap(),
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": { "tools": {} },
                "serverInfo": { "name": "test-server", "version": "9.9.9" }
            })
        );
    }

    #[test]
    fn test_notification_gets_no_response() {
        let registry = ToolRegistry::new();
        let req = request(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }));
        assert!(dispatch(&info(), &registry, req).is_none());
    }

    #[test]
    fn test_tools_list_in_registration_order() {
        let resp = call(json!({ "jsonrpc": "2.0", "id": "a", "method": "tools/list" }));
        let result = resp.result.unwrap();
        let names: Vec<&str> = result["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["add", "multiply", "subtract", "divide", "multiply_endpoint"]);
        assert_eq!(result["tools"][0]["inputSchema"]["required"], json!(["a", "b"]));
        assert_eq!(result["tools"][0]["description"], "Add two numbers and return the sum.");
    }

    #[test]
    fn test_tools_call_success() {
        let resp = call(json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": { "name": "add", "arguments": { "a": 2, "b": 3 } }
        }));
        assert_eq!(resp.id, Some(json!(7)));
        assert_eq!(
            resp.result.unwrap(),
            json!({
                "content": [{ "type": "text", "text": "{\"sum\":5}" }],
                "structuredContent": { "sum": 5 },
                "isError": false
            })
        );
    }

    #[test]
    fn test_tools_call_unknown_tool() {
        let resp = call(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": { "name": "modulo", "arguments": { "a": 1, "b": 2 } }
        }));
        let error = resp.error.unwrap();
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert_eq!(error.message, "unknown tool: modulo");
    }

    #[test]
    fn test_tools_call_argument_mismatch() {
        let resp = call(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": { "name": "add", "arguments": { "a": 1 } }
        }));
        let error = resp.error.unwrap();
        assert_eq!(error.code, INVALID_PARAMS);
        assert_eq!(error.message, "tool 'add': missing required argument 'b'");
    }

    #[test]
    fn test_tools_call_without_params() {
        let resp = call(json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/call" }));
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);
    }

    #[test]
    fn test_unknown_method() {
        let resp = call(json!({ "jsonrpc": "2.0", "id": 1, "method": "resources/list" }));
        assert!(resp.result.is_none());
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[test]
    fn test_response_serialization_omits_empty_fields() {
        let resp = MCPResponse::success(Some(json!(1)), json!({}));
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({ "jsonrpc": "2.0", "id": 1, "result": {} })
        );
    }
}
