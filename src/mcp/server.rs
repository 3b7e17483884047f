//! MCP server implementation.
//!
//! [`McpServer`] is the dispatcher shared by both transports: it resolves a
//! request's method, runs tools, and turns every outcome into exactly one
//! response frame carrying the request's id.

use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::mcp::handler::{error_result, McpHandler};
use crate::mcp::protocol::*;
use crate::mcp::transport::{Message, Transport};
use crate::metrics::Metrics;
use crate::VERSION;

/// MCP server.
#[derive(Clone)]
pub struct McpServer {
    handler: Arc<McpHandler>,
    metrics: Arc<Metrics>,
    name: String,
    version: String,
}

impl McpServer {
    /// Create a new MCP server.
    pub fn new(handler: McpHandler, name: impl Into<String>) -> Self {
        Self::with_metrics(handler, Metrics::new(), name)
    }

    /// Create a new MCP server reporting into an existing metrics collector.
    pub fn with_metrics(handler: McpHandler, metrics: Arc<Metrics>, name: impl Into<String>) -> Self {
        Self {
            handler: Arc::new(handler),
            metrics,
            name: name.into(),
            version: VERSION.to_string(),
        }
    }

    /// The metrics collector.
    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    /// Server info advertised during initialization.
    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }

    /// Run the server with the given transport until its input ends.
    ///
    /// Each request runs on its own task, so responses may be written in a
    /// different order than requests arrived.
    pub async fn run<T: Transport>(&self, mut transport: T) -> Result<()> {
        info!("Starting MCP server: {} v{}", self.name, self.version);

        let (mut incoming, outgoing) = transport.start().await?;
        let mut in_flight = JoinSet::new();

        while let Some(msg) = incoming.recv().await {
            match msg {
                Message::Request(req) => {
                    let server = self.clone();
                    let outgoing = outgoing.clone();
                    in_flight.spawn(async move {
                        let response = server.handle_request(req).await;
                        if outgoing.send(Message::Response(response)).await.is_err() {
                            error!("Failed to send response: output closed");
                        }
                    });
                }
                Message::Notification(notif) => {
                    self.handle_notification(notif).await;
                }
                Message::Response(_) => {
                    warn!("Received unexpected response");
                }
            }

            while in_flight.try_join_next().is_some() {}
        }

        while in_flight.join_next().await.is_some() {}
        drop(outgoing);

        transport.stop().await?;
        info!("MCP server stopped");
        Ok(())
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        debug!("Handling request: {} (id: {:?})", req.method, req.id);
        self.metrics.inc_requests();

        let result = match req.method.as_str() {
            "initialize" => self.handle_initialize(req.params),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(req.params).await,
            _ => Err(Error::MethodNotFound(req.method.clone())),
        };

        match result {
            Ok(value) => {
                self.metrics.inc_success();
                JsonRpcResponse::success(req.id, value)
            }
            Err(e) => {
                self.metrics.inc_failed();
                let code = match e {
                    Error::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
                    Error::InvalidToolArguments(_) => error_codes::INVALID_PARAMS,
                    _ => error_codes::INTERNAL_ERROR,
                };
                JsonRpcResponse::error(req.id, code, e.to_string())
            }
        }
    }

    /// Handle a notification.
    pub async fn handle_notification(&self, notif: JsonRpcNotification) {
        debug!("Handling notification: {}", notif.method);

        match notif.method.as_str() {
            "notifications/initialized" => {
                info!("Client initialized");
            }
            "notifications/cancelled" => {
                // In-flight tools are not aborted; their response is still sent
                // if the session is alive.
                let request_id = notif
                    .params
                    .as_ref()
                    .and_then(|p| p.get("requestId"))
                    .cloned()
                    .unwrap_or(Value::Null);
                info!("Client cancelled request: {}", request_id);
            }
            _ => {
                debug!("Unknown notification: {}", notif.method);
            }
        }
    }

    /// Handle initialize request.
    fn handle_initialize(&self, params: Option<Value>) -> Result<Value> {
        if let Some(client) = params.as_ref().and_then(|p| p.get("clientInfo")) {
            let name = client.get("name").and_then(|v| v.as_str()).unwrap_or("unknown");
            let version = client.get("version").and_then(|v| v.as_str()).unwrap_or("");
            info!("Client connected: {} {}", name, version);
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
                logging: Some(LoggingCapability {}),
            },
            server_info: self.server_info(),
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle list tools request.
    fn handle_list_tools(&self) -> Result<Value> {
        let tools = self.handler.list_tools();
        let result = ListToolsResult { tools };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle call tool request.
    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        let params: CallToolParams = params
            .ok_or_else(|| Error::InvalidToolArguments("Missing params".to_string()))
            .and_then(|v| {
                serde_json::from_value(v).map_err(|e| Error::InvalidToolArguments(e.to_string()))
            })?;

        let result = self.call_tool(&params.name, params.arguments).await;
        Ok(serde_json::to_value(result)?)
    }

    /// Invoke a tool, always producing a content envelope.
    ///
    /// Unknown tools, schema violations, handler errors and handler panics all
    /// come back as a [`ToolResult`] with `is_error` set.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolResult {
        self.metrics.inc_tool_calls();

        let Some(tool) = self.handler.get_tool(name) else {
            warn!("Unknown tool requested: {}", name);
            self.metrics.inc_tool_errors();
            return error_result(Error::ToolNotFound(name.to_string()).to_string());
        };

        let outcome = AssertUnwindSafe(tool.invoke(arguments)).catch_unwind().await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(Error::InvalidToolArguments(detail))) => {
                debug!("Rejected arguments for {}: {}", name, detail);
                error_result(format!("Invalid arguments for tool {}: {}", name, detail))
            }
            Ok(Err(e)) => {
                warn!("Tool {} failed: {}", name, e);
                error_result(e.to_string())
            }
            Err(_) => {
                error!("Tool {} panicked", name);
                error_result(format!("Tool {} failed unexpectedly", name))
            }
        };

        if result.is_error {
            self.metrics.inc_tool_errors();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::handler::success_result;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    use crate::mcp::transport::LineTransport;

    fn request(id: i64, method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Number(id),
            method: method.to_string(),
            params: Some(params),
        }
    }

    fn explode() -> Result<ToolResult> {
        panic!("boom")
    }

    fn server_with_counter() -> (McpServer, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut handler = McpHandler::new();
        handler
            .register_fn(
                "greet",
                "Greets someone",
                json!({
                    "type": "object",
                    "properties": { "name": { "type": "string", "minLength": 1 } },
                    "required": ["name"]
                }),
                move |args: Value| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        let name = args["name"].as_str().unwrap_or_default().to_string();
                        Ok(success_result(format!("Hello, {name}!")))
                    }
                },
            )
            .unwrap();
        handler
            .register_fn(
                "fail",
                "Always fails",
                json!({"type": "object"}),
                |_| async { Err(Error::api(502, "Bad Gateway", "upstream down")) },
            )
            .unwrap();
        handler
            .register_fn(
                "explode",
                "Panics",
                json!({"type": "object"}),
                |_| async { explode() },
            )
            .unwrap();

        (McpServer::new(handler, "test-server"), calls)
    }

    fn tool_result(response: &JsonRpcResponse) -> ToolResult {
        serde_json::from_value(response.result.clone().expect("result")).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let (server, _) = server_with_counter();
        let response = server
            .handle_request(request(
                1,
                "initialize",
                json!({"clientInfo": {"name": "test", "version": "0.1"}}),
            ))
            .await;

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_VERSION);
        assert_eq!(result["serverInfo"]["name"], "test-server");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_list_tools_matches_registry() {
        let (server, _) = server_with_counter();
        let response = server.handle_request(request(2, "tools/list", json!({}))).await;

        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
        let names: Vec<_> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["explode", "fail", "greet"]);
        assert!(tools.iter().all(|t| t["inputSchema"].is_object()));
    }

    #[tokio::test]
    async fn test_call_tool_success() {
        let (server, calls) = server_with_counter();
        let response = server
            .handle_request(request(
                3,
                "tools/call",
                json!({"name": "greet", "arguments": {"name": "Ada"}}),
            ))
            .await;

        assert_eq!(response.id, RequestId::Number(3));
        let result = tool_result(&response);
        assert!(!result.is_error);
        assert_eq!(result.text(), "Hello, Ada!");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_arguments_do_not_reach_handler() {
        let (server, calls) = server_with_counter();

        for bad in [json!({}), json!({"name": ""}), json!({"name": 42})] {
            let response = server
                .handle_request(request(
                    4,
                    "tools/call",
                    json!({"name": "greet", "arguments": bad}),
                ))
                .await;

            let result = tool_result(&response);
            assert!(result.is_error);
            assert!(result.text().starts_with("Invalid arguments for tool greet"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_envelope() {
        let (server, _) = server_with_counter();
        let response = server
            .handle_request(request(5, "tools/call", json!({"name": "nope"})))
            .await;

        assert!(response.error.is_none());
        let result = tool_result(&response);
        assert!(result.is_error);
        assert_eq!(result.text(), "Unknown tool: nope");
    }

    #[tokio::test]
    async fn test_handler_error_and_panic_are_envelopes() {
        let (server, _) = server_with_counter();

        let failed = server.call_tool("fail", json!({})).await;
        assert!(failed.is_error);
        assert!(failed.text().contains("502"));

        let panicked = server.call_tool("explode", json!({})).await;
        assert!(panicked.is_error);
        assert!(panicked.text().contains("explode"));

        assert_eq!(server.metrics().snapshot().tool_errors, 2);
    }

    #[tokio::test]
    async fn test_unknown_method_and_bad_params() {
        let (server, _) = server_with_counter();

        let response = server.handle_request(request(6, "resources/list", json!({}))).await;
        assert_eq!(response.error.unwrap().code, error_codes::METHOD_NOT_FOUND);

        let response = server
            .handle_request(request(7, "tools/call", json!({"arguments": {}})))
            .await;
        assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_ping() {
        let (server, _) = server_with_counter();
        let response = server.handle_request(request(8, "ping", json!({}))).await;
        assert_eq!(response.result, Some(json!({})));
    }

    #[tokio::test]
    async fn test_run_correlates_out_of_order_responses() {
        let mut handler = McpHandler::new();
        handler
            .register_fn(
                "sleep",
                "Sleeps for `ms` milliseconds",
                json!({
                    "type": "object",
                    "properties": { "ms": { "type": "integer", "minimum": 0 } },
                    "required": ["ms"]
                }),
                |args: Value| async move {
                    let ms = args["ms"].as_u64().unwrap_or(0);
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(success_result(format!("slept {ms}")))
                },
            )
            .unwrap();
        let server = McpServer::new(handler, "test-server");

        let (client_side, server_side) = tokio::io::duplex(8192);
        let (server_read, server_write) = tokio::io::split(server_side);
        let (client_read, mut client_write) = tokio::io::split(client_side);

        let run = tokio::spawn(async move {
            server
                .run(LineTransport::from_io(server_read, server_write))
                .await
        });

        let slow = r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"sleep","arguments":{"ms":200}}}"#;
        let fast = r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"sleep","arguments":{"ms":0}}}"#;
        client_write
            .write_all(format!("{slow}\n{fast}\n").as_bytes())
            .await
            .unwrap();

        let mut lines = BufReader::new(client_read).lines();
        let first: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        let second: Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();

        assert_eq!(first["id"], 2);
        assert_eq!(first["result"]["content"][0]["text"], "slept 0");
        assert_eq!(second["id"], 1);
        assert_eq!(second["result"]["content"][0]["text"], "slept 200");

        client_write.shutdown().await.unwrap();
        run.await.unwrap().unwrap();
    }
}
