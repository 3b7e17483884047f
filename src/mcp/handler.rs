//! Tool registry and handler traits.
//!
//! Each tool carries a JSON Schema for its arguments. The schema is compiled
//! once at registration; every call is validated against it and then
//! deserialized into the handler's typed argument struct before the handler
//! runs.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::mcp::protocol::{ContentBlock, Tool, ToolResult};

/// Handler for MCP tool calls.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Arguments produced from a schema-valid `arguments` object.
    type Args: DeserializeOwned + Send + 'static;

    /// Get the tool definition.
    fn definition(&self) -> Tool;

    /// Execute the tool with already validated arguments.
    async fn execute(&self, args: Self::Args) -> Result<ToolResult>;
}

/// Object-safe view of a tool, taking raw JSON arguments.
#[async_trait]
trait ErasedTool: Send + Sync {
    async fn call(&self, arguments: Value) -> Result<ToolResult>;
}

struct Typed<T>(T);

#[async_trait]
impl<T: ToolHandler + 'static> ErasedTool for Typed<T> {
    async fn call(&self, arguments: Value) -> Result<ToolResult> {
        let args: T::Args = serde_json::from_value(arguments)
            .map_err(|e| Error::InvalidToolArguments(e.to_string()))?;
        self.0.execute(args).await
    }
}

struct FnTool<F>(F);

#[async_trait]
impl<F, Fut> ErasedTool for FnTool<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolResult>> + Send + 'static,
{
    async fn call(&self, arguments: Value) -> Result<ToolResult> {
        (self.0)(arguments).await
    }
}

/// A tool contract held by the registry.
pub struct RegisteredTool {
    definition: Tool,
    validator: jsonschema::Validator,
    handler: Arc<dyn ErasedTool>,
}

impl RegisteredTool {
    fn compile(definition: Tool, handler: Arc<dyn ErasedTool>) -> Result<Self> {
        let validator =
            jsonschema::validator_for(&definition.input_schema).map_err(|e| {
                Error::InvalidSchema {
                    tool: definition.name.clone(),
                    message: e.to_string(),
                }
            })?;

        Ok(Self {
            definition,
            validator,
            handler,
        })
    }

    /// The tool definition as advertised by `tools/list`.
    pub fn definition(&self) -> &Tool {
        &self.definition
    }

    /// Check `arguments` against the tool's schema, collecting every violation.
    pub fn validate(&self, arguments: &Value) -> Result<()> {
        let violations: Vec<String> = self
            .validator
            .iter_errors(arguments)
            .map(|e| e.to_string())
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidToolArguments(violations.join("; ")))
        }
    }

    /// Validate, then run the handler. The handler never sees invalid input.
    pub async fn invoke(&self, arguments: Value) -> Result<ToolResult> {
        self.validate(&arguments)?;
        debug!("Invoking tool {}", self.definition.name);
        self.handler.call(arguments).await
    }
}

/// Registry of tool handlers.
pub struct McpHandler {
    tools: HashMap<String, Arc<RegisteredTool>>,
}

impl McpHandler {
    /// Create a new handler registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a typed tool handler. A later registration with the same name
    /// replaces the earlier one.
    pub fn register<T: ToolHandler + 'static>(&mut self, handler: T) -> Result<()> {
        let definition = handler.definition();
        self.insert(definition, Arc::new(Typed(handler)))
    }

    /// Register a tool from its parts, with a handler taking raw arguments.
    pub fn register_fn<F, Fut>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) -> Result<()>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult>> + Send + 'static,
    {
        let definition = Tool {
            name: name.into(),
            description: description.into(),
            input_schema,
        };
        self.insert(definition, Arc::new(FnTool(handler)))
    }

    fn insert(&mut self, definition: Tool, handler: Arc<dyn ErasedTool>) -> Result<()> {
        let name = definition.name.clone();
        let tool = RegisteredTool::compile(definition, handler)?;
        self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    /// Get all registered tools, ordered by name.
    pub fn list_tools(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self
            .tools
            .values()
            .map(|t| t.definition().clone())
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Get a tool by name.
    pub fn get_tool(&self, name: &str) -> Option<Arc<RegisteredTool>> {
        self.tools.get(name).cloned()
    }

    /// Get the number of registered tools.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for McpHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper to create a text content block.
pub fn text_content(text: impl Into<String>) -> ContentBlock {
    ContentBlock::Text { text: text.into() }
}

/// Helper to create a successful tool result.
pub fn success_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![text_content(text)],
        is_error: false,
    }
}

/// Helper to create an error tool result.
pub fn error_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![text_content(text)],
        is_error: true,
    }
}
