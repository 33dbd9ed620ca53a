//! Tool registry and dispatcher
//!
//! Every tool is registered once at start-up as a [`ToolDescriptor`]: a name
//! from the closed [`ToolName`] set, a description, an input schema generated
//! from the argument struct, and a boxed handler. Dispatch looks the name up,
//! decodes the raw JSON arguments into the handler's argument type and runs
//! the handler against the shared [`ToolContext`].

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::Backend;
use crate::launcher::Launcher;
use crate::mock::MockServerSlot;
use crate::tools::{ToolDefinition, ToolName, ToolResult};
use crate::{Error, Result};

/// State shared by every tool handler
pub struct ToolContext {
    /// Client for the api-testing runner
    pub backend: Arc<dyn Backend>,
    /// The single locally started mock server, if any
    pub mock: MockServerSlot,
    /// Desktop companion launcher
    pub launcher: Launcher,
}

impl ToolContext {
    pub fn new(backend: Arc<dyn Backend>, launcher: Launcher) -> Self {
        Self {
            backend,
            mock: MockServerSlot::default(),
            launcher,
        }
    }
}

/// Uniform handler signature stored in the registry
pub type ToolHandler =
    Arc<dyn Fn(Arc<ToolContext>, Value) -> BoxFuture<'static, Result<ToolResult>> + Send + Sync>;

/// A registered tool
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: ToolName,
    pub description: String,
    pub input_schema: Value,
    handler: ToolHandler,
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl ToolDescriptor {
    /// Build a descriptor from a typed handler
    ///
    /// The input schema is derived from `A`; raw arguments are decoded into
    /// `A` before `handler` runs, and a decode failure becomes
    /// [`Error::InvalidArguments`].
    pub fn new<A, F, Fut>(name: ToolName, description: impl Into<String>, handler: F) -> Self
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(Arc<ToolContext>, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult>> + Send + 'static,
    {
        let handler: ToolHandler = Arc::new(
            move |ctx: Arc<ToolContext>, raw: Value| -> BoxFuture<'static, Result<ToolResult>> {
                match decode_arguments::<A>(name, raw) {
                    Ok(args) => handler(ctx, args).boxed(),
                    Err(e) => futures::future::ready(Err(e)).boxed(),
                }
            },
        );

        Self {
            name,
            description: description.into(),
            input_schema: input_schema_for::<A>(),
            handler,
        }
    }

    /// Wire representation for `tools/list`
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.as_str().to_string(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

/// Decode raw tool arguments; a missing payload is treated as `{}`
pub fn decode_arguments<A: DeserializeOwned>(name: ToolName, raw: Value) -> Result<A> {
    let raw = match raw {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    serde_json::from_value(raw).map_err(|e| Error::invalid_arguments(name.as_str(), e))
}

/// Generate the advertised JSON schema for an argument struct
pub fn input_schema_for<A: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(A)).unwrap_or(Value::Null);
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.entry("properties")
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    schema
}

/// Name-keyed table of tools
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<ToolName, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; fails if the name is already taken
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<()> {
        if self.tools.contains_key(&descriptor.name) {
            return Err(Error::DuplicateTool(descriptor.name.as_str().to_string()));
        }
        self.tools.insert(descriptor.name, descriptor);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        let name: ToolName = name.parse().ok()?;
        self.tools.get(&name)
    }

    /// Definitions in declaration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(ToolDescriptor::definition).collect()
    }

    /// Look up `name`, decode `arguments` and run the handler
    pub async fn dispatch(
        &self,
        ctx: Arc<ToolContext>,
        name: &str,
        arguments: Value,
    ) -> Result<ToolResult> {
        let descriptor = self
            .get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;

        tracing::debug!(tool = name, "Dispatching tool call");

        let result = (descriptor.handler)(ctx, arguments).await?;
        if result.content.is_empty() {
            return Err(Error::EmptyResult(name.to_string()));
        }
        Ok(result)
    }
}
