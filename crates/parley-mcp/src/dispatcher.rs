//! JSON-RPC routing for the MCP surface

use std::time::Duration;

use parley_channel::{
    ConfigSnapshot, Diagnostic, Diagnostics, FeedbackCall, WaitError, Waiter,
    DEFAULT_CALL_TIMEOUT,
};
use parley_protocol::{
    CallToolParams, InitializeResult, ListToolsResult, Request, RequestId, Response,
    ServerCapabilities, ServerInfo, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND,
    PROTOCOL_VERSION,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::tool;

#[derive(Debug, Clone)]
pub struct DispatcherOptions {
    /// Upper bound on how long one `tools/call` waits for the human.
    pub call_timeout: Duration,
    pub server_name: String,
    pub server_version: String,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            server_name: "parley".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Result of routing one request.
#[derive(Debug)]
pub enum Routed {
    /// Answered without waiting; `None` for notifications.
    Immediate(Option<Response>),
    /// A claimed tool call that must still wait for the human.
    Pending(PendingCall),
}

/// A `tools/call` that holds the waiter's in-flight slot.
#[derive(Debug)]
pub struct PendingCall {
    id: Option<RequestId>,
    prompt: String,
    timeout: Duration,
    call: FeedbackCall,
}

impl PendingCall {
    pub fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }

    pub async fn finish(self) -> Response {
        match self.call.wait(&self.prompt, self.timeout).await {
            Ok(reply) => to_result(self.id, &tool::reply_content(&reply)),
            Err(e) => wait_error(self.id, e),
        }
    }
}

pub struct Dispatcher {
    waiter: Waiter,
    options: DispatcherOptions,
    diagnostics: Diagnostics,
}

impl Dispatcher {
    pub fn new(waiter: Waiter) -> Self {
        Self {
            waiter,
            options: DispatcherOptions::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn with_options(mut self, options: DispatcherOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn options(&self) -> &DispatcherOptions {
        &self.options
    }

    /// Parse one line. Malformed frames are reported and dropped.
    pub fn parse_frame(&self, line: &str) -> Option<Request> {
        match serde_json::from_str::<Request>(line) {
            Ok(request) => Some(request),
            Err(e) => {
                self.diagnostics.report(Diagnostic::MalformedFrame {
                    line: line.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// Parse and fully handle one line, waiting for the human if needed.
    #[cfg(test)]
    async fn handle_line(&self, line: &str) -> Option<Response> {
        let request = self.parse_frame(line)?;
        match self.route(request) {
            Routed::Immediate(response) => response,
            Routed::Pending(call) => Some(call.finish().await),
        }
    }

    /// Route a request without waiting on the human.
    pub fn route(&self, request: Request) -> Routed {
        if request.is_notification() {
            self.handle_notification(&request);
            return Routed::Immediate(None);
        }

        debug!("Handling request: method={}", request.method);
        let id = request.id;
        match request.method.as_str() {
            "initialize" => Routed::Immediate(Some(self.handle_initialize(id))),
            "ping" => Routed::Immediate(Some(Response::success(id, json!({})))),
            "tools/list" => Routed::Immediate(Some(self.handle_list_tools(id))),
            "tools/call" => self.handle_call_tool(id, request.params),
            method => {
                debug!("Unknown method: {}", method);
                Routed::Immediate(Some(Response::error_with_data(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", method),
                    Some(json!({ "method": method })),
                )))
            }
        }
    }

    fn handle_notification(&self, request: &Request) {
        match request.method.as_str() {
            "initialized" | "notifications/initialized" => {
                info!("Client confirmed initialization");
            }
            "notifications/cancelled" => {
                debug!("Request cancelled: {:?}", request.params);
            }
            other => debug!("Ignoring notification: {}", other),
        }
    }

    fn handle_initialize(&self, id: Option<RequestId>) -> Response {
        info!("Handling initialize request");
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: ServerInfo {
                name: self.options.server_name.clone(),
                version: self.options.server_version.clone(),
            },
        };
        to_result(id, &result)
    }

    fn handle_list_tools(&self, id: Option<RequestId>) -> Response {
        let config = self.config();
        debug!("Listing tool {}", config.tool_name);
        let result = ListToolsResult {
            tools: vec![tool::descriptor(&config)],
        };
        to_result(id, &result)
    }

    fn handle_call_tool(&self, id: Option<RequestId>, params: Value) -> Routed {
        let params: CallToolParams = if params.is_null() {
            CallToolParams::default()
        } else {
            match serde_json::from_value(params) {
                Ok(params) => params,
                Err(e) => {
                    return Routed::Immediate(Some(Response::error(
                        id,
                        INVALID_PARAMS,
                        format!("Invalid params: {}", e),
                    )))
                }
            }
        };

        let config = self.config();
        if params.name != config.tool_name {
            warn!("Call for unknown tool: {:?}", params.name);
            return Routed::Immediate(Some(Response::error(
                id,
                INVALID_PARAMS,
                format!("Unknown tool: {}", params.name),
            )));
        }

        match self.waiter.begin() {
            Ok(call) => {
                let prompt = tool::prompt_from(&params);
                info!("Asking the human ({} chars)", prompt.chars().count());
                Routed::Pending(PendingCall {
                    id,
                    prompt,
                    timeout: self.options.call_timeout,
                    call,
                })
            }
            Err(e) => Routed::Immediate(Some(wait_error(id, e))),
        }
    }

    fn config(&self) -> ConfigSnapshot {
        ConfigSnapshot::load(self.waiter.mailbox())
    }
}

fn to_result(id: Option<RequestId>, result: &impl Serialize) -> Response {
    match serde_json::to_value(result) {
        Ok(value) => Response::success(id, value),
        Err(e) => {
            error!("Failed to serialize result: {}", e);
            Response::error(id, INTERNAL_ERROR, "Internal error")
        }
    }
}

fn wait_error(id: Option<RequestId>, err: WaitError) -> Response {
    match err {
        WaitError::Busy => Response::error(id, INVALID_PARAMS, err.to_string()),
        WaitError::Channel(e) => {
            error!("Channel error while waiting for feedback: {}", e);
            Response::error(id, INTERNAL_ERROR, "Feedback channel unavailable")
        }
    }
}
