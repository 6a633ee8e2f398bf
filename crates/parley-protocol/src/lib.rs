mod mcp;
mod protocol;

pub use mcp::{
    CallToolParams, CallToolResult, Content, InitializeResult, ListToolsResult, ServerCapabilities,
    ServerInfo, Tool, ToolsCapability, PROTOCOL_VERSION,
};
pub use protocol::{
    Request, RequestId, Response, RpcError, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND,
};
