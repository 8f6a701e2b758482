//! MCP Gateway Operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the MCP gateway controller.

pub mod condition;
pub mod mcp_server;

pub use condition::*;
pub use mcp_server::*;
