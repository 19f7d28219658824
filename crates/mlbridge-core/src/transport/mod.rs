//! TCP transport for the bridge protocol.
//!
//! Length-prefixed JSON-RPC 2.0 over TCP connections, with byte payloads in
//! binary sections after each JSON header.
//!
//! # Architecture
//!
//! - **Server**: hosts a runtime, accepts connections, dispatches calls
//! - **Client**: blocking [`Bridge`](crate::Bridge) implementation used by the proxy
//! - **Protocol**: shared framing and JSON-RPC types used by both
//! - **Wire**: header form of values, with byte payloads split out

pub mod client;
pub mod protocol;
pub mod server;
pub mod wire;

pub use client::TcpBridge;
pub use protocol::{BridgeRequest, BridgeResponse, RpcError};
pub use server::{process_request, BridgeDispatch, BridgeServer, BridgeServerHandle, SERVER_BUSY};
