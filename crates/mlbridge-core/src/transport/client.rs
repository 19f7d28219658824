//! Blocking TCP bridge client.
//!
//! `TcpBridge` implements [`Bridge`] over the framed JSON-RPC protocol. The
//! public API is synchronous: each call drives a private current-thread tokio
//! runtime until the response frame arrives. Byte payloads in arguments and
//! results travel as binary sections after the JSON header.
//!
//! # Thread Safety
//!
//! The stream sits behind a tokio `Mutex`, so one request/response pair is on
//! the wire at a time and the client can be shared across threads.
//!
//! Do not call into a `TcpBridge` from inside another tokio runtime; blocking
//! on its private runtime from an async context panics.

use super::protocol::{encode_request, read_frame, read_sections, write_message, BridgeResponse};
use super::wire::{attach_value, detach_call, section_lengths, WireValue};
use crate::bridge::{Bridge, BridgeCall, CallStaticParams, ConstructParams, InvokeParams};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::handle::RemoteHandle;
use crate::value::RemoteValue;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::sync::Mutex;
use tracing::debug;

/// Bridge client connected to a remote runtime host.
#[derive(Debug)]
pub struct TcpBridge {
    runtime: Runtime,
    stream: Mutex<TcpStream>,
    addr: SocketAddr,
    next_id: AtomicU64,
}

impl TcpBridge {
    /// Connect to a bridge server.
    ///
    /// Uses `BridgeConfig::CONNECT_TIMEOUT` for connection establishment only;
    /// individual calls have no timeout.
    pub fn connect(addr: SocketAddr) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let stream = runtime
            .block_on(async {
                tokio::time::timeout(BridgeConfig::CONNECT_TIMEOUT, TcpStream::connect(addr)).await
            })
            .map_err(|_| BridgeError::protocol(format!("Timed out connecting to {}", addr)))?
            .map_err(|e| BridgeError::protocol(format!("Failed to connect to {}: {}", addr, e)))?;

        debug!("Bridge client connected to {}", addr);

        Ok(Self {
            runtime,
            stream: Mutex::new(stream),
            addr,
            next_id: AtomicU64::new(1),
        })
    }

    /// Get the address of the connected server.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Send one call and wait for its result.
    pub fn call(&self, call: BridgeCall) -> Result<RemoteValue> {
        self.runtime.block_on(self.call_async(call))
    }

    async fn call_async(&self, call: BridgeCall) -> Result<RemoteValue> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (call, sections) = detach_call(call)?;
        let header = encode_request(&call, id, &section_lengths(&sections))?;

        let mut stream = self.stream.lock().await;
        let (mut reader, mut writer) = stream.split();

        write_message(&mut writer, &header, &sections)
            .await
            .map_err(|e| BridgeError::protocol(format!("Failed to send request: {}", e)))?;
        drop(sections);

        let response_header = read_frame(&mut reader)
            .await
            .map_err(|e| BridgeError::protocol(format!("Failed to read response: {}", e)))?
            .ok_or_else(|| BridgeError::protocol("Connection closed by bridge host"))?;

        let response: BridgeResponse = serde_json::from_slice(&response_header)
            .map_err(|e| BridgeError::protocol(format!("Malformed bridge response: {}", e)))?;

        let sections = read_sections(&mut reader, &response.sections)
            .await
            .map_err(|e| BridgeError::protocol(format!("Failed to read response: {}", e)))?;

        if response.id != Some(serde_json::Value::from(id)) {
            // Connection-level errors, such as a host at capacity, carry no id
            return Err(match response.error {
                Some(err) if response.id.is_none() => err.into_bridge_error(),
                _ => BridgeError::protocol(format!(
                    "Response id {:?} does not match request id {}",
                    response.id, id
                )),
            });
        }

        if let Some(err) = response.error {
            return Err(err.into_bridge_error());
        }

        let result = response
            .result
            .ok_or_else(|| BridgeError::protocol("Bridge response missing result"))?;

        let value: WireValue = serde_json::from_value(result)
            .map_err(|e| BridgeError::protocol(format!("Malformed bridge value: {}", e)))?;
        attach_value(value, sections)
            .map_err(|e| BridgeError::protocol(format!("Malformed bridge value: {}", e)))
    }
}

impl Bridge for TcpBridge {
    fn invoke(
        &self,
        target: &RemoteHandle,
        method: &str,
        args: Vec<RemoteValue>,
    ) -> Result<RemoteValue> {
        self.call(BridgeCall::Invoke(InvokeParams {
            target: target.clone(),
            method: method.to_string(),
            args,
        }))
    }

    fn construct(&self, class_name: &str, args: Vec<RemoteValue>) -> Result<RemoteHandle> {
        let value = self.call(BridgeCall::Construct(ConstructParams {
            class_name: class_name.to_string(),
            args,
        }))?;
        match value {
            RemoteValue::Handle(handle) => Ok(handle),
            other => Err(BridgeError::protocol(format!(
                "Construction of {} returned {} instead of a handle",
                class_name,
                other.kind()
            ))),
        }
    }

    fn call_static(
        &self,
        class_name: &str,
        method: &str,
        args: Vec<RemoteValue>,
    ) -> Result<RemoteValue> {
        self.call(BridgeCall::CallStatic(CallStaticParams {
            class_name: class_name.to_string(),
            method: method.to_string(),
            args,
        }))
    }
}
