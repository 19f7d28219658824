//! TCP bridge server.
//!
//! Hosts a remote object runtime behind the framed JSON-RPC protocol. Each
//! connection is handled in its own spawned task; requests on one connection
//! are answered in order. Connections beyond the limit get one JSON-RPC error
//! frame and are closed.

use super::protocol::{
    read_frame, read_sections, write_frame, write_message, BridgeRequest, BridgeResponse,
};
use super::wire::{attach_call, section_lengths, WireValue};
use crate::bridge::BridgeCall;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::value::RemoteValue;
use bytes::Bytes;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch, Semaphore};
use tracing::{debug, error, info, warn};

/// JSON-RPC error code sent to connections refused at capacity.
pub const SERVER_BUSY: i32 = -32000;

/// Handle to a running bridge server. Dropping shuts down the server.
pub struct BridgeServerHandle {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    conn_shutdown_tx: watch::Sender<bool>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl BridgeServerHandle {
    /// Get the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shut down the server gracefully.
    ///
    /// Stops accepting new connections and signals all active connection
    /// handlers to close.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.conn_shutdown_tx.send(true);
    }
}

impl Drop for BridgeServerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

/// Executes bridge calls on behalf of connected clients.
#[async_trait::async_trait]
pub trait BridgeDispatch: Send + Sync + 'static {
    async fn dispatch(&self, call: BridgeCall) -> Result<RemoteValue>;
}

/// Bridge server that listens for client connections.
pub struct BridgeServer;

/// State shared by the accept loop and its connection tasks.
struct Listener<D> {
    dispatch: Arc<D>,
    slots: Arc<Semaphore>,
    max_connections: usize,
    conn_shutdown_rx: watch::Receiver<bool>,
}

impl BridgeServer {
    /// Start the server on `bind_addr` (use port 0 for an OS-assigned port).
    ///
    /// The server runs in background tokio tasks until the returned handle is
    /// shut down or dropped.
    pub async fn start<D: BridgeDispatch>(
        dispatch: Arc<D>,
        bind_addr: SocketAddr,
    ) -> Result<BridgeServerHandle> {
        Self::start_with_limit(dispatch, bind_addr, BridgeConfig::MAX_CONNECTIONS).await
    }

    /// Start the server, serving at most `max_connections` clients at once.
    pub async fn start_with_limit<D: BridgeDispatch>(
        dispatch: Arc<D>,
        bind_addr: SocketAddr,
        max_connections: usize,
    ) -> Result<BridgeServerHandle> {
        let listener = TcpListener::bind(bind_addr).await?;
        let addr = listener.local_addr()?;

        info!(
            "Bridge server listening on {} (max {} connections)",
            addr, max_connections
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (conn_shutdown_tx, conn_shutdown_rx) = watch::channel(false);
        let state = Listener {
            dispatch,
            slots: Arc::new(Semaphore::new(max_connections)),
            max_connections,
            conn_shutdown_rx,
        };

        let task_handle = tokio::spawn(state.run(listener, shutdown_rx));

        Ok(BridgeServerHandle {
            addr,
            shutdown_tx: Some(shutdown_tx),
            conn_shutdown_tx,
            task_handle: Some(task_handle),
        })
    }
}

impl<D: BridgeDispatch> Listener<D> {
    async fn run(self, listener: TcpListener, mut shutdown_rx: oneshot::Receiver<()>) {
        loop {
            let accepted = tokio::select! {
                _ = &mut shutdown_rx => break,
                accepted = listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, peer_addr)) => self.admit(stream, peer_addr),
                Err(e) => error!("Bridge accept error: {}", e),
            }
        }
        info!("Bridge server shutting down");
    }

    fn admit(&self, stream: TcpStream, peer_addr: SocketAddr) {
        let Ok(permit) = self.slots.clone().try_acquire_owned() else {
            warn!(
                "Rejecting bridge connection from {}: at max capacity ({})",
                peer_addr, self.max_connections
            );
            tokio::spawn(reject(stream, self.max_connections));
            return;
        };

        let dispatch = self.dispatch.clone();
        let mut shutdown = self.conn_shutdown_rx.clone();
        tokio::spawn(async move {
            debug!("Bridge connection from {}", peer_addr);
            if let Err(e) = serve(stream, &*dispatch, &mut shutdown).await {
                debug!("Bridge connection {} ended: {}", peer_addr, e);
            }
            drop(permit);
        });
    }
}

/// Answer a connection refused at capacity with an error frame, then close it.
async fn reject(mut stream: TcpStream, max_connections: usize) {
    let response = BridgeResponse::error(
        None,
        SERVER_BUSY,
        format!(
            "Bridge host at max capacity ({} connections)",
            max_connections
        ),
    );
    let sent = match serde_json::to_vec(&response) {
        Ok(bytes) => write_frame(&mut stream, &bytes).await,
        Err(e) => Err(e.into()),
    };
    if let Err(e) = sent {
        debug!("Could not notify refused bridge connection: {}", e);
        return;
    }
    let _ = stream.shutdown().await;

    // Closing with unread input resets the connection, which can discard the
    // reply before the peer reads it.
    let mut sink = [0u8; 4096];
    let _ = tokio::time::timeout(BridgeConfig::REJECT_LINGER, async {
        while matches!(stream.read(&mut sink).await, Ok(n) if n > 0) {}
    })
    .await;
}

async fn serve<D: BridgeDispatch>(
    mut stream: TcpStream,
    dispatch: &D,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<()> {
    let (mut reader, mut writer) = stream.split();

    loop {
        let header = tokio::select! {
            result = read_frame(&mut reader) => match result? {
                Some(header) => header,
                None => return Ok(()),
            },
            _ = shutdown_rx.changed() => return Ok(()),
        };

        let (response, sections) = match serde_json::from_slice::<BridgeRequest>(&header) {
            Ok(request) => {
                let sections = read_sections(&mut reader, &request.sections).await?;
                process_message(request, sections, dispatch).await
            }
            Err(e) => (
                BridgeResponse::error(None, -32700, format!("Parse error: {}", e)),
                Vec::new(),
            ),
        };

        let header = serde_json::to_vec(&response)?;
        write_message(&mut writer, &header, &sections).await?;
    }
}

/// Validate and dispatch one JSON-RPC request.
///
/// Shared by every JSON-RPC surface that fronts a runtime. Byte payloads must
/// be inline, and byte results are returned inline.
pub async fn process_request<D: BridgeDispatch + ?Sized>(
    request: BridgeRequest,
    dispatch: &D,
) -> BridgeResponse {
    let id = request.id.clone();
    match execute(request, Vec::new(), dispatch).await {
        Ok(value) => encode_result(id, &value),
        Err(response) => response,
    }
}

/// Dispatch one TCP request whose byte payloads arrived as binary sections,
/// returning the response header and the sections to send after it.
pub(crate) async fn process_message<D: BridgeDispatch + ?Sized>(
    request: BridgeRequest,
    sections: Vec<Bytes>,
    dispatch: &D,
) -> (BridgeResponse, Vec<Bytes>) {
    let id = request.id.clone();
    match execute(request, sections, dispatch).await {
        Ok(value) => {
            let mut out = Vec::new();
            let wire = WireValue::detach(value, &mut out);
            let mut response = encode_result(id, &wire);
            response.sections = section_lengths(&out);
            (response, out)
        }
        Err(response) => (response, Vec::new()),
    }
}

async fn execute<D: BridgeDispatch + ?Sized>(
    request: BridgeRequest,
    sections: Vec<Bytes>,
    dispatch: &D,
) -> std::result::Result<RemoteValue, BridgeResponse> {
    if request.jsonrpc != BridgeConfig::JSONRPC_VERSION {
        return Err(BridgeResponse::error(
            request.id,
            -32600,
            "Invalid Request: expected jsonrpc 2.0".to_string(),
        ));
    }

    let params = request
        .params
        .unwrap_or(serde_json::Value::Object(Default::default()));

    let call = BridgeCall::<WireValue>::from_rpc(&request.method, params)
        .and_then(|call| attach_call(call, sections));
    let call = match call {
        Ok(call) => call,
        Err(BridgeError::Validation { field, message }) => {
            let code = if field == "method" { -32601 } else { -32602 };
            return Err(BridgeResponse::error(request.id, code, message));
        }
        Err(e) => return Err(BridgeResponse::error(request.id, -32602, e.to_string())),
    };

    dispatch.dispatch(call).await.map_err(|e| {
        debug!("Bridge call {} failed: {}", request.method, e);
        BridgeResponse::from_error(request.id, &e)
    })
}

fn encode_result<T: Serialize>(id: Option<serde_json::Value>, value: &T) -> BridgeResponse {
    match serde_json::to_value(value) {
        Ok(result) => BridgeResponse::success(id, result),
        Err(e) => BridgeResponse::error(id, -32603, e.to_string()),
    }
}
