//! Bridge wire protocol types and framing.
//!
//! Each message starts with a 4-byte big-endian length prefix and a UTF-8
//! JSON-RPC 2.0 header. Binary sections announced by the header follow it
//! (see [`wire`](super::wire)).
//!
//! ```text
//! [u32 BE: len][UTF-8 JSON bytes of len][sections...]
//! ```

use crate::bridge::BridgeCall;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// JSON-RPC 2.0 request carrying one bridge call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
    pub id: Option<serde_json::Value>,
    /// Lengths of the binary sections following the header
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<u64>,
}

impl BridgeRequest {
    /// Create a new JSON-RPC 2.0 request.
    pub fn new(method: impl Into<String>, params: serde_json::Value, id: u64) -> Self {
        Self {
            jsonrpc: BridgeConfig::JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: Some(params),
            id: Some(serde_json::Value::Number(id.into())),
            sections: Vec::new(),
        }
    }
}

/// Borrowed request header, serialized without an intermediate `Value`.
#[derive(Serialize)]
struct OutgoingRequest<'a, P> {
    jsonrpc: &'static str,
    method: &'static str,
    params: &'a P,
    id: u64,
    #[serde(skip_serializing_if = "no_sections")]
    sections: &'a [u64],
}

fn no_sections(sections: &&[u64]) -> bool {
    sections.is_empty()
}

/// Serialize the JSON header for `call`, announcing `sections`.
pub fn encode_request<V: Serialize>(
    call: &BridgeCall<V>,
    id: u64,
    sections: &[u64],
) -> Result<Vec<u8>> {
    fn encode<P: Serialize>(
        method: &'static str,
        params: &P,
        id: u64,
        sections: &[u64],
    ) -> Result<Vec<u8>> {
        let mut header = Vec::new();
        let request = OutgoingRequest {
            jsonrpc: BridgeConfig::JSONRPC_VERSION,
            method,
            params,
            id,
            sections,
        };
        serde_json::to_writer(&mut header, &request)?;
        Ok(header)
    }

    let method = call.method_name();
    match call {
        BridgeCall::Invoke(p) => encode(method, p, id, sections),
        BridgeCall::Construct(p) => encode(method, p, id, sections),
        BridgeCall::CallStatic(p) => encode(method, p, id, sections),
    }
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<u64>,
}

impl BridgeResponse {
    /// Create a success response.
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: BridgeConfig::JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
            sections: Vec::new(),
        }
    }

    /// Create an error response.
    pub fn error(id: Option<serde_json::Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: BridgeConfig::JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(RpcError {
                code,
                message,
                data: None,
            }),
            id,
            sections: Vec::new(),
        }
    }

    /// Create an error response that preserves the typed error payload.
    pub fn from_error(id: Option<serde_json::Value>, err: &BridgeError) -> Self {
        let mut response = Self::error(id, err.to_rpc_error_code(), err.to_string());
        if let Some(error) = response.error.as_mut() {
            error.data = err.to_rpc_error_data();
        }
        response
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    pub fn into_bridge_error(self) -> BridgeError {
        BridgeError::from_rpc_error(self.code, &self.message, self.data.as_ref())
    }
}

/// Read a length-prefixed frame from an async reader.
///
/// Frame format: `[4-byte BE u32 length][payload bytes]`
///
/// Returns `None` on clean EOF (peer closed connection).
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;

    if len > BridgeConfig::MAX_HEADER_SIZE {
        return Err(header_too_large(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    Ok(Some(payload))
}

/// Read the binary sections announced by a header, in order.
///
/// Each section is read into its own buffer with no size cap.
pub async fn read_sections<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    lengths: &[u64],
) -> Result<Vec<Bytes>> {
    let mut sections = Vec::with_capacity(lengths.len());
    for &len in lengths {
        let size = usize::try_from(len).map_err(|_| section_too_large(len))?;
        let mut buf = Vec::new();
        buf.try_reserve_exact(size).map_err(|_| section_too_large(len))?;

        (&mut *reader).take(len).read_to_end(&mut buf).await?;
        if buf.len() != size {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("Binary section ended after {} of {} bytes", buf.len(), len),
            )
            .into());
        }
        sections.push(Bytes::from(buf));
    }
    Ok(sections)
}

/// Write a length-prefixed frame to an async writer.
///
/// Frame format: `[4-byte BE u32 length][payload bytes]`
pub async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    write_message(writer, payload, &[]).await
}

/// Write a header frame followed by its binary sections.
pub async fn write_message<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    header: &[u8],
    sections: &[Bytes],
) -> Result<()> {
    let len = u32::try_from(header.len())
        .ok()
        .filter(|len| (*len as usize) <= BridgeConfig::MAX_HEADER_SIZE)
        .ok_or_else(|| header_too_large(header.len()))?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(header).await?;
    for section in sections {
        writer.write_all(section).await?;
    }
    writer.flush().await?;
    Ok(())
}

fn header_too_large(len: usize) -> BridgeError {
    BridgeError::Validation {
        field: "frame".to_string(),
        message: format!(
            "Bridge message header size {} exceeds maximum {}",
            len,
            BridgeConfig::MAX_HEADER_SIZE
        ),
    }
}

fn section_too_large(len: u64) -> BridgeError {
    BridgeError::Validation {
        field: "sections".to_string(),
        message: format!("Cannot allocate a binary section of {} bytes", len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ConstructParams;

    #[test]
    fn test_encoded_request_parses_as_bridge_request() {
        let call: BridgeCall = BridgeCall::Construct(ConstructParams {
            class_name: "java.util.HashMap".to_string(),
            args: vec![],
        });
        let header = encode_request(&call, 1, &[]).unwrap();
        let parsed: BridgeRequest = serde_json::from_slice(&header).unwrap();

        assert_eq!(parsed.jsonrpc, "2.0");
        assert_eq!(parsed.method, "construct");
        assert_eq!(parsed.id, Some(serde_json::Value::Number(1.into())));
        assert!(parsed.sections.is_empty());
        assert_eq!(parsed.params, Some(call.to_params().unwrap()));

        let header = encode_request(&call, 2, &[5, 0]).unwrap();
        let parsed: BridgeRequest = serde_json::from_slice(&header).unwrap();
        assert_eq!(parsed.sections, vec![5, 0]);
    }

    #[test]
    fn test_response_success_serialization() {
        let resp = BridgeResponse::success(
            Some(serde_json::Value::Number(1.into())),
            serde_json::json!({"type": "int", "value": 3}),
        );
        let json = serde_json::to_string(&resp).unwrap();

        assert!(json.contains("\"result\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_typed_error_response_carries_data() {
        let err = BridgeError::RemoteConstruction {
            class_name: "not.a.real.Class".to_string(),
            message: "java.lang.ClassNotFoundException: not.a.real.Class".to_string(),
        };
        let resp = BridgeResponse::from_error(None, &err);
        let rpc_error = resp.error.unwrap();

        assert_eq!(rpc_error.code, -32010);
        match rpc_error.into_bridge_error() {
            BridgeError::RemoteConstruction { class_name, .. } => {
                assert_eq!(class_name, "not.a.real.Class")
            }
            other => panic!("Expected RemoteConstruction, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_frames_are_read_back_in_order() {
        let first = serde_json::to_vec(&BridgeRequest::new("construct", serde_json::json!({}), 1)).unwrap();
        let second = serde_json::to_vec(&BridgeRequest::new("invoke", serde_json::json!({}), 2)).unwrap();
        let mut wire = Vec::new();
        write_frame(&mut wire, &first).await.unwrap();
        write_frame(&mut wire, &second).await.unwrap();
        assert_eq!(&wire[..4], &(first.len() as u32).to_be_bytes());

        let mut cursor = std::io::Cursor::new(wire);
        assert_eq!(read_frame(&mut cursor).await.unwrap(), Some(first));
        assert_eq!(read_frame(&mut cursor).await.unwrap(), Some(second));
        assert_eq!(read_frame(&mut cursor).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sections_follow_the_header() {
        let header = br#"{"jsonrpc":"2.0","id":1,"sections":[3,0,5]}"#;
        let sections = vec![
            Bytes::from_static(b"abc"),
            Bytes::new(),
            Bytes::from_static(b"defgh"),
        ];
        let mut wire = Vec::new();
        write_message(&mut wire, header, &sections).await.unwrap();
        write_frame(&mut wire, b"{}").await.unwrap();

        let mut cursor = std::io::Cursor::new(wire);
        let read_header = read_frame(&mut cursor).await.unwrap().unwrap();
        let response: BridgeResponse = serde_json::from_slice(&read_header).unwrap();
        let read_back = read_sections(&mut cursor, &response.sections).await.unwrap();
        assert_eq!(read_back, sections);
        assert_eq!(read_frame(&mut cursor).await.unwrap(), Some(b"{}".to_vec()));
    }

    #[tokio::test]
    async fn test_sections_are_not_capped_by_header_limit() {
        let big = Bytes::from(vec![9u8; BridgeConfig::MAX_HEADER_SIZE + 1]);
        let mut wire = Vec::new();
        write_message(&mut wire, b"{}", std::slice::from_ref(&big))
            .await
            .unwrap();

        let mut cursor = std::io::Cursor::new(wire);
        read_frame(&mut cursor).await.unwrap().unwrap();
        let read_back = read_sections(&mut cursor, &[big.len() as u64]).await.unwrap();
        assert_eq!(read_back[0].len(), big.len());
    }

    #[tokio::test]
    async fn test_short_section_is_an_error() {
        let mut cursor = std::io::Cursor::new(b"abc".to_vec());
        assert!(read_sections(&mut cursor, &[10]).await.is_err());
    }

    #[tokio::test]
    async fn test_truncated_payload_is_an_error() {
        let mut wire = 16u32.to_be_bytes().to_vec();
        wire.extend_from_slice(b"{\"jsonrpc\"");

        let mut cursor = std::io::Cursor::new(wire);
        assert!(read_frame(&mut cursor).await.is_err());
    }

    #[tokio::test]
    async fn test_oversized_length_prefix_is_rejected() {
        let declared = u32::try_from(BridgeConfig::MAX_HEADER_SIZE + 1).unwrap();
        let mut wire = declared.to_be_bytes().to_vec();
        wire.extend_from_slice(&[0u8; 8]);

        let mut cursor = std::io::Cursor::new(wire);
        match read_frame(&mut cursor).await {
            Err(BridgeError::Validation { field, .. }) => assert_eq!(field, "frame"),
            other => panic!("Expected frame validation error, got: {:?}", other),
        }
    }
}
