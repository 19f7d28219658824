//! Byte payloads on the TCP wire.
//!
//! A TCP message is a JSON header frame followed by zero or more raw binary
//! sections. The header lists the section lengths in `sections`, and each byte
//! payload inside it is replaced by `{"section": <index>}`:
//!
//! ```text
//! [u32 BE: header len][header JSON][section 0 bytes][section 1 bytes]...
//! ```
//!
//! Section bytes are written straight from the caller's `Bytes` and read into
//! one buffer each, so a payload is copied once per direction whatever its
//! size. JSON-only peers may still send bytes inline as hex.

use crate::bridge::BridgeCall;
use crate::error::{BridgeError, Result};
use crate::handle::RemoteHandle;
use crate::value::RemoteValue;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `RemoteValue` as carried in a TCP message header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum WireValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(#[serde(with = "crate::value::float_text")] f64),
    String(String),
    Bytes(WireBytes),
    Array(Vec<WireValue>),
    Map(BTreeMap<String, WireValue>),
    Handle(RemoteHandle),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireBytes {
    /// Index into the message's binary sections
    Section { section: usize },
    Inline(#[serde(with = "crate::value::hex_bytes")] Bytes),
}

impl WireValue {
    /// Move every byte payload of `value` into `sections`.
    pub fn detach(value: RemoteValue, sections: &mut Vec<Bytes>) -> Self {
        match value {
            RemoteValue::Null => WireValue::Null,
            RemoteValue::Bool(v) => WireValue::Bool(v),
            RemoteValue::Int(v) => WireValue::Int(v),
            RemoteValue::Long(v) => WireValue::Long(v),
            RemoteValue::Double(v) => WireValue::Double(v),
            RemoteValue::String(v) => WireValue::String(v),
            RemoteValue::Bytes(bytes) => {
                sections.push(bytes);
                WireValue::Bytes(WireBytes::Section {
                    section: sections.len() - 1,
                })
            }
            RemoteValue::Array(items) => WireValue::Array(
                items
                    .into_iter()
                    .map(|item| Self::detach(item, sections))
                    .collect(),
            ),
            RemoteValue::Map(entries) => WireValue::Map(
                entries
                    .into_iter()
                    .map(|(key, item)| (key, Self::detach(item, sections)))
                    .collect(),
            ),
            RemoteValue::Handle(handle) => WireValue::Handle(handle),
        }
    }

    /// Put byte payloads back. Each section may be referenced once.
    pub fn attach(self, sections: &mut [Option<Bytes>]) -> Result<RemoteValue> {
        let value = match self {
            WireValue::Null => RemoteValue::Null,
            WireValue::Bool(v) => RemoteValue::Bool(v),
            WireValue::Int(v) => RemoteValue::Int(v),
            WireValue::Long(v) => RemoteValue::Long(v),
            WireValue::Double(v) => RemoteValue::Double(v),
            WireValue::String(v) => RemoteValue::String(v),
            WireValue::Bytes(WireBytes::Inline(bytes)) => RemoteValue::Bytes(bytes),
            WireValue::Bytes(WireBytes::Section { section }) => sections
                .get_mut(section)
                .and_then(Option::take)
                .map(RemoteValue::Bytes)
                .ok_or_else(|| BridgeError::Validation {
                    field: "sections".to_string(),
                    message: format!("Binary section {} is missing or already used", section),
                })?,
            WireValue::Array(items) => RemoteValue::Array(
                items
                    .into_iter()
                    .map(|item| item.attach(sections))
                    .collect::<Result<Vec<_>>>()?,
            ),
            WireValue::Map(entries) => RemoteValue::Map(
                entries
                    .into_iter()
                    .map(|(key, item)| item.attach(sections).map(|item| (key, item)))
                    .collect::<Result<BTreeMap<_, _>>>()?,
            ),
            WireValue::Handle(handle) => RemoteValue::Handle(handle),
        };
        Ok(value)
    }
}

/// Split a call into its header form and the byte payloads it carries.
pub fn detach_call(call: BridgeCall) -> Result<(BridgeCall<WireValue>, Vec<Bytes>)> {
    let mut sections = Vec::new();
    let call = call.map_args(|arg| Ok(WireValue::detach(arg, &mut sections)))?;
    Ok((call, sections))
}

/// Rebuild a call from its header form and the sections that followed it.
pub fn attach_call(call: BridgeCall<WireValue>, sections: Vec<Bytes>) -> Result<BridgeCall> {
    let mut slots = into_slots(sections);
    call.map_args(|arg| arg.attach(&mut slots))
}

/// Rebuild a result value from a response header and its sections.
pub fn attach_value(value: WireValue, sections: Vec<Bytes>) -> Result<RemoteValue> {
    value.attach(&mut into_slots(sections))
}

/// Lengths announced in a message header.
pub fn section_lengths(sections: &[Bytes]) -> Vec<u64> {
    sections.iter().map(|section| section.len() as u64).collect()
}

fn into_slots(sections: Vec<Bytes>) -> Vec<Option<Bytes>> {
    sections.into_iter().map(Some).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::InvokeParams;

    #[test]
    fn test_bytes_leave_the_header() {
        let payload = Bytes::from(vec![7u8; 4096]);
        let value = RemoteValue::Array(vec![
            RemoteValue::from("model"),
            RemoteValue::Bytes(payload.clone()),
        ]);

        let mut sections = Vec::new();
        let wire = WireValue::detach(value.clone(), &mut sections);
        let header = serde_json::to_string(&wire).unwrap();
        assert!(header.len() < 100, "{}", header);
        assert!(header.contains(r#"{"section":0}"#));
        assert_eq!(section_lengths(&sections), vec![4096]);

        // Same allocation, not a copy
        assert_eq!(sections[0].as_ptr(), payload.as_ptr());
        assert_eq!(attach_value(wire, sections).unwrap(), value);
    }

    #[test]
    fn test_inline_hex_is_still_accepted() {
        let wire: WireValue =
            serde_json::from_value(serde_json::json!({"type": "bytes", "value": "beef"})).unwrap();
        assert_eq!(
            attach_value(wire, Vec::new()).unwrap(),
            RemoteValue::from(vec![0xbeu8, 0xef])
        );
    }

    #[test]
    fn test_missing_or_reused_section_is_rejected() {
        let wire = WireValue::Bytes(WireBytes::Section { section: 0 });
        assert!(attach_value(wire.clone(), Vec::new()).is_err());

        let twice = WireValue::Array(vec![wire.clone(), wire]);
        assert!(attach_value(twice, vec![Bytes::from_static(b"x")]).is_err());
    }

    #[test]
    fn test_call_round_trip_through_sections() {
        let call = BridgeCall::Invoke(InvokeParams {
            target: RemoteHandle::new("o3"),
            method: "setModelPayload".to_string(),
            args: vec![RemoteValue::from(vec![1u8, 2, 3])],
        });
        let (wire, sections) = detach_call(call.clone()).unwrap();
        assert_eq!(sections.len(), 1);

        let params = wire.to_params().unwrap();
        let parsed = BridgeCall::<WireValue>::from_rpc("invoke", params).unwrap();
        assert_eq!(attach_call(parsed, sections).unwrap(), call);
    }
}
