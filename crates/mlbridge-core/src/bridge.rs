//! The bridge call protocol consumed by the proxy.
//!
//! A `Bridge` is anything that can reach a remote object runtime: the TCP
//! transport, the in-process reference runtime, or a test double. All three
//! calls block until the remote side answers.

use crate::error::{BridgeError, Result};
use crate::handle::RemoteHandle;
use crate::value::RemoteValue;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Synchronous access to a remote object runtime.
pub trait Bridge: Send + Sync {
    /// Call `method` on the object behind `target`.
    fn invoke(&self, target: &RemoteHandle, method: &str, args: Vec<RemoteValue>)
        -> Result<RemoteValue>;

    /// Instantiate `class_name` with the given constructor arguments.
    fn construct(&self, class_name: &str, args: Vec<RemoteValue>) -> Result<RemoteHandle>;

    /// Call a class-level method.
    fn call_static(
        &self,
        class_name: &str,
        method: &str,
        args: Vec<RemoteValue>,
    ) -> Result<RemoteValue>;
}

/// JSON-RPC method names of the three bridge calls.
pub mod methods {
    pub const INVOKE: &str = "invoke";
    pub const CONSTRUCT: &str = "construct";
    pub const CALL_STATIC: &str = "call_static";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeParams<V = RemoteValue> {
    pub target: RemoteHandle,
    pub method: String,
    #[serde(default = "Vec::new")]
    pub args: Vec<V>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructParams<V = RemoteValue> {
    pub class_name: String,
    #[serde(default = "Vec::new")]
    pub args: Vec<V>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallStaticParams<V = RemoteValue> {
    pub class_name: String,
    pub method: String,
    #[serde(default = "Vec::new")]
    pub args: Vec<V>,
}

/// One bridge request, as carried by the JSON-RPC transports.
///
/// `V` is the argument representation: [`RemoteValue`] everywhere except on
/// the TCP wire, where byte payloads are split out (see
/// [`WireValue`](crate::transport::wire::WireValue)).
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCall<V = RemoteValue> {
    Invoke(InvokeParams<V>),
    Construct(ConstructParams<V>),
    CallStatic(CallStaticParams<V>),
}

impl<V> BridgeCall<V> {
    /// JSON-RPC method name for this call.
    pub fn method_name(&self) -> &'static str {
        match self {
            BridgeCall::Invoke(_) => methods::INVOKE,
            BridgeCall::Construct(_) => methods::CONSTRUCT,
            BridgeCall::CallStatic(_) => methods::CALL_STATIC,
        }
    }

    /// Convert every argument, keeping the call's shape.
    pub fn map_args<W>(self, mut convert: impl FnMut(V) -> Result<W>) -> Result<BridgeCall<W>> {
        let mut convert_all =
            |args: Vec<V>| args.into_iter().map(&mut convert).collect::<Result<Vec<W>>>();
        let call = match self {
            BridgeCall::Invoke(p) => BridgeCall::Invoke(InvokeParams {
                target: p.target,
                method: p.method,
                args: convert_all(p.args)?,
            }),
            BridgeCall::Construct(p) => BridgeCall::Construct(ConstructParams {
                class_name: p.class_name,
                args: convert_all(p.args)?,
            }),
            BridgeCall::CallStatic(p) => BridgeCall::CallStatic(CallStaticParams {
                class_name: p.class_name,
                method: p.method,
                args: convert_all(p.args)?,
            }),
        };
        Ok(call)
    }
}

impl<V: Serialize> BridgeCall<V> {
    /// Serialize the call parameters.
    pub fn to_params(&self) -> Result<serde_json::Value> {
        let params = match self {
            BridgeCall::Invoke(p) => serde_json::to_value(p)?,
            BridgeCall::Construct(p) => serde_json::to_value(p)?,
            BridgeCall::CallStatic(p) => serde_json::to_value(p)?,
        };
        Ok(params)
    }
}

impl<V: DeserializeOwned> BridgeCall<V> {
    /// Parse a call from a JSON-RPC method name and params object.
    pub fn from_rpc(method: &str, params: serde_json::Value) -> Result<Self> {
        let invalid = |e: serde_json::Error| BridgeError::Validation {
            field: "params".to_string(),
            message: format!("Invalid params for {}: {}", method, e),
        };

        match method {
            methods::INVOKE => serde_json::from_value(params)
                .map(BridgeCall::Invoke)
                .map_err(invalid),
            methods::CONSTRUCT => serde_json::from_value(params)
                .map(BridgeCall::Construct)
                .map_err(invalid),
            methods::CALL_STATIC => serde_json::from_value(params)
                .map(BridgeCall::CallStatic)
                .map_err(invalid),
            other => Err(BridgeError::Validation {
                field: "method".to_string(),
                message: format!("Unknown bridge method: {}", other),
            }),
        }
    }
}

impl BridgeCall {
    /// Run the call against a bridge. Construction results come back as a handle value.
    pub fn execute(self, bridge: &dyn Bridge) -> Result<RemoteValue> {
        match self {
            BridgeCall::Invoke(p) => bridge.invoke(&p.target, &p.method, p.args),
            BridgeCall::Construct(p) => bridge
                .construct(&p.class_name, p.args)
                .map(RemoteValue::Handle),
            BridgeCall::CallStatic(p) => bridge.call_static(&p.class_name, &p.method, p.args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_round_trips_through_rpc_params() {
        let call = BridgeCall::Invoke(InvokeParams {
            target: RemoteHandle::new("o7"),
            method: "setWidth".to_string(),
            args: vec![RemoteValue::Int(224)],
        });
        let params = call.to_params().unwrap();
        let parsed: BridgeCall = BridgeCall::from_rpc(call.method_name(), params).unwrap();
        assert_eq!(parsed, call);
    }

    #[test]
    fn test_map_args_keeps_target_and_method() {
        let call = BridgeCall::Invoke(InvokeParams {
            target: RemoteHandle::new("o7"),
            method: "setWidth".to_string(),
            args: vec![RemoteValue::Int(224), RemoteValue::Int(3)],
        });
        let mapped = call
            .map_args(|v| v.into_typed::<i32>().map(i64::from))
            .unwrap();
        match mapped {
            BridgeCall::Invoke(p) => {
                assert_eq!(p.target.id(), "o7");
                assert_eq!(p.method, "setWidth");
                assert_eq!(p.args, vec![224i64, 3]);
            }
            other => panic!("Expected Invoke, got: {:?}", other),
        }

        let call = BridgeCall::Construct(ConstructParams {
            class_name: "java.util.HashMap".to_string(),
            args: vec![RemoteValue::from("x")],
        });
        assert!(call.map_args(|v| v.into_typed::<i32>()).is_err());
    }

    #[test]
    fn test_missing_args_default_to_empty() {
        let params = serde_json::json!({"class_name": "java.util.HashMap"});
        let call: BridgeCall = BridgeCall::from_rpc("construct", params).unwrap();
        match call {
            BridgeCall::Construct(p) => assert!(p.args.is_empty()),
            other => panic!("Expected Construct, got: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let err = BridgeCall::<RemoteValue>::from_rpc("dispose", serde_json::json!({})).unwrap_err();
        assert!(matches!(err, BridgeError::Validation { .. }));
    }
}
