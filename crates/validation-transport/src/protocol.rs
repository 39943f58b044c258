//! Wire contract for the RPC driving protocol.
//!
//! Every call is one HTTP POST to [`RPC_PATH`] carrying an [`RpcRequest`]
//! and answered with an [`RpcResponse`]. Method names are dotted
//! `Service.Method` strings. The server keeps exactly one current VM; no
//! request carries a session identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

use chain_validation_types::encoding::base64_bytes;
use chain_validation_types::{
    Actor, Address, BlockMessagesInfo, ChainEpoch, Cid, Message, MessageReceipt, Randomness,
    SignedMessage, TokenAmount,
};

/// HTTP path serving the protocol.
pub const RPC_PATH: &str = "/rpc";

pub mod methods {
    pub const NEW_VM: &str = "VMWrapper.NewVM";
    pub const ROOT: &str = "VMWrapper.Root";
    pub const STORE_GET: &str = "VMWrapper.StoreGet";
    pub const STORE_PUT: &str = "VMWrapper.StorePut";
    pub const ACTOR: &str = "VMWrapper.Actor";
    pub const SET_ACTOR_STATE: &str = "VMWrapper.SetActorState";
    pub const CREATE_ACTOR: &str = "VMWrapper.CreateActor";
    pub const APPLY_MESSAGE: &str = "VMWrapper.ApplyMessage";
    pub const APPLY_SIGNED_MESSAGE: &str = "VMWrapper.ApplySignedMessage";
    pub const APPLY_TIP_SET_MESSAGES: &str = "VMWrapper.ApplyTipSetMessages";

    pub const CONFIG_VALIDATE_GAS: &str = "Config.ValidateGas";
    pub const CONFIG_VALIDATE_EXIT_CODE: &str = "Config.ValidateExitCode";
    pub const CONFIG_VALIDATE_RETURN_VALUE: &str = "Config.ValidateReturnValue";
    pub const CONFIG_VALIDATE_STATE_ROOT: &str = "Config.ValidateStateRoot";
    pub const CONFIG_TEST_SUITES: &str = "Config.TestSuites";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcFault>,
}

impl RpcResponse {
    pub fn ok(id: u64, result: serde_json::Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn fault(id: u64, kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(RpcFault {
                kind,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    /// The method name is not served.
    UnknownMethod,
    /// The params did not decode into the method's request shape.
    InvalidParams,
    /// The VM returned an error.
    Backend,
    /// The server failed outside the VM.
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcFault {
    pub kind: FaultKind,
    pub message: String,
}

impl fmt::Display for RpcFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

// ============================================================================
// VMWrapper requests and replies
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVmParams {
    /// Sanitized name of the test instantiating the VM, for server-side logs.
    #[serde(default)]
    pub test_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootReply {
    pub root: Cid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreGetParams {
    pub cid: Cid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreGetReply {
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorePutParams {
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorePutReply {
    pub cid: Cid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorParams {
    pub address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorReply {
    pub actor: Option<Actor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActorStateParams {
    pub address: Address,
    pub balance: TokenAmount,
    pub head: Cid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActorStateReply {
    pub actor: Actor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateActorParams {
    pub code: Cid,
    pub address: Address,
    pub balance: TokenAmount,
    pub head: Cid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateActorReply {
    pub actor: Actor,
    /// ID address assigned to the new actor.
    pub address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyMessageParams {
    pub epoch: ChainEpoch,
    pub miner: Address,
    pub message: Message,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplySignedMessageParams {
    pub epoch: ChainEpoch,
    pub miner: Address,
    pub message: SignedMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyMessageReply {
    pub receipt: MessageReceipt,
    pub penalty: TokenAmount,
    pub reward: TokenAmount,
    pub root: Cid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyTipSetParams {
    pub epoch: ChainEpoch,
    pub blocks: Vec<BlockMessagesInfo>,
    pub randomness: Randomness,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyTipSetReply {
    pub receipts: Vec<MessageReceipt>,
    pub root: Cid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_omits_absent_fields() {
        let ok = serde_json::to_value(RpcResponse::ok(7, serde_json::json!(true))).unwrap();
        assert_eq!(ok, serde_json::json!({"id": 7, "result": true}));

        let fault = serde_json::to_value(RpcResponse::fault(
            8,
            FaultKind::UnknownMethod,
            "no such method",
        ))
        .unwrap();
        assert_eq!(fault["error"]["kind"], "UnknownMethod");
        assert!(fault.get("result").is_none());
    }

    #[test]
    fn test_request_params_default_to_null() {
        let req: RpcRequest =
            serde_json::from_str(r#"{"id": 1, "method": "VMWrapper.Root"}"#).unwrap();
        assert!(req.params.is_null());
    }

    #[test]
    fn test_store_put_carries_base64() {
        let params = StorePutParams {
            data: b"head".to_vec(),
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["data"], "aGVhZA==");
    }
}
