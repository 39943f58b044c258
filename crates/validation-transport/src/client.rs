//! Synchronous client for the RPC driving protocol.
//!
//! ## Usage
//!
//! ```ignore
//! let client = RpcClient::new("http://127.0.0.1:8378", Duration::from_secs(30));
//! client.new_vm(Some("MessageApplicationValueTransfer"))?;
//! let root = client.root()?;
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use chain_validation_types::{
    Actor, Address, BlockMessagesInfo, ChainEpoch, Cid, Message, Randomness, SignedMessage,
    TokenAmount, ValidationConfig,
};

use crate::error::RpcError;
use crate::protocol::*;

/// Client for one remote VM service.
///
/// Cloning shares the underlying agent and request-id counter. Every call
/// opens its own connection and closes it before returning, on success and
/// on failure alike, so nothing stays pooled between tests.
#[derive(Clone)]
pub struct RpcClient {
    url: String,
    agent: ureq::Agent,
    timeout: Duration,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    /// Create a client for `endpoint` (`http://host:port`).
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        let endpoint = endpoint.trim_end_matches('/');
        Self {
            url: format!("{}{}", endpoint, RPC_PATH),
            agent: Self::build_agent(timeout),
            timeout,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Create a client from host and port.
    pub fn from_host_port(host: &str, port: u16, timeout: Duration) -> Self {
        Self::new(&format!("http://{}:{}", host, port), timeout)
    }

    fn build_agent(timeout: Duration) -> ureq::Agent {
        ureq::AgentBuilder::new()
            .timeout(timeout)
            .timeout_connect(timeout)
            .build()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue one call and decode its result.
    pub fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<R, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let params = serde_json::to_value(params).map_err(|e| RpcError::Decode {
            method: method.to_string(),
            message: format!("failed to encode params: {}", e),
        })?;
        let request = RpcRequest {
            id,
            method: method.to_string(),
            params,
        };
        trace!(id, method, "rpc request");

        let response = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .set("Connection", "close")
            .send_json(&request)
            .map_err(|e| RpcError::from_ureq(&self.url, method, e))?;

        let reply: RpcResponse = response.into_json().map_err(|e| RpcError::Decode {
            method: method.to_string(),
            message: e.to_string(),
        })?;

        if reply.id != id {
            return Err(RpcError::Decode {
                method: method.to_string(),
                message: format!("reply id {} does not match request id {}", reply.id, id),
            });
        }
        if let Some(fault) = reply.error {
            debug!(method, %fault, "rpc fault");
            return Err(RpcError::from_fault(method, fault));
        }

        let result = reply.result.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(result).map_err(|e| RpcError::Decode {
            method: method.to_string(),
            message: e.to_string(),
        })
    }

    // ------------------------------------------------------------------
    // VMWrapper service
    // ------------------------------------------------------------------

    /// Replace the server's current VM with a fresh one.
    pub fn new_vm(&self, test_name: Option<&str>) -> Result<(), RpcError> {
        let params = NewVmParams {
            test_name: test_name.map(str::to_string),
        };
        let _: Empty = self.call(methods::NEW_VM, &params)?;
        Ok(())
    }

    pub fn root(&self) -> Result<Cid, RpcError> {
        let reply: RootReply = self.call(methods::ROOT, &Empty {})?;
        Ok(reply.root)
    }

    pub fn store_get(&self, cid: &Cid) -> Result<Vec<u8>, RpcError> {
        let reply: StoreGetReply =
            self.call(methods::STORE_GET, &StoreGetParams { cid: cid.clone() })?;
        Ok(reply.data)
    }

    pub fn store_put(&self, data: &[u8]) -> Result<Cid, RpcError> {
        let reply: StorePutReply = self.call(
            methods::STORE_PUT,
            &StorePutParams {
                data: data.to_vec(),
            },
        )?;
        Ok(reply.cid)
    }

    pub fn actor(&self, address: &Address) -> Result<Option<Actor>, RpcError> {
        let reply: ActorReply = self.call(
            methods::ACTOR,
            &ActorParams {
                address: address.clone(),
            },
        )?;
        Ok(reply.actor)
    }

    pub fn set_actor_state(
        &self,
        address: &Address,
        balance: &TokenAmount,
        head: &Cid,
    ) -> Result<Actor, RpcError> {
        let reply: SetActorStateReply = self.call(
            methods::SET_ACTOR_STATE,
            &SetActorStateParams {
                address: address.clone(),
                balance: balance.clone(),
                head: head.clone(),
            },
        )?;
        Ok(reply.actor)
    }

    pub fn create_actor(
        &self,
        code: &Cid,
        address: &Address,
        balance: &TokenAmount,
        head: &Cid,
    ) -> Result<CreateActorReply, RpcError> {
        self.call(
            methods::CREATE_ACTOR,
            &CreateActorParams {
                code: code.clone(),
                address: address.clone(),
                balance: balance.clone(),
                head: head.clone(),
            },
        )
    }

    pub fn apply_message(
        &self,
        epoch: ChainEpoch,
        miner: &Address,
        message: &Message,
    ) -> Result<ApplyMessageReply, RpcError> {
        self.call(
            methods::APPLY_MESSAGE,
            &ApplyMessageParams {
                epoch,
                miner: miner.clone(),
                message: message.clone(),
            },
        )
    }

    pub fn apply_signed_message(
        &self,
        epoch: ChainEpoch,
        miner: &Address,
        message: &SignedMessage,
    ) -> Result<ApplyMessageReply, RpcError> {
        self.call(
            methods::APPLY_SIGNED_MESSAGE,
            &ApplySignedMessageParams {
                epoch,
                miner: miner.clone(),
                message: message.clone(),
            },
        )
    }

    pub fn apply_tip_set_messages(
        &self,
        epoch: ChainEpoch,
        blocks: &[BlockMessagesInfo],
        randomness: &Randomness,
    ) -> Result<ApplyTipSetReply, RpcError> {
        self.call(
            methods::APPLY_TIP_SET_MESSAGES,
            &ApplyTipSetParams {
                epoch,
                blocks: blocks.to_vec(),
                randomness: randomness.clone(),
            },
        )
    }

    // ------------------------------------------------------------------
    // Config service
    // ------------------------------------------------------------------

    /// Fetch every toggle of the config service.
    pub fn validation_config(&self) -> Result<ValidationConfig, RpcError> {
        Ok(ValidationConfig {
            check_gas: self.call(methods::CONFIG_VALIDATE_GAS, &Empty {})?,
            check_exit_code: self.call(methods::CONFIG_VALIDATE_EXIT_CODE, &Empty {})?,
            check_return_value: self.call(methods::CONFIG_VALIDATE_RETURN_VALUE, &Empty {})?,
            check_state_root: self.call(methods::CONFIG_VALIDATE_STATE_ROOT, &Empty {})?,
            test_suites: self.call(methods::CONFIG_TEST_SUITES, &Empty {})?,
        })
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
