//! Client/server behaviour of the RPC driving protocol against a stub VM.

use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::time::{Duration, Instant};

use chain_validation_transport::protocol::*;
use chain_validation_transport::{RpcBackend, RpcClient, RpcError, RpcServer};
use chain_validation_types::{
    Actor, Address, Cid, ExitCode, MessageReceipt, Randomness, TokenAmount, ValidationConfig,
};

/// Stub VM: a blob store, a root derived from the store, and canned receipts.
#[derive(Default)]
struct StubVm {
    vm_count: usize,
    store: BTreeMap<Cid, Vec<u8>>,
}

impl StubVm {
    fn current_root(&self) -> Cid {
        let keys: Vec<u8> = self
            .store
            .keys()
            .flat_map(|k| k.as_str().as_bytes().to_vec())
            .collect();
        Cid::of_bytes(&keys)
    }
}

impl RpcBackend for StubVm {
    fn new_vm(&mut self, _params: NewVmParams) -> Result<()> {
        self.vm_count += 1;
        self.store.clear();
        Ok(())
    }

    fn root(&mut self) -> Result<Cid> {
        Ok(self.current_root())
    }

    fn store_get(&mut self, cid: &Cid) -> Result<Vec<u8>> {
        self.store
            .get(cid)
            .cloned()
            .ok_or_else(|| anyhow!("block {} not found", cid))
    }

    fn store_put(&mut self, data: &[u8]) -> Result<Cid> {
        let cid = Cid::of_bytes(data);
        self.store.insert(cid.clone(), data.to_vec());
        Ok(cid)
    }

    fn actor(&mut self, _params: &ActorParams) -> Result<Option<Actor>> {
        Ok(None)
    }

    fn set_actor_state(&mut self, params: &SetActorStateParams) -> Result<Actor> {
        Err(anyhow!("actor {} not found", params.address))
    }

    fn create_actor(&mut self, params: &CreateActorParams) -> Result<CreateActorReply> {
        Ok(CreateActorReply {
            actor: Actor {
                code: params.code.clone(),
                head: params.head.clone(),
                call_seq_num: 0,
                balance: params.balance.clone(),
            },
            address: Address::new_id(100),
        })
    }

    fn apply_message(&mut self, params: &ApplyMessageParams) -> Result<ApplyMessageReply> {
        Ok(ApplyMessageReply {
            receipt: MessageReceipt {
                exit_code: ExitCode::SYS_ERR_SENDER_INVALID,
                return_value: vec![],
                gas_used: params.message.params.len() as i64,
            },
            penalty: TokenAmount::from(7),
            reward: TokenAmount::zero(),
            root: self.current_root(),
        })
    }

    fn apply_signed_message(
        &mut self,
        params: &ApplySignedMessageParams,
    ) -> Result<ApplyMessageReply> {
        self.apply_message(&ApplyMessageParams {
            epoch: params.epoch,
            miner: params.miner.clone(),
            message: params.message.message.clone(),
        })
    }

    fn apply_tip_set_messages(&mut self, params: &ApplyTipSetParams) -> Result<ApplyTipSetReply> {
        Ok(ApplyTipSetReply {
            receipts: vec![],
            root: Cid::new(format!("epoch-{}", params.epoch)),
        })
    }
}

fn spawn(config: ValidationConfig) -> (RpcServer, RpcClient) {
    let server = RpcServer::spawn(
        "127.0.0.1:0".parse().unwrap(),
        StubVm::default(),
        config,
    )
    .expect("server should start");
    let client = RpcClient::new(&server.endpoint(), Duration::from_secs(5));
    (server, client)
}

fn transfer() -> chain_validation_types::Message {
    chain_validation_types::Message {
        to: Address::new_id(101),
        from: Address::new_secp256k1(b"unknown"),
        call_seq_num: 0,
        value: TokenAmount::from(50),
        method: 0,
        params: vec![1, 2, 3],
        gas_fee_cap: TokenAmount::from(1),
        gas_premium: TokenAmount::from(1),
        gas_limit: 1_000_000,
    }
}

#[test]
fn test_store_round_trip_and_root() {
    let (_server, client) = spawn(ValidationConfig::default());
    client.new_vm(Some("StoreRoundTrip")).unwrap();

    let empty_root = client.root().unwrap();
    let cid = client.store_put(b"head-state").unwrap();
    assert_eq!(client.store_get(&cid).unwrap(), b"head-state");
    assert_ne!(client.root().unwrap(), empty_root);
}

#[test]
fn test_apply_reply_shapes() {
    let (_server, client) = spawn(ValidationConfig::default());
    client.new_vm(None).unwrap();

    let reply = client
        .apply_message(5, &Address::new_id(1000), &transfer())
        .unwrap();
    assert_eq!(reply.receipt.exit_code, ExitCode::SYS_ERR_SENDER_INVALID);
    assert_eq!(reply.receipt.gas_used, 3);
    assert_eq!(reply.penalty, TokenAmount::from(7));

    let tipset = client
        .apply_tip_set_messages(9, &[], &Randomness::from_label("tipset"))
        .unwrap();
    assert!(tipset.receipts.is_empty());
    assert_eq!(tipset.root, Cid::new("epoch-9"));
}

#[test]
fn test_vm_error_is_remote_not_transport() {
    let (_server, client) = spawn(ValidationConfig::default());
    let err = client
        .set_actor_state(&Address::new_id(5), &TokenAmount::zero(), &Cid::of_bytes(b""))
        .unwrap_err();
    assert!(matches!(err, RpcError::Remote { .. }), "got {err}");
    assert!(!err.is_transport());
}

#[test]
fn test_unknown_method_is_protocol_error() {
    let (_server, client) = spawn(ValidationConfig::default());
    let err = client
        .call::<_, serde_json::Value>("VMWrapper.Teleport", &Empty {})
        .unwrap_err();
    match err {
        RpcError::Protocol { fault, .. } => assert_eq!(fault.kind, FaultKind::UnknownMethod),
        other => panic!("expected protocol error, got {other}"),
    }
}

#[test]
fn test_invalid_params_is_protocol_error() {
    let (_server, client) = spawn(ValidationConfig::default());
    let err = client
        .call::<_, StoreGetReply>(methods::STORE_GET, &serde_json::json!({"wrong": 1}))
        .unwrap_err();
    match err {
        RpcError::Protocol { fault, .. } => assert_eq!(fault.kind, FaultKind::InvalidParams),
        other => panic!("expected protocol error, got {other}"),
    }
}

#[test]
fn test_config_service() {
    let config = ValidationConfig {
        check_gas: false,
        check_exit_code: true,
        check_return_value: false,
        check_state_root: true,
        test_suites: vec!["tipset".into()],
    };
    let (_server, client) = spawn(config.clone());
    assert_eq!(client.validation_config().unwrap(), config);
}

#[test]
fn test_timeout_is_transport_error() {
    // Accepts connections but never answers.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    let holder = std::thread::spawn(move || {
        let (_stream, _) = listener.accept().unwrap();
        std::thread::sleep(Duration::from_secs(2));
    });

    let client = RpcClient::new(&endpoint, Duration::from_millis(200));
    let started = Instant::now();
    let err = client.root().unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(err.is_transport(), "got {err}");
    assert!(err.is_timeout(), "got {err}");
    holder.join().unwrap();
}

#[test]
fn test_connection_refused_is_transport_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = RpcClient::from_host_port("127.0.0.1", port, Duration::from_millis(500));
    let err = client.root().unwrap_err();
    assert!(err.is_transport(), "got {err}");
    assert!(!err.is_timeout());
}

#[test]
fn test_malformed_reply_is_decode_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    let responder = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 4096];
        let _ = stream.read(&mut buf);
        let body = "this is not json";
        let reply = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(reply.as_bytes()).unwrap();
    });

    let client = RpcClient::new(&endpoint, Duration::from_secs(2));
    let err = client.root().unwrap_err();
    assert!(matches!(err, RpcError::Decode { .. }), "got {err}");
    assert!(err.is_transport());
    responder.join().unwrap();
}

#[test]
fn test_server_closing_before_reply_is_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    let closer = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 4096];
        let _ = stream.read(&mut buf);
    });

    let client = RpcClient::new(&endpoint, Duration::from_secs(2));
    let err = client.new_vm(None).unwrap_err();
    closer.join().unwrap();
    assert!(
        matches!(err, RpcError::Disconnected { .. } | RpcError::Connect { .. }),
        "got {err}"
    );
    assert!(!matches!(err, RpcError::Decode { .. }));
    assert!(err.is_transport());
    assert!(!err.is_timeout());
}
