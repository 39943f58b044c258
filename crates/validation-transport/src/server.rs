//! Server side of the RPC driving protocol.
//!
//! A SUT that cannot be linked into the test binary implements
//! [`RpcBackend`] and is exposed through [`serve`] or [`RpcServer::spawn`].
//! Calls are handled one at a time against the single current VM.

use anyhow::{anyhow, Context, Result};
use axum::{extract::State, routing::post, Json, Router};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use chain_validation_types::{Actor, Cid, ValidationConfig};

use crate::protocol::*;

/// The VM surface a remote SUT exposes.
///
/// Errors returned here travel back as [`FaultKind::Backend`] faults and
/// surface on the client as `RpcError::Remote`.
pub trait RpcBackend: Send + 'static {
    fn new_vm(&mut self, params: NewVmParams) -> Result<()>;
    fn root(&mut self) -> Result<Cid>;
    fn store_get(&mut self, cid: &Cid) -> Result<Vec<u8>>;
    fn store_put(&mut self, data: &[u8]) -> Result<Cid>;
    fn actor(&mut self, params: &ActorParams) -> Result<Option<Actor>>;
    fn set_actor_state(&mut self, params: &SetActorStateParams) -> Result<Actor>;
    fn create_actor(&mut self, params: &CreateActorParams) -> Result<CreateActorReply>;
    fn apply_message(&mut self, params: &ApplyMessageParams) -> Result<ApplyMessageReply>;
    fn apply_signed_message(
        &mut self,
        params: &ApplySignedMessageParams,
    ) -> Result<ApplyMessageReply>;
    fn apply_tip_set_messages(&mut self, params: &ApplyTipSetParams) -> Result<ApplyTipSetReply>;
}

struct ServerState<B> {
    backend: Mutex<B>,
    config: ValidationConfig,
}

/// Outcome of decoding, running and encoding one call.
enum Dispatch {
    Reply(serde_json::Value),
    Fault(FaultKind, String),
}

fn decode<P: DeserializeOwned>(params: serde_json::Value) -> Result<P, Dispatch> {
    serde_json::from_value(params).map_err(|e| Dispatch::Fault(FaultKind::InvalidParams, e.to_string()))
}

fn encode<R: Serialize>(result: Result<R>) -> Dispatch {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(v) => Dispatch::Reply(v),
            Err(e) => Dispatch::Fault(FaultKind::Internal, format!("failed to encode reply: {}", e)),
        },
        Err(e) => Dispatch::Fault(FaultKind::Backend, format!("{:#}", e)),
    }
}

impl<B: RpcBackend> ServerState<B> {
    fn dispatch(&self, request: RpcRequest) -> RpcResponse {
        let id = request.id;
        let method = request.method.clone();
        let outcome = self
            .route(&method, request.params)
            .unwrap_or_else(|fault| fault);
        match outcome {
            Dispatch::Reply(value) => RpcResponse::ok(id, value),
            Dispatch::Fault(kind, message) => {
                debug!(id, method = %method, ?kind, %message, "rpc call failed");
                RpcResponse::fault(id, kind, message)
            }
        }
    }

    fn route(&self, method: &str, params: serde_json::Value) -> Result<Dispatch, Dispatch> {
        let config = &self.config;
        let mut backend = self.backend.lock();
        let outcome = match method {
            methods::NEW_VM => {
                let p: NewVmParams = decode(params)?;
                encode(backend.new_vm(p).map(|()| Empty {}))
            }
            methods::ROOT => encode(backend.root().map(|root| RootReply { root })),
            methods::STORE_GET => {
                let p: StoreGetParams = decode(params)?;
                encode(backend.store_get(&p.cid).map(|data| StoreGetReply { data }))
            }
            methods::STORE_PUT => {
                let p: StorePutParams = decode(params)?;
                encode(backend.store_put(&p.data).map(|cid| StorePutReply { cid }))
            }
            methods::ACTOR => {
                let p: ActorParams = decode(params)?;
                encode(backend.actor(&p).map(|actor| ActorReply { actor }))
            }
            methods::SET_ACTOR_STATE => {
                let p: SetActorStateParams = decode(params)?;
                encode(
                    backend
                        .set_actor_state(&p)
                        .map(|actor| SetActorStateReply { actor }),
                )
            }
            methods::CREATE_ACTOR => {
                let p: CreateActorParams = decode(params)?;
                encode(backend.create_actor(&p))
            }
            methods::APPLY_MESSAGE => {
                let p: ApplyMessageParams = decode(params)?;
                encode(backend.apply_message(&p))
            }
            methods::APPLY_SIGNED_MESSAGE => {
                let p: ApplySignedMessageParams = decode(params)?;
                encode(backend.apply_signed_message(&p))
            }
            methods::APPLY_TIP_SET_MESSAGES => {
                let p: ApplyTipSetParams = decode(params)?;
                encode(backend.apply_tip_set_messages(&p))
            }
            methods::CONFIG_VALIDATE_GAS => encode(Ok(config.check_gas)),
            methods::CONFIG_VALIDATE_EXIT_CODE => encode(Ok(config.check_exit_code)),
            methods::CONFIG_VALIDATE_RETURN_VALUE => encode(Ok(config.check_return_value)),
            methods::CONFIG_VALIDATE_STATE_ROOT => encode(Ok(config.check_state_root)),
            methods::CONFIG_TEST_SUITES => encode(Ok(config.test_suites.clone())),
            other => Dispatch::Fault(
                FaultKind::UnknownMethod,
                format!("unknown method '{}'", other),
            ),
        };
        Ok(outcome)
    }
}

async fn handle<B: RpcBackend>(
    State(state): State<Arc<ServerState<B>>>,
    Json(request): Json<RpcRequest>,
) -> Json<RpcResponse> {
    let id = request.id;
    // The backend is synchronous and may run for a while; keep it off the
    // reactor thread.
    let reply = tokio::task::spawn_blocking(move || state.dispatch(request)).await;
    match reply {
        Ok(response) => Json(response),
        Err(e) => {
            warn!(id, error = %e, "rpc handler panicked");
            Json(RpcResponse::fault(id, FaultKind::Internal, e.to_string()))
        }
    }
}

fn router<B: RpcBackend>(backend: B, config: ValidationConfig) -> Router {
    let state = Arc::new(ServerState {
        backend: Mutex::new(backend),
        config,
    });
    Router::new()
        .route(RPC_PATH, post(handle::<B>))
        .with_state(state)
}

/// Serve `backend` on an already-bound listener until `shutdown` resolves.
pub async fn serve<B, F>(
    listener: tokio::net::TcpListener,
    backend: B,
    config: ValidationConfig,
    shutdown: F,
) -> Result<()>
where
    B: RpcBackend,
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "validation rpc server listening");
    axum::serve(listener, router(backend, config))
        .with_graceful_shutdown(shutdown)
        .await
        .context("rpc server failed")?;
    info!(%addr, "validation rpc server stopped");
    Ok(())
}

/// A server running on its own thread and runtime.
///
/// Dropping the handle stops the server and joins the thread, so a test
/// that fails midway still releases its port.
pub struct RpcServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl RpcServer {
    /// Bind `addr` (port 0 picks a free port) and start serving.
    pub fn spawn<B: RpcBackend>(
        addr: SocketAddr,
        backend: B,
        config: ValidationConfig,
    ) -> Result<Self> {
        let listener =
            StdTcpListener::bind(addr).with_context(|| format!("failed to bind {}", addr))?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();

        let thread = std::thread::Builder::new()
            .name(format!("validation-rpc-{}", addr.port()))
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(1)
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        warn!(error = %e, "failed to build rpc server runtime");
                        return;
                    }
                };
                let result = runtime.block_on(async move {
                    let listener = tokio::net::TcpListener::from_std(listener)?;
                    serve(listener, backend, config, async {
                        let _ = rx.await;
                    })
                    .await
                });
                if let Err(e) = result {
                    warn!(error = %e, "rpc server exited with error");
                }
            })
            .map_err(|e| anyhow!("failed to spawn rpc server thread: {}", e))?;

        Ok(Self {
            addr,
            shutdown: Some(tx),
            thread: Some(thread),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://ip:port`, suitable for `RpcClient::new`.
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for RpcServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
