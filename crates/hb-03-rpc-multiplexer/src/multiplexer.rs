//! The multiplexer: one per side, serving and calling over one channel.

use crate::config::RpcConfig;
use crate::envelope::{Envelope, EnvelopeKind};
use crate::error::{RegistryError, RpcError};
use crate::pending::{self, PendingRequestStore, PendingResponse};
use crate::service::{MethodHandler, ServiceDescriptor};
use bytes::Bytes;
use futures::FutureExt;
use hb_01_wire_codec::{BufferPool, Message};
use hb_02_transport_bridge::{DuplexChannel, Side};
use parking_lot::{Mutex, RwLock};
use shared_types::CorrelationId;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Statistics for one multiplexer
#[derive(Debug, Default)]
pub struct MultiplexerStats {
    /// Outbound calls sent
    pub calls_sent: AtomicU64,
    /// Inbound requests dispatched to a handler or answered with an error
    pub requests_handled: AtomicU64,
    /// Inbound requests answered with an error
    pub requests_failed: AtomicU64,
    /// Responses whose token matched no waiting caller
    pub responses_orphaned: AtomicU64,
    /// Inbound payloads that were not a valid envelope
    pub malformed_envelopes: AtomicU64,
}

#[derive(Default)]
struct Routes {
    services: HashSet<String>,
    methods: HashMap<String, Arc<dyn MethodHandler>>,
}

/// Request/response multiplexer over a [`DuplexChannel`].
pub struct RpcMultiplexer {
    side: Side,
    channel: Arc<dyn DuplexChannel>,
    routes: RwLock<Routes>,
    pending: Arc<PendingRequestStore>,
    pool: BufferPool,
    config: RpcConfig,
    inbound: Mutex<Option<mpsc::UnboundedReceiver<Bytes>>>,
    stats: MultiplexerStats,
}

impl RpcMultiplexer {
    /// Create a multiplexer and install its receive callback on `channel`.
    ///
    /// Inbound payloads queue up until [`run`](Self::run) starts consuming them.
    pub fn new(channel: Arc<dyn DuplexChannel>, config: RpcConfig) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        channel.on_receive(Arc::new(move |bytes: Bytes| {
            if tx.send(bytes).is_err() {
                debug!("Multiplexer gone, dropping inbound payload");
            }
        }));

        Arc::new(Self {
            side: channel.side(),
            pending: Arc::new(PendingRequestStore::new(config.call_timeout())),
            pool: BufferPool::new(config.max_pooled_buffers),
            channel,
            routes: RwLock::new(Routes::default()),
            config,
            inbound: Mutex::new(Some(rx)),
            stats: MultiplexerStats::default(),
        })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_available()
    }

    pub fn stats(&self) -> &MultiplexerStats {
        &self.stats
    }

    pub fn pending(&self) -> &PendingRequestStore {
        &self.pending
    }

    /// Register a service. Each service name may be registered once.
    pub fn register_service(&self, descriptor: ServiceDescriptor) -> Result<(), RegistryError> {
        let name = descriptor.name().to_string();
        let methods = descriptor.into_routes()?;

        let mut routes = self.routes.write();
        if routes.services.contains(&name) {
            return Err(RegistryError::DuplicateService(name));
        }
        if let Some((selector, _)) = methods
            .iter()
            .find(|(selector, _)| routes.methods.contains_key(selector))
        {
            return Err(RegistryError::DuplicateMethod(selector.clone()));
        }

        let count = methods.len();
        routes.services.insert(name.clone());
        routes.methods.extend(methods);

        info!(side = %self.side, service = %name, methods = count, "Registered service");
        Ok(())
    }

    pub fn has_method(&self, selector: &str) -> bool {
        self.routes.read().methods.contains_key(selector)
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn start(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.clone().run(shutdown))
    }

    /// Pump inbound envelopes until `shutdown` fires.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let Some(rx) = self.inbound.lock().take() else {
            warn!(side = %self.side, "Multiplexer already running");
            return;
        };
        let mut inbound = UnboundedReceiverStream::new(rx);

        let sweeper = tokio::spawn(pending::cleanup_task(
            self.pending.clone(),
            self.config.sweep_interval(),
            shutdown.clone(),
        ));

        info!(side = %self.side, "RPC multiplexer started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                next = inbound.next() => match next {
                    Some(bytes) => self.handle_inbound(bytes),
                    None => break,
                },
            }
        }

        sweeper.abort();
        info!(side = %self.side, "RPC multiplexer stopped");
    }

    fn handle_inbound(self: &Arc<Self>, bytes: Bytes) {
        let envelope = match Envelope::decode(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.stats.malformed_envelopes.fetch_add(1, Ordering::Relaxed);
                warn!(side = %self.side, error = %e, "Undecodable envelope");
                // No token to answer to; reply with an empty one so the peer
                // at least logs the failure.
                let reply = Envelope::response_to("", "", Err(RpcError::parse_error(e.to_string())));
                if let Err(e) = self.send_envelope(&reply) {
                    debug!(error = %e, "Could not report parse error");
                }
                return;
            }
        };

        match envelope.kind {
            EnvelopeKind::Request => {
                let this = self.clone();
                tokio::spawn(async move { this.dispatch(envelope).await });
            }
            EnvelopeKind::Response => self.complete(envelope),
            EnvelopeKind::Unsupported(raw) => {
                self.stats.malformed_envelopes.fetch_add(1, Ordering::Relaxed);
                warn!(
                    side = %self.side,
                    correlation_id = %envelope.correlation_id,
                    kind = raw,
                    "Envelope of unsupported kind"
                );
                let reply = Envelope::response_to(
                    &envelope.correlation_id,
                    &envelope.method,
                    Err(RpcError::invalid_request(format!("unsupported envelope kind {raw}"))),
                );
                if let Err(e) = self.send_envelope(&reply) {
                    debug!(error = %e, "Could not report invalid request");
                }
            }
        }
    }

    fn complete(&self, envelope: Envelope) {
        let correlation_id = match CorrelationId::parse(&envelope.correlation_id) {
            Ok(id) => id,
            Err(_) => {
                self.stats.responses_orphaned.fetch_add(1, Ordering::Relaxed);
                match &envelope.error {
                    Some(error) => warn!(
                        side = %self.side,
                        code = error.code,
                        message = %error.message,
                        "Peer reported an error without a correlation token"
                    ),
                    None => warn!(side = %self.side, "Response without a valid correlation token"),
                }
                return;
            }
        };

        if !self.pending.complete(correlation_id, envelope.into_result()) {
            self.stats.responses_orphaned.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn dispatch(&self, envelope: Envelope) {
        let Envelope {
            correlation_id,
            method,
            payload,
            ..
        } = envelope;

        let handler = self.routes.read().methods.get(&method).cloned();
        let result = match handler {
            Some(handler) => AssertUnwindSafe(handler.call(payload))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!(method = %method, "Handler panicked");
                    Err(RpcError::internal("handler panicked"))
                }),
            None => {
                warn!(side = %self.side, method = %method, "No handler for method");
                Err(RpcError::method_not_found(&method))
            }
        };

        self.stats.requests_handled.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = &result {
            self.stats.requests_failed.fetch_add(1, Ordering::Relaxed);
            debug!(
                correlation_id = %correlation_id,
                method = %method,
                code = e.code,
                "Request failed"
            );
        }

        let response = Envelope::response_to(&correlation_id, &method, result);
        if let Err(e) = self.send_envelope(&response) {
            warn!(
                correlation_id = %correlation_id,
                method = %method,
                error = %e,
                "Could not deliver response"
            );
        }
    }

    fn send_envelope(&self, envelope: &Envelope) -> Result<(), RpcError> {
        self.pool
            .with_encoded(envelope, |bytes| self.channel.send(bytes))
            .map_err(RpcError::from)
    }

    /// Call `method` ("Service.Method") on the other side.
    pub async fn call<Req, Resp>(&self, method: &str, request: &Req) -> Result<Resp, RpcError>
    where
        Req: Message + Sync,
        Resp: Message,
    {
        self.call_with_cancel(method, request, &CancellationToken::new())
            .await
    }

    /// Call `method`, giving up locally when `cancel` fires.
    pub async fn call_with_cancel<Req, Resp>(
        &self,
        method: &str,
        request: &Req,
        cancel: &CancellationToken,
    ) -> Result<Resp, RpcError>
    where
        Req: Message + Sync,
        Resp: Message,
    {
        if cancel.is_cancelled() {
            return Err(RpcError::cancelled(method));
        }
        if !self.channel.is_available() {
            return Err(RpcError::transport_unavailable(format!(
                "no peer attached to the {} side",
                self.side
            )));
        }

        let timeout = self.config.call_timeout();
        let (correlation_id, rx) = self.pending.register(method, timeout);
        let envelope = Envelope::request(
            correlation_id.to_string(),
            method,
            Bytes::from(request.encode_to_vec()),
        );
        if let Err(e) = self.send_envelope(&envelope) {
            self.pending.cancel(&correlation_id);
            return Err(e);
        }
        self.stats.calls_sent.fetch_add(1, Ordering::Relaxed);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.pending.cancel(&correlation_id);
                debug!(correlation_id = %correlation_id, method = method, "Call cancelled");
                return Err(RpcError::cancelled(method));
            }
            outcome = wait_for_response(rx, timeout) => outcome,
        };

        let response = match outcome {
            Some(Ok(response)) => response,
            // Sender dropped: the sweeper expired the entry.
            Some(Err(_)) => return Err(RpcError::timeout(method)),
            None => {
                self.pending.expire(&correlation_id);
                return Err(RpcError::timeout(method));
            }
        };

        let payload = response.result?;
        Resp::decode(&payload)
            .map_err(|e| RpcError::parse_error(format!("response to {}: {}", method, e)))
    }
}

/// `None` when the deadline passed first.
async fn wait_for_response(
    rx: oneshot::Receiver<PendingResponse>,
    timeout: Option<Duration>,
) -> Option<Result<PendingResponse, oneshot::error::RecvError>> {
    match timeout {
        Some(deadline) => tokio::time::timeout(deadline, rx).await.ok(),
        None => Some(rx.await),
    }
}
