//! Registering a Start/Poll pair on a service descriptor.

use crate::error::StartError;
use crate::messages::{PollEventsRequest, PollEventsResponse, StartOperationResponse};
use crate::registry::{EventSink, OperationRegistry};
use hb_01_wire_codec::Message;
use hb_03_rpc_multiplexer::{RpcError, ServiceDescriptor};
use shared_types::OperationId;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Method names of one long-running flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongRunningMethods {
    pub start: String,
    pub poll: String,
    /// At most one unfinished operation per key.
    pub exclusive: Option<String>,
}

impl LongRunningMethods {
    pub fn new(start: impl Into<String>, poll: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            poll: poll.into(),
            exclusive: None,
        }
    }

    pub fn exclusive(mut self, key: impl Into<String>) -> Self {
        self.exclusive = Some(key.into());
        self
    }
}

/// Adds long-running methods to a [`ServiceDescriptor`].
pub trait OperationServiceExt: Sized {
    /// Register `methods.start` and `methods.poll` backed by `registry`.
    ///
    /// On Start the entry is created first, then `starter` receives the
    /// request and the operation's sink. `StartError::Unsupported` discards
    /// the entry and answers with the empty id; `StartError::Rejected`
    /// discards it and fails the call.
    fn long_running<Req, E, F, Fut>(
        self,
        methods: LongRunningMethods,
        registry: Arc<OperationRegistry<E>>,
        starter: F,
    ) -> Self
    where
        Req: Message + Send + 'static,
        E: Message + Send + 'static,
        F: Fn(Req, EventSink<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), StartError>> + Send + 'static;
}

impl OperationServiceExt for ServiceDescriptor {
    fn long_running<Req, E, F, Fut>(
        self,
        methods: LongRunningMethods,
        registry: Arc<OperationRegistry<E>>,
        starter: F,
    ) -> Self
    where
        Req: Message + Send + 'static,
        E: Message + Send + 'static,
        F: Fn(Req, EventSink<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), StartError>> + Send + 'static,
    {
        let starter = Arc::new(starter);
        let start_registry = registry.clone();
        let exclusive = methods.exclusive.clone();
        let start_name = methods.start.clone();

        self.unary(methods.start, move |request: Req| {
            let registry = start_registry.clone();
            let starter = starter.clone();
            let exclusive = exclusive.clone();
            let method = start_name.clone();
            async move {
                let (id, sink) = match exclusive.as_deref() {
                    Some(key) => registry
                        .start_exclusive(key)
                        .map_err(|e| RpcError::resource_contention(e.key))?,
                    None => registry.start(),
                };

                match starter(request, sink).await {
                    Ok(()) => Ok(StartOperationResponse {
                        operation_id: id.into_string(),
                    }),
                    Err(StartError::Unsupported(reason)) => {
                        registry.discard(&id);
                        debug!(method = %method, reason = %reason, "Operation not started");
                        Ok(StartOperationResponse {
                            operation_id: OperationId::none().into_string(),
                        })
                    }
                    Err(StartError::Rejected(reason)) => {
                        registry.discard(&id);
                        warn!(method = %method, reason = %reason, "Operation rejected");
                        Err(RpcError::handler(reason))
                    }
                }
            }
        })
        .unary(methods.poll, move |request: PollEventsRequest| {
            let outcome = registry.poll(&OperationId::from(request.operation_id));
            async move {
                Ok(PollEventsResponse {
                    events: outcome.events,
                    is_finished: outcome.is_finished,
                })
            }
        })
    }
}
