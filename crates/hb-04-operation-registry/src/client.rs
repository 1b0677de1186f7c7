//! Engine-side driver for long-running operations.

use crate::error::OperationError;
use crate::messages::{PollEventsRequest, PollEventsResponse, StartOperationResponse};
use futures::stream::{self, BoxStream, StreamExt};
use hb_01_wire_codec::Message;
use hb_03_rpc_multiplexer::RpcMultiplexer;
use shared_types::OperationId;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Starts operations and polls them until the host reports them finished.
#[derive(Clone)]
pub struct OperationClient {
    mux: Arc<RpcMultiplexer>,
    poll_interval: Duration,
}

enum PollState<Req, E> {
    Starting(Req),
    Polling {
        id: OperationId,
        queue: VecDeque<E>,
        finished: bool,
        first: bool,
    },
    Done,
}

impl OperationClient {
    pub fn new(mux: Arc<RpcMultiplexer>, poll_interval: Duration) -> Self {
        Self { mux, poll_interval }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Call a Start method. The empty id becomes [`OperationError::NotStarted`].
    pub async fn start<Req>(
        &self,
        method: &str,
        request: &Req,
        cancel: &CancellationToken,
    ) -> Result<OperationId, OperationError>
    where
        Req: Message + Sync,
    {
        let response: StartOperationResponse =
            self.mux.call_with_cancel(method, request, cancel).await?;
        let id = OperationId::from(response.operation_id);
        if id.is_none() {
            return Err(OperationError::NotStarted);
        }
        debug!(method, operation_id = %id, "Operation started");
        Ok(id)
    }

    /// One Poll call.
    pub async fn poll<E: Message>(
        &self,
        method: &str,
        id: &OperationId,
        cancel: &CancellationToken,
    ) -> Result<PollEventsResponse<E>, OperationError> {
        let request = PollEventsRequest {
            operation_id: id.as_str().to_string(),
        };
        Ok(self.mux.call_with_cancel(method, &request, cancel).await?)
    }

    /// Start an operation and yield its events in order.
    ///
    /// Nothing is sent until the stream is first polled. The first Poll
    /// follows Start immediately; later ones wait for the poll interval.
    /// The stream ends after the terminal batch, after the first error,
    /// or when `cancel` fires. A cancelled stream issues no further calls.
    pub fn events<Req, E>(
        &self,
        start_method: &str,
        poll_method: &str,
        request: Req,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<E, OperationError>>
    where
        Req: Message + Send + Sync + 'static,
        E: Message + Send + 'static,
    {
        let client = self.clone();
        let start_method = start_method.to_string();
        let poll_method = poll_method.to_string();

        stream::unfold(PollState::Starting(request), move |state| {
            let client = client.clone();
            let start_method = start_method.clone();
            let poll_method = poll_method.clone();
            let cancel = cancel.clone();
            async move {
                let mut state = state;
                loop {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    state = match state {
                        PollState::Done => return None,
                        PollState::Starting(request) => {
                            match client.start(&start_method, &request, &cancel).await {
                                Ok(id) => PollState::Polling {
                                    id,
                                    queue: VecDeque::new(),
                                    finished: false,
                                    first: true,
                                },
                                Err(e) => return stop_with(e, &cancel),
                            }
                        }
                        PollState::Polling {
                            id,
                            mut queue,
                            finished,
                            first,
                        } => {
                            if let Some(event) = queue.pop_front() {
                                let next = PollState::Polling {
                                    id,
                                    queue,
                                    finished,
                                    first,
                                };
                                return Some((Ok(event), next));
                            }
                            if finished {
                                return None;
                            }
                            if !first {
                                tokio::select! {
                                    _ = cancel.cancelled() => return None,
                                    _ = tokio::time::sleep(client.poll_interval) => {}
                                }
                            }
                            match client.poll::<E>(&poll_method, &id, &cancel).await {
                                Ok(batch) => PollState::Polling {
                                    id,
                                    queue: batch.events.into(),
                                    finished: batch.is_finished,
                                    first: false,
                                },
                                Err(e) => return stop_with(e, &cancel),
                            }
                        }
                    };
                }
            }
        })
        .boxed()
    }
}

/// Yield `error` once and end, unless the failure came from our own cancel.
fn stop_with<Req, E>(
    error: OperationError,
    cancel: &CancellationToken,
) -> Option<(Result<E, OperationError>, PollState<Req, E>)> {
    if cancel.is_cancelled() {
        None
    } else {
        Some((Err(error), PollState::Done))
    }
}
