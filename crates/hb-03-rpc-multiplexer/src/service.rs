//! Service descriptors.
//!
//! A descriptor maps method names to type-erased handlers. Each handler
//! owns the decode-request, invoke, encode-response triple for one method,
//! built from a typed async function.

use crate::error::{RegistryError, RpcError};
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use hb_01_wire_codec::Message;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Wire selector for a method: `"<Service>.<Method>"`.
pub fn method_selector(service: &str, method: &str) -> String {
    format!("{}.{}", service, method)
}

/// Type-erased method implementation.
pub trait MethodHandler: Send + Sync {
    /// Decode `payload`, run the method, encode its response.
    fn call(&self, payload: Bytes) -> BoxFuture<'static, Result<Vec<u8>, RpcError>>;
}

struct UnaryHandler<Req, Resp, F> {
    func: F,
    _types: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp, F, Fut> MethodHandler for UnaryHandler<Req, Resp, F>
where
    Req: Message + Send + 'static,
    Resp: Message + Send + 'static,
    F: Fn(Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, RpcError>> + Send + 'static,
{
    fn call(&self, payload: Bytes) -> BoxFuture<'static, Result<Vec<u8>, RpcError>> {
        match Req::decode(&payload) {
            Ok(request) => {
                let fut = (self.func)(request);
                async move { fut.await.map(|response| response.encode_to_vec()) }.boxed()
            }
            Err(e) => futures::future::ready(Err(RpcError::invalid_params(e.to_string()))).boxed(),
        }
    }
}

/// A named service and its methods, registered once at startup.
pub struct ServiceDescriptor {
    name: String,
    methods: Vec<(String, Arc<dyn MethodHandler>)>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// Add a request/response method backed by an async function.
    pub fn unary<Req, Resp, F, Fut>(self, method: impl Into<String>, func: F) -> Self
    where
        Req: Message + Send + 'static,
        Resp: Message + Send + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp, RpcError>> + Send + 'static,
    {
        self.handler(
            method,
            Arc::new(UnaryHandler {
                func,
                _types: PhantomData,
            }),
        )
    }

    /// Add a method with a hand-written handler.
    pub fn handler(mut self, method: impl Into<String>, handler: Arc<dyn MethodHandler>) -> Self {
        self.methods.push((method.into(), handler));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(|(name, _)| name.as_str())
    }

    /// Check names and flatten into `(selector, handler)` pairs.
    pub(crate) fn into_routes(self) -> Result<Vec<(String, Arc<dyn MethodHandler>)>, RegistryError> {
        validate_name(&self.name)?;
        let mut routes: Vec<(String, Arc<dyn MethodHandler>)> = Vec::with_capacity(self.methods.len());
        for (method, handler) in self.methods {
            validate_name(&method)?;
            let selector = method_selector(&self.name, &method);
            if routes.iter().any(|(existing, _)| *existing == selector) {
                return Err(RegistryError::DuplicateMethod(selector));
            }
            routes.push((selector, handler));
        }
        Ok(routes)
    }
}

fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.is_empty() || name.contains('.') {
        Err(RegistryError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}
