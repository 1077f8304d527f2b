//! Resource client: verb methods over an endpoint template.
//!
//! # Design
//! `ResourceClient` owns an endpoint template and the knobs that shape every
//! call (cache hint, timeout, pre-send hook). Each verb goes through the same
//! path: `build_request` resolves the template into an `HttpRequest`, the
//! `Transport` executes it, `check_status` and `parse_payload` turn the
//! `HttpResponse` into an optional JSON payload, and the verb reshapes that
//! payload through the client's `ResponseShape`.
//!
//! Call progress is published as `CallEvent`s on a broadcast channel rather
//! than a shared flag, so concurrent calls on one client stay distinguishable.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::config::{BaseUrlProvider, DEFAULT_TIMEOUT};
use crate::endpoint::{self, Parameters};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::shape::{kind, unwrap_envelope, Generic, ResponseShape};

const EVENT_CAPACITY: usize = 64;

/// Hook run on every request right before it is handed to the transport.
pub type BeforeSend = Arc<dyn Fn(&mut HttpRequest) + Send + Sync>;

/// The verb a `CallEvent` belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    GetOne,
    GetMany,
    Create,
    Update,
    Remove,
}

/// Progress of a single call, identified by a per-client call id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEvent {
    Started { call: u64, verb: Verb },
    Finished { call: u64, verb: Verb, ok: bool },
}

/// Options for `ResourceClient::get_many`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Send the parameters as a JSON POST body instead of substituting them
    /// into a GET url.
    pub use_post: bool,
}

impl ListOptions {
    pub fn post() -> Self {
        Self { use_post: true }
    }
}

/// CRUD-style client for one endpoint template.
pub struct ResourceClient<S = Generic> {
    endpoint: String,
    cache: bool,
    timeout: Option<Duration>,
    before_send: Option<BeforeSend>,
    base: Option<Arc<dyn BaseUrlProvider>>,
    transport: Arc<dyn Transport>,
    shape: S,
    events: broadcast::Sender<CallEvent>,
    in_flight: AtomicUsize,
    next_call: AtomicU64,
}

impl ResourceClient<Generic> {
    /// Client for `endpoint` using `ReqwestTransport` and the `Generic` shape.
    ///
    /// Relative endpoints also need `with_base_url`.
    pub fn new(endpoint: &str) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            endpoint: endpoint.to_string(),
            cache: false,
            timeout: None,
            before_send: None,
            base: None,
            transport: Arc::new(ReqwestTransport::default()),
            shape: Generic,
            events,
            in_flight: AtomicUsize::new(0),
            next_call: AtomicU64::new(0),
        }
    }
}

impl<S: ResponseShape> ResourceClient<S> {
    pub fn with_base_url(mut self, base: Arc<dyn BaseUrlProvider>) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Allow cached responses for GET requests.
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_before_send<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut HttpRequest) + Send + Sync + 'static,
    {
        self.before_send = Some(Arc::new(hook));
        self
    }

    /// Replaces the record/collection factories.
    pub fn with_shape<T: ResponseShape>(self, shape: T) -> ResourceClient<T> {
        ResourceClient {
            endpoint: self.endpoint,
            cache: self.cache,
            timeout: self.timeout,
            before_send: self.before_send,
            base: self.base,
            transport: self.transport,
            shape,
            events: self.events,
            in_flight: self.in_flight,
            next_call: self.next_call,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn cache(&self) -> bool {
        self.cache
    }

    /// Client override, else the base url provider's default, else 60s.
    pub fn timeout(&self) -> Duration {
        self.timeout
            .or_else(|| self.base.as_ref().map(|base| base.default_timeout()))
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Whether any call on this client is in flight.
    pub fn is_working(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.events.subscribe()
    }

    /// Resolves the endpoint and describes the request without sending it.
    pub fn build_request(
        &self,
        method: HttpMethod,
        parameters: Option<&Parameters>,
        body: Option<&Value>,
    ) -> Result<HttpRequest, ApiError> {
        let resolved = endpoint::resolve(&self.endpoint, parameters, self.base.as_deref())?;

        let mut request = HttpRequest::new(method, resolved.url);
        request.timeout = self.timeout();
        if method == HttpMethod::Get {
            request.cache = Some(self.cache);
        }
        if let Some(body) = body {
            let body =
                serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
            request
                .headers
                .push(("content-type".to_string(), "application/json".to_string()));
            request.body = Some(body);
        }
        if let Some(hook) = &self.before_send {
            hook(&mut request);
        }
        Ok(request)
    }

    /// Fetches a single record.
    pub async fn get_one(&self, parameters: Option<&Parameters>) -> Result<S::Record, ApiError> {
        self.track(Verb::GetOne, async {
            let payload = self
                .call(HttpMethod::Get, parameters, None)
                .await?
                .ok_or(ApiError::EmptyResponse)?;
            self.shape.record(unwrap_envelope(payload))
        })
        .await
    }

    /// Fetches a collection, by GET or, with `ListOptions::post()`, by POST
    /// with the parameters as the request body.
    pub async fn get_many(
        &self,
        parameters: Option<&Parameters>,
        options: ListOptions,
    ) -> Result<S::Collection, ApiError> {
        self.track(Verb::GetMany, async {
            let response = if options.use_post {
                let body = parameters.map(to_json).transpose()?;
                self.call(HttpMethod::Post, None, body.as_ref()).await?
            } else {
                self.call(HttpMethod::Get, parameters, None).await?
            };
            match unwrap_envelope(response.ok_or(ApiError::EmptyResponse)?) {
                Value::Array(items) => self.shape.collection(items),
                other => Err(ApiError::Deserialization(format!(
                    "expected a JSON array, found {}",
                    kind(&other)
                ))),
            }
        })
        .await
    }

    /// POSTs `body`; a non-empty reply is reshaped as a single record.
    pub async fn create<B>(
        &self,
        body: &B,
        parameters: Option<&Parameters>,
    ) -> Result<Option<S::Record>, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let body = required_body(body)?;
        self.track(Verb::Create, self.send_record(HttpMethod::Post, parameters, body))
            .await
    }

    /// PUTs `body`; a non-empty reply is reshaped as a single record.
    pub async fn update<B>(
        &self,
        body: &B,
        parameters: Option<&Parameters>,
    ) -> Result<Option<S::Record>, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let body = required_body(body)?;
        self.track(Verb::Update, self.send_record(HttpMethod::Put, parameters, body))
            .await
    }

    /// Issues a DELETE and returns the payload untouched.
    pub async fn remove<B>(
        &self,
        parameters: Option<&Parameters>,
        body: Option<&B>,
    ) -> Result<Option<Value>, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let parameters = parameters.ok_or(ApiError::MissingArgument("parameters"))?;
        let body = body.map(to_json).transpose()?;
        self.track(
            Verb::Remove,
            self.call(HttpMethod::Delete, Some(parameters), body.as_ref()),
        )
        .await
    }

    async fn send_record(
        &self,
        method: HttpMethod,
        parameters: Option<&Parameters>,
        body: Value,
    ) -> Result<Option<S::Record>, ApiError> {
        self.call(method, parameters, Some(&body))
            .await?
            .map(|payload| self.shape.record(unwrap_envelope(payload)))
            .transpose()
    }

    #[tracing::instrument(level = "debug", skip_all, fields(method = %method, endpoint = %self.endpoint))]
    async fn call(
        &self,
        method: HttpMethod,
        parameters: Option<&Parameters>,
        body: Option<&Value>,
    ) -> Result<Option<Value>, ApiError> {
        let request = self.build_request(method, parameters, body)?;
        tracing::debug!(url = %request.url, "sending request");

        let response = self.transport.send(request).await?;
        tracing::debug!(status = response.status, "response received");

        check_status(&response)?;
        parse_payload(&response)
    }

    async fn track<T, F>(&self, verb: Verb, work: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let call = self.next_call.fetch_add(1, Ordering::Relaxed);
        let guard = InFlight::enter(&self.in_flight, &self.events, call, verb);

        let result = work.await;

        if let Err(error) = &result {
            tracing::warn!(call, ?verb, %error, "call failed");
        }
        guard.finish(result.is_ok());
        result
    }
}

/// Counts a call as in flight and publishes its `Started`/`Finished` pair.
///
/// Dropping the guard without `finish` (the caller dropped the verb future)
/// still publishes `Finished { ok: false }`.
struct InFlight<'a> {
    counter: &'a AtomicUsize,
    events: &'a broadcast::Sender<CallEvent>,
    call: u64,
    verb: Verb,
    ok: Option<bool>,
}

impl<'a> InFlight<'a> {
    fn enter(
        counter: &'a AtomicUsize,
        events: &'a broadcast::Sender<CallEvent>,
        call: u64,
        verb: Verb,
    ) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = events.send(CallEvent::Started { call, verb });
        Self {
            counter,
            events,
            call,
            verb,
            ok: None,
        }
    }

    fn finish(mut self, ok: bool) {
        self.ok = Some(ok);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
        let ok = self.ok.unwrap_or_else(|| {
            tracing::debug!(call = self.call, verb = ?self.verb, "call cancelled");
            false
        });
        let _ = self.events.send(CallEvent::Finished {
            call: self.call,
            verb: self.verb,
            ok,
        });
    }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn required_body<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    match to_json(body)? {
        Value::Null => Err(ApiError::MissingArgument("body")),
        value => Ok(value),
    }
}

/// Map non-2xx responses to `ApiError::TransportFailure`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    let reason = match response.status_text() {
        Some(text) => text.to_string(),
        None => response.body.clone(),
    };
    Err(ApiError::transport(Some(response.status), reason))
}

/// Strict JSON parse; empty bodies and `null` mean "no payload".
fn parse_payload(response: &HttpResponse) -> Result<Option<Value>, ApiError> {
    if response.body.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(&response.body)
        .map_err(|e| ApiError::Deserialization(e.to_string()))?;
    Ok((!value.is_null()).then_some(value))
}
