//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use bytes::Bytes;
use odoh_rs::{
    compose, decrypt_query, encrypt_response, parse, ObliviousDoHConfig, ObliviousDoHConfigs,
    ObliviousDoHKeyPair, ObliviousDoHMessage, ObliviousDoHMessagePlaintext, ResponseNonce,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::net::TcpListener;

use odoh_stub_proxy::config::TimeoutConfig;
use odoh_stub_proxy::flow::{DatagramFlow, Flow, FlowError, ReadDatagrams, StreamFlow};
use odoh_stub_proxy::hpke::{CryptoError, HpkeBackend, HpkeContext};
use odoh_stub_proxy::http::RelayClient;
use odoh_stub_proxy::{DnsProxyProvider, ProxyEndpoint, ProxyError, QueryRelay};

// ---------------------------------------------------------------------------
// Mock HTTP servers
// ---------------------------------------------------------------------------

/// A request as seen by a mock server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

type Reply = Pin<Box<dyn Future<Output = (u16, Bytes)> + Send>>;
type Responder = Arc<dyn Fn(RecordedRequest) -> Reply + Send + Sync>;

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responder: Responder,
}

/// An HTTP server on an ephemeral port answering every request through a
/// programmable responder.
pub struct MockServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    pub async fn start<F, Fut>(responder: F) -> Self
    where
        F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = (u16, Bytes)> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let state = MockState {
            requests: requests.clone(),
            responder: Arc::new(move |request| Box::pin(responder(request)) as Reply),
        };
        let app = Router::new().fallback(handle).with_state(state);

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, requests }
    }

    /// Serve fixed bytes: `config` on GET, `status`/`response` on POST.
    pub async fn fixed(config: &'static [u8], status: u16, response: &'static [u8]) -> Self {
        Self::start(move |request| async move {
            if request.method == Method::GET {
                (200, Bytes::from_static(config))
            } else {
                (status, Bytes::from_static(response))
            }
        })
        .await
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == Method::POST)
            .collect()
    }
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Bytes) {
    let request = RecordedRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    };
    state.requests.lock().unwrap().push(request.clone());

    let (status, body) = (state.responder)(request).await;
    (StatusCode::from_u16(status).unwrap(), body)
}

/// Start an oblivious proxy that forwards each POST to
/// `http://{targethost}{targetpath}` and relays the answer.
pub async fn start_forwarding_proxy() -> MockServer {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    MockServer::start(move |request| {
        let client = client.clone();
        async move {
            let query = request.query.unwrap_or_default();
            let url = url::Url::parse(&format!("http://proxy.invalid/?{}", query)).unwrap();
            let param = |name: &str| {
                url.query_pairs()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| v.into_owned())
            };
            let (Some(host), Some(path)) = (param("targethost"), param("targetpath")) else {
                return (400, Bytes::from_static(b"missing target"));
            };

            let mut forward = client.post(format!("http://{}{}", host, path)).body(request.body);
            for name in ["content-type", "accept", "cache-control"] {
                if let Some(value) = request.headers.get(name) {
                    forward = forward.header(name, value.clone());
                }
            }
            match forward.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    (status, response.bytes().await.unwrap_or_default())
                }
                Err(_) => (502, Bytes::from_static(b"upstream failed")),
            }
        }
    })
    .await
}

// ---------------------------------------------------------------------------
// Real ODoH target
// ---------------------------------------------------------------------------

/// Holds a target key pair and answers encrypted queries.
pub struct OdohTarget {
    key_pair: ObliviousDoHKeyPair,
}

impl OdohTarget {
    pub fn new() -> Self {
        let mut rng = StdRng::from_seed([42; 32]);
        Self {
            key_pair: ObliviousDoHKeyPair::new(&mut rng),
        }
    }

    pub fn configs(&self) -> Bytes {
        let configs: ObliviousDoHConfigs =
            vec![ObliviousDoHConfig::from(self.key_pair.public().clone())].into();
        compose(&configs).unwrap().freeze()
    }

    /// Decrypt `ciphertext` and encrypt `answer(query)` back.
    pub fn respond(&self, ciphertext: &[u8], answer: impl Fn(&[u8]) -> Vec<u8>) -> Option<Bytes> {
        let mut buf = Bytes::copy_from_slice(ciphertext);
        let message: ObliviousDoHMessage = parse(&mut buf).ok()?;
        let (query, secret) = decrypt_query(&message, &self.key_pair).ok()?;
        let plaintext = ObliviousDoHMessagePlaintext::new(answer(&query.clone().into_msg()), 0);
        let response = encrypt_response(&query, &plaintext, secret, ResponseNonce::default()).ok()?;
        Some(compose(&response).ok()?.freeze())
    }

    /// Serve configs on GET and answers on POST.
    pub async fn serve(self, answer: fn(&[u8]) -> Vec<u8>) -> MockServer {
        let target = Arc::new(self);
        MockServer::start(move |request| {
            let target = target.clone();
            async move {
                if request.method == Method::GET {
                    return (200, target.configs());
                }
                match target.respond(&request.body, answer) {
                    Some(body) => (200, body),
                    None => (400, Bytes::from_static(b"bad ciphertext")),
                }
            }
        })
        .await
    }
}

/// Answer that echoes the query behind a marker.
pub fn echo_answer(query: &[u8]) -> Vec<u8> {
    let mut answer = b"ANSWER:".to_vec();
    answer.extend_from_slice(query);
    answer
}

// ---------------------------------------------------------------------------
// Spy crypto backend
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct SpyCalls {
    pub create: AtomicUsize,
    pub encrypt: AtomicUsize,
    pub decrypt: AtomicUsize,
}

impl SpyCalls {
    pub fn crypto_calls(&self) -> usize {
        self.encrypt.load(Ordering::SeqCst) + self.decrypt.load(Ordering::SeqCst)
    }
}

/// Accepts config "CFG1"; encrypts to "ENC:" + query; decrypts to
/// "DEC:" + response after checking the secret belongs to the query.
#[derive(Debug, Clone, Default)]
pub struct SpyBackend {
    pub calls: Arc<SpyCalls>,
}

pub struct SpyContext {
    calls: Arc<SpyCalls>,
}

pub struct SpySecret(Vec<u8>);

impl HpkeBackend for SpyBackend {
    type Context = SpyContext;

    fn create_context(&self, config: &[u8]) -> Result<SpyContext, CryptoError> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        if config != b"CFG1" {
            return Err(CryptoError::InvalidContext("unexpected config".into()));
        }
        Ok(SpyContext {
            calls: self.calls.clone(),
        })
    }
}

impl HpkeContext for SpyContext {
    type Secret = SpySecret;

    fn encrypt(&self, query: &[u8]) -> Result<(Bytes, SpySecret), CryptoError> {
        self.calls.encrypt.fetch_add(1, Ordering::SeqCst);
        Ok((prefixed(b"ENC:", query), SpySecret(query.to_vec())))
    }

    fn decrypt(&self, response: &[u8], original_query: &[u8], secret: SpySecret) -> Result<Bytes, CryptoError> {
        self.calls.decrypt.fetch_add(1, Ordering::SeqCst);
        if secret.0 != original_query {
            return Err(CryptoError::Decryption("secret belongs to another query".into()));
        }
        Ok(prefixed(b"DEC:", response))
    }

    fn describe(&self) -> String {
        "spy context".to_string()
    }
}

pub fn prefixed(prefix: &[u8], data: &[u8]) -> Bytes {
    let mut out = prefix.to_vec();
    out.extend_from_slice(data);
    out.into()
}

// ---------------------------------------------------------------------------
// Scripted flows
// ---------------------------------------------------------------------------

/// Everything the adapter did to a flow, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    Open,
    Read,
    Write(Bytes),
    WriteDatagrams(Vec<Bytes>, Vec<SocketAddr>),
    CloseRead(Option<ProxyError>),
    CloseWrite(Option<ProxyError>),
}

#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<FlowEvent>>>);

impl EventLog {
    fn push(&self, event: FlowEvent) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<FlowEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<FlowEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, FlowEvent::Write(_) | FlowEvent::WriteDatagrams(..)))
            .collect()
    }
}

pub struct ScriptedStream {
    pub open: Result<(), FlowError>,
    pub read: Result<Option<Bytes>, FlowError>,
    pub write: Result<(), FlowError>,
    log: EventLog,
}

impl ScriptedStream {
    pub fn reading(query: &'static [u8]) -> (Self, EventLog) {
        Self::with_read(Ok(Some(Bytes::from_static(query))))
    }

    pub fn with_read(read: Result<Option<Bytes>, FlowError>) -> (Self, EventLog) {
        let log = EventLog::default();
        let flow = Self {
            open: Ok(()),
            read,
            write: Ok(()),
            log: log.clone(),
        };
        (flow, log)
    }
}

impl StreamFlow for ScriptedStream {
    async fn open(&mut self) -> Result<(), FlowError> {
        self.log.push(FlowEvent::Open);
        self.open.clone()
    }

    async fn read(&mut self) -> Result<Option<Bytes>, FlowError> {
        self.log.push(FlowEvent::Read);
        self.read.clone()
    }

    async fn write(&mut self, data: Bytes) -> Result<(), FlowError> {
        self.log.push(FlowEvent::Write(data));
        self.write.clone()
    }

    async fn close_read(&mut self, error: Option<ProxyError>) {
        self.log.push(FlowEvent::CloseRead(error));
    }

    async fn close_write(&mut self, error: Option<ProxyError>) {
        self.log.push(FlowEvent::CloseWrite(error));
    }
}

pub struct ScriptedDatagrams {
    pub open: Result<(), FlowError>,
    pub read: Result<ReadDatagrams, FlowError>,
    pub write: Result<(), FlowError>,
    log: EventLog,
}

impl ScriptedDatagrams {
    pub fn reading(datagrams: &[&'static str], endpoints: Vec<SocketAddr>) -> (Self, EventLog) {
        let log = EventLog::default();
        let flow = Self {
            open: Ok(()),
            read: Ok(ReadDatagrams {
                datagrams: datagrams.iter().map(|d| Bytes::from_static(d.as_bytes())).collect(),
                endpoints,
            }),
            write: Ok(()),
            log: log.clone(),
        };
        (flow, log)
    }
}

impl DatagramFlow for ScriptedDatagrams {
    async fn open(&mut self) -> Result<(), FlowError> {
        self.log.push(FlowEvent::Open);
        self.open.clone()
    }

    async fn read_datagrams(&mut self) -> Result<ReadDatagrams, FlowError> {
        self.log.push(FlowEvent::Read);
        self.read.clone()
    }

    async fn write_datagrams(&mut self, datagrams: Vec<Bytes>, endpoints: Vec<SocketAddr>) -> Result<(), FlowError> {
        self.log.push(FlowEvent::WriteDatagrams(datagrams, endpoints));
        self.write.clone()
    }

    async fn close_read(&mut self, error: Option<ProxyError>) {
        self.log.push(FlowEvent::CloseRead(error));
    }

    async fn close_write(&mut self, error: Option<ProxyError>) {
        self.log.push(FlowEvent::CloseWrite(error));
    }
}

pub type TestFlow = Flow<ScriptedStream, ScriptedDatagrams>;

// ---------------------------------------------------------------------------
// Provider helpers
// ---------------------------------------------------------------------------

pub fn test_client() -> RelayClient {
    RelayClient::new(&TimeoutConfig {
        connect_secs: 2,
        request_secs: 5,
        ..TimeoutConfig::default()
    })
    .unwrap()
}

pub fn provider_for<B: HpkeBackend>(endpoint: ProxyEndpoint, backend: B) -> Arc<DnsProxyProvider<B>> {
    Arc::new(DnsProxyProvider::new(
        QueryRelay::new(endpoint, test_client()),
        backend,
    ))
}

/// Provider talking directly to `target`.
pub fn direct_provider<B: HpkeBackend>(target: &MockServer, backend: B) -> Arc<DnsProxyProvider<B>> {
    provider_for(ProxyEndpoint::parse(&target.url(), None).unwrap(), backend)
}

/// Wait until every dispatched flow has finished.
pub async fn settle<B: HpkeBackend>(provider: &DnsProxyProvider<B>) {
    tokio::time::timeout(Duration::from_secs(5), provider.flows().wait_idle())
        .await
        .expect("flows did not finish in time");
}

pub fn peer(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}
