//! Request construction for the two ODoH request kinds.
//!
//! # Responsibilities
//! - Build the config fetch (GET, well-known path, no body)
//! - Build the encrypted query (POST, ODoH media type, ciphertext body)
//! - Fail at construction time on a bad URL so nothing partial is sent

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::Method;
use url::Url;

use crate::constants::{CONFIG_ACCEPT, ODOH_CACHE_CONTROL, ODOH_CONTENT_TYPE};
use crate::endpoint::ProxyEndpoint;
use crate::http::HttpError;

/// Which of the two requests a spec describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Fetch of the target's ODoH configuration.
    Config,
    /// Encrypted DNS query relay.
    Query,
}

impl RequestKind {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Config => "config",
            RequestKind::Query => "query",
        }
    }
}

/// A fully built request, ready to hand to the transport.
#[derive(Debug, Clone)]
pub struct HttpRequestSpec {
    pub kind: RequestKind,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub url: Url,
}

impl HttpRequestSpec {
    /// `GET {target}/.well-known/odohconfigs`.
    pub fn config(endpoint: &ProxyEndpoint) -> Result<Self, HttpError> {
        let url = endpoint.config_url()?;

        let mut headers = HeaderMap::new();
        headers.append(ACCEPT, HeaderValue::from_static(CONFIG_ACCEPT));

        Ok(Self {
            kind: RequestKind::Config,
            method: Method::GET,
            headers,
            body: None,
            url,
        })
    }

    /// `POST` of an encrypted query to the target or through the proxy.
    pub fn query(endpoint: &ProxyEndpoint, ciphertext: Bytes) -> Result<Self, HttpError> {
        let url = endpoint.query_url()?;

        let mut headers = HeaderMap::new();
        headers.append(CONTENT_TYPE, HeaderValue::from_static(ODOH_CONTENT_TYPE));
        headers.append(ACCEPT, HeaderValue::from_static(ODOH_CONTENT_TYPE));
        headers.append(CACHE_CONTROL, HeaderValue::from_static(ODOH_CACHE_CONTROL));

        Ok(Self {
            kind: RequestKind::Query,
            method: Method::POST,
            headers,
            body: Some(ciphertext),
            url,
        })
    }
}
