//! Endpoint resolution for config fetches and query relays.
//!
//! # Addressing
//! ```text
//! config fetch:   GET  {target}/.well-known/odohconfigs      (never via proxy)
//! direct query:   POST {target}/dns-query
//! proxied query:  POST {proxy}?targethost={host}&targetpath=%2Fdns-query
//! ```
//!
//! The configuration always comes from the target so a malicious proxy cannot
//! substitute its own keys.

use url::Url;

use crate::config::EndpointConfig;
use crate::constants::{CONFIG_PATH_SEGMENTS, QUERY_PATH, TARGET_HOST_PARAM, TARGET_PATH_PARAM};
use crate::http::HttpError;

/// The target resolver and the optional oblivious proxy in front of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    proxy: Option<Url>,
    target: Url,
}

impl ProxyEndpoint {
    /// Create an endpoint from already-parsed URLs.
    ///
    /// Both URLs must be hierarchical and carry a host.
    pub fn new(target: Url, proxy: Option<Url>) -> Result<Self, HttpError> {
        ensure_base("target", &target)?;
        if let Some(proxy) = &proxy {
            ensure_base("proxy", proxy)?;
        }
        Ok(Self { proxy, target })
    }

    /// Parse an endpoint from URL strings. An empty proxy string means direct mode.
    pub fn parse(target: &str, proxy: Option<&str>) -> Result<Self, HttpError> {
        let target = parse_url("target", target)?;
        let proxy = proxy
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| parse_url("proxy", p))
            .transpose()?;
        Self::new(target, proxy)
    }

    /// Build the endpoint described by the `[endpoint]` config section.
    pub fn from_config(config: &EndpointConfig) -> Result<Self, HttpError> {
        Self::parse(&config.target, config.proxy.as_deref())
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn proxy(&self) -> Option<&Url> {
        self.proxy.as_ref()
    }

    /// Whether queries are routed through a proxy. Direct mode is valid ODoH
    /// but the target learns the client's address.
    pub fn is_oblivious(&self) -> bool {
        self.proxy.is_some()
    }

    /// URL of the target's published ODoH configuration.
    pub fn config_url(&self) -> Result<Url, HttpError> {
        append_segments(&self.target, &CONFIG_PATH_SEGMENTS)
    }

    /// URL an encrypted query is POSTed to.
    pub fn query_url(&self) -> Result<Url, HttpError> {
        let Some(proxy) = &self.proxy else {
            return append_segments(&self.target, &[QUERY_PATH]);
        };

        let target_host = self.target_host()?;
        let target_path = format!("/{}", QUERY_PATH);

        let mut url = proxy.clone();
        url.set_fragment(None);
        url.query_pairs_mut()
            .clear()
            .append_pair(TARGET_HOST_PARAM, &target_host)
            .append_pair(TARGET_PATH_PARAM, &target_path);
        Ok(url)
    }

    /// Host (plus any non-default port) the proxy should forward to.
    fn target_host(&self) -> Result<String, HttpError> {
        let host = self.target.host_str().ok_or_else(|| {
            HttpError::InvalidEndpoint(format!("Missing host in target URL: {}", self.target))
        })?;
        Ok(match self.target.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }
}

impl std::fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.proxy {
            Some(proxy) => write!(f, "{} via {}", self.target, proxy),
            None => write!(f, "{} (direct)", self.target),
        }
    }
}

fn parse_url(role: &str, raw: &str) -> Result<Url, HttpError> {
    Url::parse(raw).map_err(|e| HttpError::InvalidEndpoint(format!("Invalid {} URL '{}': {}", role, raw, e)))
}

fn ensure_base(role: &str, url: &Url) -> Result<(), HttpError> {
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(HttpError::InvalidEndpoint(format!(
            "{} URL '{}' has no host",
            role, url
        )));
    }
    Ok(())
}

/// Append path segments, collapsing a trailing slash on the base.
fn append_segments(base: &Url, segments: &[&str]) -> Result<Url, HttpError> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| HttpError::InvalidEndpoint(format!("Cannot append a path to '{}'", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_query_url() {
        let endpoint = ProxyEndpoint::parse("https://odoh.example/", None).unwrap();
        assert!(!endpoint.is_oblivious());
        assert_eq!(endpoint.query_url().unwrap().as_str(), "https://odoh.example/dns-query");
    }

    #[test]
    fn test_direct_query_url_without_trailing_slash() {
        let endpoint = ProxyEndpoint::parse("https://odoh.example", None).unwrap();
        assert_eq!(endpoint.query_url().unwrap().as_str(), "https://odoh.example/dns-query");

        let endpoint = ProxyEndpoint::parse("https://odoh.example/resolver", None).unwrap();
        assert_eq!(
            endpoint.query_url().unwrap().as_str(),
            "https://odoh.example/resolver/dns-query"
        );
    }

    #[test]
    fn test_proxied_query_url() {
        let endpoint =
            ProxyEndpoint::parse("https://odoh.example/", Some("https://proxy.example/relay")).unwrap();
        let url = endpoint.query_url().unwrap();

        assert_eq!(url.host_str(), Some("proxy.example"));
        assert_eq!(url.path(), "/relay");
        assert_eq!(url.query(), Some("targethost=odoh.example&targetpath=%2Fdns-query"));

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("targethost".to_string(), "odoh.example".to_string()),
                ("targetpath".to_string(), "/dns-query".to_string()),
            ]
        );
    }

    #[test]
    fn test_proxied_query_replaces_existing_query() {
        let endpoint = ProxyEndpoint::parse(
            "https://odoh.example:8443",
            Some("https://proxy.example/relay?stale=1#frag"),
        )
        .unwrap();
        let url = endpoint.query_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://proxy.example/relay?targethost=odoh.example%3A8443&targetpath=%2Fdns-query"
        );
    }

    #[test]
    fn test_config_url_ignores_proxy() {
        let endpoint =
            ProxyEndpoint::parse("https://odoh.example/", Some("https://proxy.example/relay")).unwrap();
        assert_eq!(
            endpoint.config_url().unwrap().as_str(),
            "https://odoh.example/.well-known/odohconfigs"
        );
    }

    #[test]
    fn test_empty_proxy_means_direct() {
        let endpoint = ProxyEndpoint::parse("https://odoh.example", Some("  ")).unwrap();
        assert!(endpoint.proxy().is_none());
    }

    #[test]
    fn test_invalid_urls_fail_construction() {
        assert!(matches!(
            ProxyEndpoint::parse("not a url", None),
            Err(HttpError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            ProxyEndpoint::parse("mailto:resolver@odoh.example", None),
            Err(HttpError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            ProxyEndpoint::parse("https://odoh.example", Some("data:text/plain,relay")),
            Err(HttpError::InvalidEndpoint(_))
        ));
    }
}
