//! Protocol constants shared by the request model, endpoint resolver and flow adapter.

/// Media type for encrypted ODoH queries and responses.
pub const ODOH_CONTENT_TYPE: &str = "application/oblivious-dns-message";
/// ODoH responses are per-query ciphertext and must never be cached.
pub const ODOH_CACHE_CONTROL: &str = "no-cache, no-store";
/// `Accept` value used when fetching the target's ODoH configuration.
pub const CONFIG_ACCEPT: &str = "application/octet-stream";

/// Path segment of the target's query endpoint.
pub const QUERY_PATH: &str = "dns-query";
/// Path segments of the target's published configuration.
pub const CONFIG_PATH_SEGMENTS: [&str; 2] = [".well-known", "odohconfigs"];

/// Query parameter naming the target host on a proxied request.
pub const TARGET_HOST_PARAM: &str = "targethost";
/// Query parameter naming the target path on a proxied request.
pub const TARGET_PATH_PARAM: &str = "targetpath";

/// Largest datagram written back to a UDP flow.
pub const MAX_DATAGRAM_SIZE: usize = 512;

/// Largest DNS message accepted from a local flow.
pub const MAX_DNS_MESSAGE_LEN: usize = 65_535;

/// Returned by `describe` when the context cannot be rendered.
pub const UNKNOWN_CONTEXT: &str = "Unknown object";

pub const USER_AGENT: &str = concat!("odoh-stub-proxy/", env!("CARGO_PKG_VERSION"));
