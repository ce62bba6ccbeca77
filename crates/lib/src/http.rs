//! Shared reqwest client construction. Every outbound call gets the configured timeout;
//! certificates are verified unless a caller opts out for one named host.

use crate::config::HttpConfig;

/// Client with the configured per-request timeout and certificate verification on.
pub fn build_client(http: &HttpConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(http.timeout()).build()
}

/// Client for a single trusted host whose certificate cannot be verified.
/// Falls back to [`build_client`] when `accept_invalid_certs` is false.
pub fn build_client_for_host(
    http: &HttpConfig,
    host: &str,
    accept_invalid_certs: bool,
) -> reqwest::Result<reqwest::Client> {
    if !accept_invalid_certs {
        return build_client(http);
    }
    log::warn!(
        "TLS certificate verification is DISABLED for {} (imageHost.acceptInvalidCerts)",
        host
    );
    reqwest::Client::builder()
        .timeout(http.timeout())
        .danger_accept_invalid_certs(true)
        .build()
}
