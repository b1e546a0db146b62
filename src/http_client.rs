// HTTP client for the 1mg health-record API
//
// The diagnostics endpoint is the one the vendor's PWA calls; it only
// answers when the request looks like a mobile browser carrying an
// authenticated session cookie. Both the cookie and the member ID are
// obtained manually from the web app. This client never logs in or
// refreshes a session, and it never retries: every failure is terminal
// for the run.

use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::error::ExportError;

/// Default User-Agent: Chrome on iOS, the combination the vendor's
/// mobile-web gate accepts.
pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/126.0.6478.54 Mobile/15E148 Safari/604.1";

/// Default diagnostics endpoint of the 1mg PWA API. Per-report URLs are
/// `{base}/{report_id}/{member_id}`.
pub const DEFAULT_BASE_URL: &str =
    "https://www.1mg.com/pwa-api/api/v5/user/health-record/diagnostics";

/// Manually-obtained session identity
///
/// `cookie` is the raw Cookie header value copied from an authenticated
/// browser request; `member_id` comes from the `/health-record` page URL.
#[derive(Debug, Clone)]
pub struct Session {
    pub cookie: String,
    pub member_id: String,
}

/// HTTP client for fetching report payloads
pub struct VendorClient {
    /// Shared reqwest client (connection reuse across report fetches)
    client: Client,

    /// Endpoint base URL, without the per-report suffix
    base_url: String,

    /// Session credentials attached to every request
    session: Session,
}

impl VendorClient {
    /// Create a new client impersonating a mobile browser
    pub fn new(
        base_url: String,
        session: Session,
        user_agent: &str,
        connect_timeout: u64,
        request_timeout: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    /// Fetch one report's JSON payload
    ///
    /// Fails fast: send/receive problems are network errors, a non-2xx
    /// status is a vendor rejection (401/403 usually means the cookie
    /// expired), and a body that is not JSON is a parse error.
    pub async fn fetch_report(&self, report_id: &str) -> Result<Value, ExportError> {
        let url = self.report_url(report_id);

        tracing::debug!(%url, report_id, "fetching report");

        let response = self
            .client
            .get(&url)
            .header(COOKIE, &self.session.cookie)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| network_error(&url, report_id, e))?;

        let status = response.status();
        tracing::debug!(status = %status, report_id, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                report_id,
                body_bytes = body.len(),
                "vendor returned an error response"
            );
            return Err(ExportError::Api {
                status: status.as_u16(),
                report_id: report_id.to_string(),
                // Error pages can be whole HTML documents
                body: truncate_body(&body),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| network_error(&url, report_id, e))?;

        serde_json::from_str(&body).map_err(|e| ExportError::Parse {
            report_id: report_id.to_string(),
            reason: format!("body is not valid JSON: {e}"),
        })
    }

    fn report_url(&self, report_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            report_id,
            self.session.member_id
        )
    }
}

/// Cap the body carried inside an error message
fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 600;

    if body.len() <= LIMIT {
        return body.to_string();
    }

    let mut end = LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes total)", &body[..end], body.len())
}

/// Classify a reqwest failure for the log, then wrap it
fn network_error(url: &str, report_id: &str, e: reqwest::Error) -> ExportError {
    let error_kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else {
        "unknown"
    };

    tracing::warn!(
        error_kind,
        error = %e,
        %url,
        report_id,
        "HTTP request failed"
    );

    ExportError::Network {
        url: url.to_string(),
        source: e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> VendorClient {
        VendorClient::new(
            base_url.to_string(),
            Session {
                cookie: "session=abc123".to_string(),
                member_id: "m-77".to_string(),
            },
            MOBILE_USER_AGENT,
            10,
            30,
        )
        .unwrap()
    }

    #[test]
    fn test_report_url_layout() {
        let client = test_client(DEFAULT_BASE_URL);
        assert_eq!(
            client.report_url("rep-1"),
            "https://www.1mg.com/pwa-api/api/v5/user/health-record/diagnostics/rep-1/m-77"
        );
    }

    #[test]
    fn test_report_url_tolerates_trailing_slash() {
        let client = test_client("http://127.0.0.1:8080/base/");
        assert_eq!(client.report_url("r1"), "http://127.0.0.1:8080/base/r1/m-77");
    }

    #[test]
    fn test_default_user_agent_is_mobile_browser() {
        assert!(MOBILE_USER_AGENT.contains("iPhone"));
        assert!(MOBILE_USER_AGENT.contains("CriOS"));
    }

    #[test]
    fn test_truncate_body_passes_short_bodies_through() {
        assert_eq!(truncate_body("session expired"), "session expired");
        assert_eq!(truncate_body(""), "");
    }

    #[test]
    fn test_truncate_body_caps_long_bodies() {
        let body = "x".repeat(5000);
        let truncated = truncate_body(&body);
        assert!(truncated.len() < 700);
        assert!(truncated.ends_with("(5000 bytes total)"));
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        // Multi-byte characters straddling the cut point must not panic
        let body = "é".repeat(1000);
        let truncated = truncate_body(&body);
        assert!(truncated.contains("bytes total"));
    }
}
