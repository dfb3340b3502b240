//! HTTP retry helpers for transient errors.
//!
//! Every backend and geocoder call goes through [`send_json`] so it gets
//! exponential backoff on timeouts, connection failures, HTTP 429 and 5xx.
//! Other 4xx responses are permanent and returned immediately.

use std::time::Duration;

use crate::ClientError;

/// Retry attempts after the first request.
///
/// The backoff runs 1s, 2s, 4s, so an interactive caller waits at most
/// 7 seconds on top of the request timeouts before the error surfaces.
const MAX_RETRIES: u32 = 3;

/// Maximum length of the response body kept in error values.
const BODY_PREVIEW_LEN: usize = 500;

/// Sends the request built by `build_request` and parses the body as JSON.
///
/// The closure is called once per attempt since builders are consumed by
/// `.send()`.
///
/// # Errors
///
/// * [`ClientError::RateLimited`] if the server kept answering 429.
/// * [`ClientError::Status`] for a non-retryable status, or a 5xx that
///   persisted through every retry.
/// * [`ClientError::Http`] if the connection failed after every retry.
/// * [`ClientError::Json`] if the body is not valid JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, ClientError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, MAX_RETRIES).await?;
    let url = response.url().to_string();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        log::warn!(
            "JSON parse failed for {url}: {e}\n  body preview: {}",
            preview(&text)
        );
        ClientError::Json(e)
    })
}

#[allow(clippy::future_not_send)]
async fn send_inner<F>(build_request: &F, max_retries: u32) -> Result<reqwest::Response, ClientError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        let response = match build_request().send().await {
            Ok(response) => response,
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    continue;
                }
                return Err(ClientError::Http(e));
            }
        };

        let status = response.status();
        if status.is_success() || status.is_redirection() {
            return Ok(response);
        }

        let retryable = is_retryable_status(status);
        if retryable && attempt < max_retries {
            log::warn!("  HTTP {status} from {}", response.url());
            continue;
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ClientError::RateLimited);
        }

        let body = response.text().await.unwrap_or_default();
        if retryable {
            log::error!("HTTP {status} after {max_retries} retries, giving up");
        }
        return Err(ClientError::Status {
            status: status.as_u16(),
            body: preview(&body),
        });
    }

    Err(ClientError::Parse {
        message: "request failed after all retries".to_string(),
    })
}

/// Delay before retry number `attempt` (1-based).
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << (attempt - 1).min(6))
}

/// Whether a response status is worth retrying.
fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

fn preview(text: &str) -> String {
    if text.len() <= BODY_PREVIEW_LEN {
        return text.to_string();
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn retries_rate_limits_and_server_errors_only() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_secs(1));
        assert_eq!(backoff(2), Duration::from_secs(2));
        assert_eq!(backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let text = "é".repeat(400);
        let short = preview(&text);
        assert!(short.ends_with("..."));
        assert!(short.len() <= BODY_PREVIEW_LEN + 3);
        assert_eq!(preview("ok"), "ok");
    }
}
