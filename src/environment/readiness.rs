//! Readiness polling for freshly provisioned exporters

use crate::error::{AppError, AppResult};
use crate::http::HttpClient;
use std::time::Duration;
use tokio::time::Instant;

/// Poll `url` until it answers 200 or `timeout` elapses
///
/// Connection errors and non-200 statuses both count as "not ready yet".
/// The body is not checked here; the healthy-body assertion is a test.
pub async fn wait_until_ready(
    client: &HttpClient,
    url: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> AppResult<()> {
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        match client.send_request(url).await {
            Ok(response) if response.status_code() == 200 => {
                tracing::info!(
                    url = %url,
                    attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Exporter is ready"
                );
                return Ok(());
            }
            Ok(response) => {
                tracing::debug!(
                    url = %url,
                    status = response.status_code(),
                    attempt = attempts,
                    "Exporter not ready yet"
                );
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, attempt = attempts, "Exporter not reachable yet");
            }
        }

        if started.elapsed() + poll_interval > timeout {
            tracing::warn!(
                url = %url,
                attempts,
                timeout_seconds = timeout.as_secs(),
                "Exporter did not become ready in time"
            );
            return Err(AppError::ReadinessTimeout {
                url: url.to_string(),
                waited_seconds: timeout.as_secs(),
            });
        }
        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_ready_on_first_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/-/healthy"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Exporter is healthy.\n"))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_secs(2)).unwrap();
        wait_until_ready(
            &client,
            &format!("{}/-/healthy", server.uri()),
            Duration::from_secs(2),
            Duration::from_millis(10),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_times_out_while_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/-/healthy"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_secs(1)).unwrap();
        let err = wait_until_ready(
            &client,
            &format!("{}/-/healthy", server.uri()),
            Duration::from_millis(200),
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::ReadinessTimeout { .. }));
    }
}
