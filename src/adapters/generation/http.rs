//! HTTP generation service.
//!
//! POSTs a JSON [`GenerationRequest`] to `{base_url}/generate` and expects a
//! JSON [`GenerationResponse`] back. Requests are rate limited client-side.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{header, Client, StatusCode};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ServiceConfig;
use crate::domain::ports::{GenerationError, GenerationRequest, GenerationResponse, GenerationService};

/// Generation service reached over HTTP.
pub struct HttpGenerationService {
    endpoint: String,
    client: Client,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl HttpGenerationService {
    pub fn new(config: &ServiceConfig) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::ValidationFailed(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            endpoint: format!("{}/generate", config.base_url.trim_end_matches('/')),
            client,
            limiter: rate_limiter(config.requests_per_second),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Limiter admitting `per_second` requests; `None` disables limiting.
fn rate_limiter(per_second: f64) -> Option<DefaultDirectRateLimiter> {
    if !per_second.is_finite() || per_second <= 0.0 {
        return None;
    }
    let quota = if per_second >= 1.0 {
        let rate = NonZeroU32::new(per_second.round() as u32)?;
        Quota::per_second(rate)
    } else {
        Quota::with_period(Duration::from_secs_f64(1.0 / per_second))?
    };
    Some(RateLimiter::direct(quota))
}

fn map_transport_error(err: &reqwest::Error) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::Transport(err.to_string())
    }
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        debug!(
            endpoint = %self.endpoint,
            target = request.target_difficulty,
            "sending generation request"
        );
        let response = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
                GenerationError::Timeout
            } else {
                GenerationError::Server {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let body = response.text().await.map_err(|e| map_transport_error(&e))?;
        let parsed: GenerationResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        if !(0.0..=1.0).contains(&parsed.actual_difficulty) {
            return Err(GenerationError::InvalidResponse(format!(
                "actual_difficulty {} is outside [0, 1]",
                parsed.actual_difficulty
            )));
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_base_url() {
        let config = ServiceConfig {
            base_url: "http://localhost:9000/".to_string(),
            ..ServiceConfig::default()
        };
        let service = HttpGenerationService::new(&config).unwrap();
        assert_eq!(service.endpoint(), "http://localhost:9000/generate");
    }

    #[test]
    fn test_rate_limiter_bounds() {
        assert!(rate_limiter(0.0).is_none());
        assert!(rate_limiter(f64::NAN).is_none());
        assert!(rate_limiter(0.5).is_some());
        assert!(rate_limiter(5.0).is_some());
    }
}
