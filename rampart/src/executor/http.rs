use super::{Response, Target, TargetError};
use rampart_core::{ConfigError, Payload, TargetSpec};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use tokio::time::Instant;

/// A live HTTP endpoint.
///
/// Time to first byte is taken when the response headers arrive; the body is then drained so
/// the total duration covers the whole response.
#[derive(Clone, Debug)]
pub struct HttpTarget {
    client: Client,
    url: Url,
    method: Method,
    content_type: HeaderValue,
}

impl HttpTarget {
    pub fn new(spec: &TargetSpec) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidTarget {
            input: spec.url.to_string(),
            reason,
        };

        let client = Client::builder()
            .build()
            .map_err(|e| invalid(e.to_string()))?;
        let method = Method::from_bytes(spec.method.as_str().as_bytes())
            .map_err(|_| ConfigError::UnsupportedMethod(spec.method.to_string()))?;
        let content_type = HeaderValue::from_str(&spec.content_type)
            .map_err(|e| invalid(format!("content type: {e}")))?;

        Ok(Self {
            client,
            url: spec.url.clone(),
            method,
            content_type,
        })
    }
}

impl Target for HttpTarget {
    async fn exchange(&self, payload: Option<&Payload>) -> Result<Response, TargetError> {
        let start = Instant::now();

        let mut request = self.client.request(self.method.clone(), self.url.clone());
        if let Some(payload) = payload {
            let body = serde_json::to_vec(payload).map_err(|e| TargetError::Encode(e.to_string()))?;
            request = request
                .header(CONTENT_TYPE, self.content_type.clone())
                .body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TargetError::Transport(e.to_string()))?;
        let time_to_first_byte = start.elapsed();
        let status = response.status().as_u16();

        response.bytes().await.map_err(|e| TargetError::Body {
            status,
            time_to_first_byte,
            reason: e.to_string(),
        })?;

        Ok(Response {
            status,
            time_to_first_byte: Some(time_to_first_byte),
        })
    }
}
