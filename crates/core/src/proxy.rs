//! Server side of the proxy: keeps the provider secret off the client.
//!
//! Transport-agnostic; the HTTP binding lives in the CLI `serve` command.

use crate::config::{optional_api_key, ApiKey, Env, ProxyConfig, ENV_GOOGLE_API_KEY};
use crate::translate::{
    GoogleTranslator, LibreTranslator, ProviderError, Translation, TranslationRequest,
    Translator,
};
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

const LOG_TARGET: &str = "proxy";

/// Builds the key-based translator once a key has been read for a request.
pub type KeyedTranslatorFactory = Arc<dyn Fn(ApiKey) -> Arc<dyn Translator> + Send + Sync>;

#[derive(Clone, Debug, PartialEq)]
pub struct ProxyReply {
    pub status: StatusCode,
    pub body: Value,
}

impl ProxyReply {
    fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    fn method_not_allowed() -> Self {
        Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            json!({"error": "Method not allowed"}),
        )
    }

    fn missing_parameters() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            json!({"error": "missing parameters"}),
        )
    }

    fn from_provider_error(err: &ProviderError) -> Self {
        let status = match err {
            ProviderError::Status { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::BAD_GATEWAY,
        };
        let raw = err
            .raw_body()
            .map(|body| {
                serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_owned()))
            })
            .unwrap_or(Value::Null);
        Self::new(status, json!({"error": err.to_string(), "raw": raw}))
    }
}

#[derive(Clone)]
pub struct ProxyEndpoint {
    env: Arc<dyn Env>,
    keyed: KeyedTranslatorFactory,
    free_tier: Arc<dyn Translator>,
}

impl ProxyEndpoint {
    pub fn new(
        env: Arc<dyn Env>,
        keyed: KeyedTranslatorFactory,
        free_tier: Arc<dyn Translator>,
    ) -> Self {
        Self {
            env,
            keyed,
            free_tier,
        }
    }

    pub fn from_config(config: &ProxyConfig, env: Arc<dyn Env>) -> Self {
        let client = Client::new();
        let google_url = config.google_url.clone();
        let keyed_client = client.clone();
        let keyed: KeyedTranslatorFactory = Arc::new(move |key: ApiKey| -> Arc<dyn Translator> {
            Arc::new(GoogleTranslator::new(
                keyed_client.clone(),
                google_url.clone(),
                key,
            ))
        });
        let free_tier = Arc::new(LibreTranslator::new(client, config.libre_url.clone()));
        Self::new(env, keyed, free_tier)
    }

    pub async fn handle(&self, method: &Method, body: &[u8]) -> ProxyReply {
        if *method != Method::POST {
            tracing::debug!(target: LOG_TARGET, %method, "rejected method");
            return ProxyReply::method_not_allowed();
        }

        let Some(request) = parse_payload(body) else {
            tracing::debug!(target: LOG_TARGET, "rejected payload with missing parameters");
            return ProxyReply::missing_parameters();
        };

        // Read per request so a rotated or removed key takes effect immediately.
        if let Some(key) = optional_api_key(ENV_GOOGLE_API_KEY, self.env.as_ref()) {
            let keyed = (self.keyed)(key);
            match keyed.translate(request.clone()).await {
                Ok(translation) => {
                    tracing::info!(target: LOG_TARGET, provider = %keyed.provider(), "translated");
                    return ProxyReply::new(
                        StatusCode::OK,
                        json!({"translatedText": translation.text}),
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        target: LOG_TARGET,
                        provider = %e.provider(),
                        error = %e,
                        "key-based provider failed, using free tier"
                    );
                }
            }
        }

        match self.free_tier.translate(request).await {
            Ok(translation) => {
                tracing::info!(
                    target: LOG_TARGET,
                    provider = %self.free_tier.provider(),
                    "translated"
                );
                ProxyReply::new(StatusCode::OK, passthrough_body(translation))
            }
            Err(e) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    provider = %e.provider(),
                    error = %e,
                    "free tier provider failed"
                );
                ProxyReply::from_provider_error(&e)
            }
        }
    }
}

fn passthrough_body(translation: Translation) -> Value {
    translation
        .raw
        .unwrap_or_else(|| json!({"translatedText": translation.text}))
}

fn parse_payload(body: &[u8]) -> Option<TranslationRequest> {
    let payload: Value = serde_json::from_slice(body).ok()?;
    let field = |name: &str| payload.get(name).and_then(Value::as_str).unwrap_or_default();
    TranslationRequest::new(field("q"), field("source"), field("target")).ok()
}
