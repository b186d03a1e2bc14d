mod google;
mod libre;
mod mymemory;
mod proxy;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

pub use google::GoogleTranslator;
pub use libre::LibreTranslator;
pub use mymemory::MyMemoryTranslator;
pub use proxy::ProxyTranslator;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Text,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
    pub format: Format,
}

impl TranslationRequest {
    pub fn new<T, S, D>(text: T, source_lang: S, target_lang: D) -> Result<Self, ValidationError>
    where
        T: Into<String>,
        S: Into<String>,
        D: Into<String>,
    {
        let text = text.into();
        let source_lang = source_lang.into();
        let target_lang = target_lang.into();

        let missing: Vec<&'static str> = [
            ("q", text.as_str()),
            ("source", source_lang.as_str()),
            ("target", target_lang.as_str()),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(ValidationError::MissingParameters { missing });
        }

        Ok(Self {
            text,
            source_lang,
            target_lang,
            format: Format::Text,
        })
    }
}

/// Request body shared by the proxy and the POST-style providers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireRequest {
    pub q: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub format: Format,
}

impl From<&TranslationRequest> for WireRequest {
    fn from(request: &TranslationRequest) -> Self {
        Self {
            q: request.text.clone(),
            source: request.source_lang.clone(),
            target: request.target_lang.clone(),
            format: request.format,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Translation {
    pub text: String,
    /// Upstream payload, kept only by adapters that pass it through untouched.
    pub raw: Option<serde_json::Value>,
}

impl Translation {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            raw: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Provider {
    Proxy,
    Google,
    LibreTranslate,
    MyMemory,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Proxy => "Proxy",
            Self::Google => "Google",
            Self::LibreTranslate => "LibreTranslate",
            Self::MyMemory => "MyMemory",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TranslationSource {
    Network(Provider),
    Offline,
}

impl TranslationSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Network(provider) => provider.name(),
            Self::Offline => "offline",
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Offline)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslationResult {
    pub translated_text: String,
    pub source: TranslationSource,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing parameters: {}", .missing.join(", "))]
    MissingParameters { missing: Vec<&'static str> },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: Provider,
        status: u16,
        body: String,
    },

    #[error("{provider} returned an unusable response (HTTP {status}): {body}")]
    Malformed {
        provider: Provider,
        status: u16,
        body: String,
    },

    #[error("{provider} request failed: {reason}")]
    Transport { provider: Provider, reason: String },

    #[error("{provider} did not answer within {after:?}")]
    Timeout { provider: Provider, after: Duration },
}

impl ProviderError {
    pub fn transport(provider: Provider, err: reqwest::Error) -> Self {
        Self::Transport {
            provider,
            reason: err.to_string(),
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            Self::Status { provider, .. }
            | Self::Malformed { provider, .. }
            | Self::Transport { provider, .. }
            | Self::Timeout { provider, .. } => *provider,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::Malformed { status, .. } => Some(*status),
            Self::Transport { .. } | Self::Timeout { .. } => None,
        }
    }

    pub fn raw_body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } | Self::Malformed { body, .. } => Some(body),
            Self::Transport { .. } | Self::Timeout { .. } => None,
        }
    }
}

pub trait Translator: Send + Sync {
    fn provider(&self) -> Provider;

    fn translate(
        &self,
        request: TranslationRequest,
    ) -> BoxFuture<'_, Result<Translation, ProviderError>>;
}

/// Sends the request and splits the reply into status and body text.
async fn send(
    provider: Provider,
    request: reqwest::RequestBuilder,
) -> Result<(u16, String), ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::transport(provider, e))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::transport(provider, e))?;

    if !status.is_success() {
        return Err(ProviderError::Status {
            provider,
            status: status.as_u16(),
            body,
        });
    }
    Ok((status.as_u16(), body))
}

fn parse_json<T: serde::de::DeserializeOwned>(
    provider: Provider,
    status: u16,
    body: &str,
) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|_| ProviderError::Malformed {
        provider,
        status,
        body: body.to_owned(),
    })
}

/// `translatedText` as a string, or empty when absent or not a string.
fn translated_text_field(payload: &serde_json::Value) -> String {
    payload
        .get("translatedText")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_requires_all_fields() {
        let err = TranslationRequest::new("hello", "en", "").expect_err("target missing");
        assert_eq!(
            err,
            ValidationError::MissingParameters {
                missing: vec!["target"]
            }
        );
        assert_eq!(err.to_string(), "missing parameters: target");
    }

    #[test]
    fn request_rejects_blank_text() {
        let err = TranslationRequest::new("   ", "", "fi").expect_err("blank");
        assert_eq!(
            err,
            ValidationError::MissingParameters {
                missing: vec!["q", "source"]
            }
        );
    }

    #[test]
    fn request_keeps_text_untouched() {
        let req = TranslationRequest::new("  Hello ", "en", "fi").expect("valid");
        assert_eq!(req.text, "  Hello ");
        assert_eq!(req.format, Format::Text);
    }

    #[test]
    fn wire_request_serializes_format_as_text() {
        let req = TranslationRequest::new("hi", "en", "fi").expect("valid");
        let json = serde_json::to_value(WireRequest::from(&req)).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"q": "hi", "source": "en", "target": "fi", "format": "text"})
        );
    }

    #[test]
    fn wire_request_format_defaults_when_omitted() {
        let req: WireRequest =
            serde_json::from_str(r#"{"q":"hi","source":"en","target":"fi"}"#).expect("parse");
        assert_eq!(req.format, Format::Text);
    }

    #[test]
    fn provider_error_exposes_status_and_body() {
        let err = ProviderError::Status {
            provider: Provider::LibreTranslate,
            status: 429,
            body: "slow down".into(),
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.raw_body(), Some("slow down"));
        assert_eq!(err.provider(), Provider::LibreTranslate);

        let timeout = ProviderError::Timeout {
            provider: Provider::Proxy,
            after: Duration::from_secs(8),
        };
        assert_eq!(timeout.status(), None);
    }

    #[test]
    fn translated_text_field_defaults_to_empty() {
        assert_eq!(translated_text_field(&serde_json::json!({})), "");
        assert_eq!(
            translated_text_field(&serde_json::json!({"translatedText": "hei"})),
            "hei"
        );
    }

    #[test]
    fn offline_source_is_degraded() {
        assert!(TranslationSource::Offline.is_degraded());
        assert!(!TranslationSource::Network(Provider::Proxy).is_degraded());
        assert_eq!(TranslationSource::Network(Provider::MyMemory).label(), "MyMemory");
    }
}
