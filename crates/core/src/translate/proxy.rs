use crate::translate::{
    parse_json, send, translated_text_field, Provider, ProviderError, Translation,
    TranslationRequest, Translator, WireRequest,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use url::Url;

const PROVIDER: Provider = Provider::Proxy;

/// Client side of the proxy endpoint. The deadline is applied by the cascade.
#[derive(Clone)]
pub struct ProxyTranslator {
    client: Client,
    endpoint: Url,
}

impl ProxyTranslator {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

impl Translator for ProxyTranslator {
    fn provider(&self) -> Provider {
        PROVIDER
    }

    fn translate(
        &self,
        request: TranslationRequest,
    ) -> BoxFuture<'_, Result<Translation, ProviderError>> {
        async move {
            let body = WireRequest::from(&request);
            let (status, text) = send(
                PROVIDER,
                self.client.post(self.endpoint.clone()).json(&body),
            )
            .await?;

            let payload: serde_json::Value = parse_json(PROVIDER, status, &text)?;
            Ok(Translation::text(translated_text_field(&payload)))
        }
        .boxed()
    }
}
