use crate::translate::{
    parse_json, send, translated_text_field, Provider, ProviderError, Translation,
    TranslationRequest, Translator, WireRequest,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use url::Url;

const PROVIDER: Provider = Provider::LibreTranslate;

/// Free-tier primary provider. Any 2xx JSON body counts as success and is kept
/// verbatim in [`Translation::raw`].
#[derive(Clone)]
pub struct LibreTranslator {
    client: Client,
    endpoint: Url,
}

impl LibreTranslator {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

impl Translator for LibreTranslator {
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
            Ok(Translation {
                text: translated_text_field(&payload),
                raw: Some(payload),
            })
        }
        .boxed()
    }
}
