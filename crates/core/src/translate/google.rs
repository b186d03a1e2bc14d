use crate::config::ApiKey;
use crate::translate::{
    parse_json, send, Provider, ProviderError, Translation, TranslationRequest, Translator,
    WireRequest,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

const PROVIDER: Provider = Provider::Google;

/// Key-based provider. The key travels as a `key` query parameter.
#[derive(Clone)]
pub struct GoogleTranslator {
    client: Client,
    endpoint: Url,
    api_key: ApiKey,
}

impl GoogleTranslator {
    pub fn new(client: Client, endpoint: Url, api_key: ApiKey) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }

    fn request_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("key", self.api_key.expose());
        url
    }
}

#[derive(Deserialize)]
struct GoogleResponse {
    data: GoogleData,
}

#[derive(Deserialize)]
struct GoogleData {
    #[serde(default)]
    translations: Vec<GoogleTranslation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTranslation {
    #[serde(default)]
    translated_text: String,
}

impl Translator for GoogleTranslator {
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
                self.client.post(self.request_url()).json(&body),
            )
            .await?;

            // A 200 without a translations entry is a failure, not an empty success.
            let response: GoogleResponse = parse_json(PROVIDER, status, &text)?;
            let first = response
                .data
                .translations
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::Malformed {
                    provider: PROVIDER,
                    status,
                    body: text.clone(),
                })?;

            Ok(Translation::text(first.translated_text))
        }
        .boxed()
    }
}
