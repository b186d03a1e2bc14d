use crate::translate::{
    parse_json, send, Provider, ProviderError, Translation, TranslationRequest, Translator,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

const PROVIDER: Provider = Provider::MyMemory;

/// Quota-limited secondary provider, queried with GET.
///
/// A reply without `responseData.translatedText` resolves to an empty string
/// rather than an error. Callers decide whether empty is usable.
#[derive(Clone)]
pub struct MyMemoryTranslator {
    client: Client,
    endpoint: Url,
}

impl MyMemoryTranslator {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    fn request_url(&self, request: &TranslationRequest) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", &request.text)
            .append_pair(
                "langpair",
                &format!("{}|{}", request.source_lang, request.target_lang),
            );
        url
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct MyMemoryResponse {
    #[serde(default)]
    response_data: Option<ResponseData>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ResponseData {
    #[serde(default)]
    translated_text: Option<String>,
}

impl Translator for MyMemoryTranslator {
    fn provider(&self) -> Provider {
        PROVIDER
    }

    fn translate(
        &self,
        request: TranslationRequest,
    ) -> BoxFuture<'_, Result<Translation, ProviderError>> {
        async move {
            let (status, text) =
                send(PROVIDER, self.client.get(self.request_url(&request))).await?;
            let response: MyMemoryResponse = parse_json(PROVIDER, status, &text)?;
            let translated = response
                .response_data
                .and_then(|d| d.translated_text)
                .unwrap_or_default();
            Ok(Translation::text(translated))
        }
        .boxed()
    }
}
