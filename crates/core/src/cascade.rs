use crate::config::CascadeConfig;
use crate::lexicon::Lexicon;
use crate::translate::{
    GoogleTranslator, LibreTranslator, MyMemoryTranslator, Provider, ProviderError,
    ProxyTranslator, TranslationRequest, TranslationResult, TranslationSource, Translator,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

const LOG_TARGET: &str = "cascade";

#[derive(Clone)]
pub struct CascadeStep {
    pub translator: Arc<dyn Translator>,
    /// Deadline for this step; `None` leaves it to the HTTP stack.
    pub timeout: Option<Duration>,
    /// Whether an empty translation ends the cascade.
    pub accept_empty: bool,
}

impl CascadeStep {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self {
            translator,
            timeout: None,
            accept_empty: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn rejecting_empty(mut self) -> Self {
        self.accept_empty = false;
        self
    }

    async fn run(&self, request: TranslationRequest) -> Result<String, ProviderError> {
        let call = self.translator.translate(request);
        let translation = match self.timeout {
            Some(after) => tokio::time::timeout(after, call)
                .await
                .map_err(|_| ProviderError::Timeout {
                    provider: self.translator.provider(),
                    after,
                })??,
            None => call.await?,
        };
        Ok(translation.text)
    }
}

/// Ordered provider fallbacks ending in the offline lexicon.
///
/// Steps run one at a time; the next one starts only after the previous has
/// failed, timed out or produced an unusable empty result.
#[derive(Clone)]
pub struct Cascade {
    steps: Vec<CascadeStep>,
    lexicon: Lexicon,
}

impl Cascade {
    pub fn new(steps: Vec<CascadeStep>) -> Self {
        Self {
            steps,
            lexicon: Lexicon,
        }
    }

    /// Proxy, then Google when a client key is set, then LibreTranslate, then MyMemory.
    pub fn from_config(config: &CascadeConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &CascadeConfig) -> Self {
        let endpoints = &config.endpoints;
        let mut steps = vec![CascadeStep::new(Arc::new(ProxyTranslator::new(
            client.clone(),
            endpoints.proxy_url.clone(),
        )))
        .with_timeout(config.proxy_timeout.duration())];

        if let Some(key) = &config.client_api_key {
            steps.push(
                CascadeStep::new(Arc::new(GoogleTranslator::new(
                    client.clone(),
                    endpoints.google_url.clone(),
                    key.clone(),
                )))
                .rejecting_empty(),
            );
        }

        steps.push(CascadeStep::new(Arc::new(LibreTranslator::new(
            client.clone(),
            endpoints.libre_url.clone(),
        ))));
        steps.push(
            CascadeStep::new(Arc::new(MyMemoryTranslator::new(
                client,
                endpoints.mymemory_url.clone(),
            )))
            .rejecting_empty(),
        );

        Self::new(steps)
    }

    pub fn providers(&self) -> Vec<Provider> {
        self.steps.iter().map(|s| s.translator.provider()).collect()
    }

    pub async fn translate(&self, request: TranslationRequest) -> TranslationResult {
        for step in &self.steps {
            let provider = step.translator.provider();
            tracing::debug!(target: LOG_TARGET, %provider, "trying provider");

            match step.run(request.clone()).await {
                Ok(text) if text.is_empty() && !step.accept_empty => {
                    tracing::warn!(
                        target: LOG_TARGET,
                        %provider,
                        "empty translation, trying next provider"
                    );
                }
                Ok(text) => {
                    tracing::info!(target: LOG_TARGET, %provider, "translated");
                    return TranslationResult {
                        translated_text: text,
                        source: TranslationSource::Network(provider),
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        target: LOG_TARGET,
                        provider = %e.provider(),
                        error = %e,
                        "provider failed, falling back"
                    );
                }
            }
        }

        tracing::warn!(
            target: LOG_TARGET,
            source = %request.source_lang,
            target_lang = %request.target_lang,
            supported = self
                .lexicon
                .supports(&request.source_lang, &request.target_lang),
            "all providers failed, using offline lexicon"
        );
        TranslationResult {
            translated_text: self.lexicon.lookup(
                &request.text,
                &request.source_lang,
                &request.target_lang,
            ),
            source: TranslationSource::Offline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKey;
    use crate::translate::Translation;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type CallLog = Arc<Mutex<Vec<Provider>>>;

    enum Behavior {
        Ok(&'static str),
        Fail,
        Hang,
    }

    struct StubTranslator {
        provider: Provider,
        behavior: Behavior,
        calls: AtomicUsize,
        log: CallLog,
    }

    impl StubTranslator {
        fn new(provider: Provider, behavior: Behavior, log: &CallLog) -> Arc<Self> {
            Arc::new(Self {
                provider,
                behavior,
                calls: AtomicUsize::new(0),
                log: log.clone(),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Translator for StubTranslator {
        fn provider(&self) -> Provider {
            self.provider
        }

        fn translate(
            &self,
            _request: TranslationRequest,
        ) -> BoxFuture<'_, Result<Translation, ProviderError>> {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.log.lock().unwrap().push(self.provider);
                match self.behavior {
                    Behavior::Ok(text) => Ok(Translation::text(text)),
                    Behavior::Fail => Err(ProviderError::Status {
                        provider: self.provider,
                        status: 503,
                        body: "unavailable".into(),
                    }),
                    Behavior::Hang => {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Ok(Translation::text("too late"))
                    }
                }
            }
            .boxed()
        }
    }

    fn request(text: &str) -> TranslationRequest {
        TranslationRequest::new(text, "en", "fi").expect("valid request")
    }

    fn step(stub: &Arc<StubTranslator>) -> CascadeStep {
        CascadeStep::new(stub.clone())
    }

    #[tokio::test]
    async fn proxy_success_short_circuits() {
        let log = CallLog::default();
        let proxy = StubTranslator::new(Provider::Proxy, Behavior::Ok("hei maailma"), &log);
        let libre = StubTranslator::new(Provider::LibreTranslate, Behavior::Ok("other"), &log);
        let mymemory = StubTranslator::new(Provider::MyMemory, Behavior::Ok("other"), &log);
        let cascade = Cascade::new(vec![step(&proxy), step(&libre), step(&mymemory)]);

        let result = cascade.translate(request("Hello World")).await;
        assert_eq!(result.translated_text, "hei maailma");
        assert_eq!(result.source, TranslationSource::Network(Provider::Proxy));
        assert_eq!(proxy.calls(), 1);
        assert_eq!(libre.calls(), 0);
        assert_eq!(mymemory.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn proxy_timeout_falls_through_to_free_tier() {
        let log = CallLog::default();
        let proxy = StubTranslator::new(Provider::Proxy, Behavior::Hang, &log);
        let libre = StubTranslator::new(Provider::LibreTranslate, Behavior::Ok("hei"), &log);
        let cascade = Cascade::new(vec![
            step(&proxy).with_timeout(Duration::from_secs(8)),
            step(&libre),
        ]);

        let started = tokio::time::Instant::now();
        let result = cascade.translate(request("hello")).await;
        assert_eq!(result.translated_text, "hei");
        assert_eq!(result.source, TranslationSource::Network(Provider::LibreTranslate));
        assert!(started.elapsed() >= Duration::from_secs(8));
        assert!(started.elapsed() < Duration::from_secs(9));
    }

    #[tokio::test]
    async fn total_failure_uses_offline_lexicon() {
        let log = CallLog::default();
        let stubs = [
            StubTranslator::new(Provider::Proxy, Behavior::Fail, &log),
            StubTranslator::new(Provider::Google, Behavior::Fail, &log),
            StubTranslator::new(Provider::LibreTranslate, Behavior::Fail, &log),
            StubTranslator::new(Provider::MyMemory, Behavior::Fail, &log),
        ];
        let cascade = Cascade::new(stubs.iter().map(step).collect());

        let result = cascade.translate(request("Hello World")).await;
        assert_eq!(result.translated_text, "hei maailma");
        assert!(result.source.is_degraded());
        assert!(stubs.iter().all(|s| s.calls() == 1));
    }

    #[tokio::test]
    async fn providers_are_tried_in_order() {
        let log = CallLog::default();
        let cascade = Cascade::new(vec![
            step(&StubTranslator::new(Provider::Proxy, Behavior::Fail, &log)),
            step(&StubTranslator::new(Provider::Google, Behavior::Fail, &log)),
            step(&StubTranslator::new(Provider::LibreTranslate, Behavior::Fail, &log)),
            step(&StubTranslator::new(Provider::MyMemory, Behavior::Ok("hei"), &log)),
        ]);

        let result = cascade.translate(request("hello")).await;
        assert_eq!(result.source, TranslationSource::Network(Provider::MyMemory));
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                Provider::Proxy,
                Provider::Google,
                Provider::LibreTranslate,
                Provider::MyMemory
            ]
        );
    }

    #[tokio::test]
    async fn empty_result_from_rejecting_step_falls_through() {
        let log = CallLog::default();
        let mymemory = StubTranslator::new(Provider::MyMemory, Behavior::Ok(""), &log);
        let cascade = Cascade::new(vec![step(&mymemory).rejecting_empty()]);

        let result = cascade.translate(request("thanks")).await;
        assert_eq!(result.translated_text, "kiitos");
        assert_eq!(result.source, TranslationSource::Offline);
    }

    #[tokio::test]
    async fn empty_result_from_accepting_step_is_returned() {
        let log = CallLog::default();
        let libre = StubTranslator::new(Provider::LibreTranslate, Behavior::Ok(""), &log);
        let mymemory = StubTranslator::new(Provider::MyMemory, Behavior::Ok("hei"), &log);
        let cascade = Cascade::new(vec![step(&libre), step(&mymemory)]);

        let result = cascade.translate(request("hello")).await;
        assert_eq!(result.translated_text, "");
        assert_eq!(result.source, TranslationSource::Network(Provider::LibreTranslate));
        assert_eq!(mymemory.calls(), 0);
    }

    #[tokio::test]
    async fn unsupported_pair_offline_returns_input() {
        let cascade = Cascade::new(Vec::new());
        let req = TranslationRequest::new("Guten Tag", "de", "fr").expect("valid");
        let result = cascade.translate(req).await;
        assert_eq!(result.translated_text, "Guten Tag");
        assert_eq!(result.source, TranslationSource::Offline);
    }

    #[test]
    fn from_config_skips_google_without_client_key() {
        let cascade = Cascade::from_config(&CascadeConfig::default());
        assert_eq!(
            cascade.providers(),
            vec![Provider::Proxy, Provider::LibreTranslate, Provider::MyMemory]
        );
    }

    #[test]
    fn from_config_includes_google_with_client_key() {
        let config = CascadeConfig {
            client_api_key: Some(ApiKey::new("client-key").expect("key")),
            ..CascadeConfig::default()
        };
        let cascade = Cascade::from_config(&config);
        assert_eq!(
            cascade.providers(),
            vec![
                Provider::Proxy,
                Provider::Google,
                Provider::LibreTranslate,
                Provider::MyMemory
            ]
        );
        assert_eq!(cascade.steps[0].timeout, Some(Duration::from_secs(8)));
        assert!(!cascade.steps[1].accept_empty);
    }
}
