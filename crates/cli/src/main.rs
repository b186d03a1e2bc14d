#![deny(warnings)]

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use clap::{Args, Parser, Subcommand};
use fallback_translator_core::cascade::Cascade;
use fallback_translator_core::config::{
    resolve_api_key, resolve_string_with_default, CascadeConfig, Endpoints, ProxyConfig,
    ProxyTimeout, StdEnv, DEFAULT_BIND_ADDR, DEFAULT_GOOGLE_URL, DEFAULT_LIBRE_URL,
    DEFAULT_MYMEMORY_URL, DEFAULT_PROXY_PATH, DEFAULT_PROXY_TIMEOUT_MS, DEFAULT_PROXY_URL,
    DEFAULT_SOURCE_LANG, DEFAULT_TARGET_LANG, ENV_CLIENT_API_KEY, ENV_GOOGLE_URL, ENV_LIBRE_URL,
    ENV_MYMEMORY_URL, ENV_PROXY_URL,
};
use fallback_translator_core::proxy::ProxyEndpoint;
use fallback_translator_core::translate::{TranslationRequest, TranslationResult};
use std::io::{Read, Write};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fallback-translator")]
#[command(about = "Translate text through a proxy with provider fallbacks and an offline lexicon")]
struct Cli {
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate text, reading stdin when no text is given.
    Translate(TranslateArgs),
    /// Run the proxy endpoint that holds the provider secret.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct TranslateArgs {
    text: Option<String>,

    #[arg(long, default_value = DEFAULT_SOURCE_LANG)]
    source: String,

    #[arg(long, default_value = DEFAULT_TARGET_LANG)]
    target: String,

    /// Exchange --source and --target.
    #[arg(long)]
    swap: bool,

    #[arg(long)]
    proxy_url: Option<String>,

    #[arg(long)]
    libre_url: Option<String>,

    #[arg(long)]
    mymemory_url: Option<String>,

    #[arg(long)]
    google_url: Option<String>,

    /// Calls the key-based provider straight from this machine. Prefer the proxy.
    #[arg(long)]
    client_api_key: Option<String>,

    #[arg(long, default_value_t = DEFAULT_PROXY_TIMEOUT_MS)]
    proxy_timeout_ms: u64,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value = DEFAULT_BIND_ADDR)]
    bind: String,

    #[arg(long, default_value = DEFAULT_PROXY_PATH)]
    path: String,

    #[arg(long, env = ENV_GOOGLE_URL, default_value = DEFAULT_GOOGLE_URL)]
    google_url: String,

    #[arg(long, env = ENV_LIBRE_URL, default_value = DEFAULT_LIBRE_URL)]
    libre_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Command::Translate(args) => run_translate(args).await,
        Command::Serve(args) => run_serve(args).await,
    }
}

async fn run_translate(args: TranslateArgs) -> anyhow::Result<()> {
    let env = StdEnv;
    let text = match args.text.clone() {
        Some(t) => t,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read text from stdin")?;
            buf
        }
    };

    let (source, target) = langs(&args);
    let cfg = build_cascade_config(args, &env)?;
    tracing::info!(
        source = %source,
        target = %target,
        client_key = cfg.client_api_key.is_some(),
        "config loaded"
    );

    let cascade = Cascade::from_config(&cfg);
    if let Some(result) = translate_text(&cascade, &text, source, target).await? {
        render(&result, &mut std::io::stdout().lock(), &mut std::io::stderr().lock())
            .context("failed to write translation")?;
    }
    Ok(())
}

/// Source and target after applying `--swap`.
fn langs(args: &TranslateArgs) -> (String, String) {
    if args.swap {
        (args.target.clone(), args.source.clone())
    } else {
        (args.source.clone(), args.target.clone())
    }
}

/// `None` for blank input, which never reaches a provider.
async fn translate_text(
    cascade: &Cascade,
    text: &str,
    source: String,
    target: String,
) -> anyhow::Result<Option<TranslationResult>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let request = TranslationRequest::new(text, source, target)?;
    Ok(Some(cascade.translate(request).await))
}

fn render(
    result: &TranslationResult,
    out: &mut impl Write,
    meta: &mut impl Write,
) -> std::io::Result<()> {
    if result.source.is_degraded() {
        if result.translated_text.is_empty() {
            writeln!(out, "No translation available.")?;
        } else {
            writeln!(out, "{}", result.translated_text)?;
        }
        writeln!(meta, "Used offline fallback (API unavailable or blocked).")
    } else {
        writeln!(out, "{}", result.translated_text)?;
        writeln!(meta, "Translated via {}", result.source.label())
    }
}

fn build_cascade_config(
    args: TranslateArgs,
    env: &impl fallback_translator_core::config::Env,
) -> anyhow::Result<CascadeConfig> {
    let endpoints = Endpoints::new(
        &resolve_string_with_default(args.proxy_url, ENV_PROXY_URL, env, DEFAULT_PROXY_URL),
        &resolve_string_with_default(args.google_url, ENV_GOOGLE_URL, env, DEFAULT_GOOGLE_URL),
        &resolve_string_with_default(args.libre_url, ENV_LIBRE_URL, env, DEFAULT_LIBRE_URL),
        &resolve_string_with_default(
            args.mymemory_url,
            ENV_MYMEMORY_URL,
            env,
            DEFAULT_MYMEMORY_URL,
        ),
    )?;

    Ok(CascadeConfig {
        endpoints,
        client_api_key: resolve_api_key(args.client_api_key, ENV_CLIENT_API_KEY, env)?,
        proxy_timeout: ProxyTimeout::new(args.proxy_timeout_ms)?,
    })
}

async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    let cfg = ProxyConfig::new(&args.bind, &args.path, &args.google_url, &args.libre_url)?;
    let endpoint = ProxyEndpoint::from_config(&cfg, Arc::new(StdEnv));

    let app = router(endpoint, &cfg.path);

    let listener = tokio::net::TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind))?;
    tracing::info!(bind = %cfg.bind, path = %cfg.path, "proxy listening");

    axum::serve(listener, app).await.context("proxy server failed")?;
    Ok(())
}

fn router(endpoint: ProxyEndpoint, path: &str) -> Router {
    Router::new()
        .route(path, any(proxy_handler))
        .layer(CorsLayer::permissive())
        .with_state(endpoint)
}

async fn proxy_handler(
    State(endpoint): State<ProxyEndpoint>,
    method: Method,
    body: Bytes,
) -> Response {
    let reply = endpoint.handle(&method, &body).await;
    (reply.status, Json(reply.body)).into_response()
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
