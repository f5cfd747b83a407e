// ABOUTME: HTTP service for managing 360 photosphere uploads to the Street View Publish API
// ABOUTME: Routes auth, upload, list and thumbnail requests; credentials live in sealed cookies

mod body;
mod error;
mod mask;
mod oauth;
mod photo;
mod seal;
mod streetview;

use crate::error::ApiError;
use crate::streetview::StreetViewClient;
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{AppendHeaders, Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder;
use serde::Deserialize;
use std::{env, sync::Arc};
use tower::Service;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Maximum upload body size (100 MB)
const MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;

/// Popup-closing page returned to the OAuth window on success
const AUTH_SUCCESS_HTML: &str =
    "<script>window.opener.postMessage('auth_success', '*');window.close();</script>";

/// Popup-closing page returned to the OAuth window on any failure
const AUTH_ERROR_HTML: &str =
    "<script>window.opener.postMessage('auth_error', '*');window.close();</script>";

/// Default base URL of the remote imagery API
const STREETVIEW_API_BASE: &str = "https://streetviewpublish.googleapis.com";

// Configuration, loaded once at startup and read-only afterwards
pub struct Config {
    pub port: u16,
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub oauth_redirect_url: String,
    pub oauth_token_url: String,
    pub api_base: String,
    /// 256-bit key sealing the credential cookies
    pub cookie_key: [u8; 32],
}

impl Config {
    fn from_env() -> Result<Self> {
        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            oauth_client_id: require("OAUTH_CLIENT_ID")?,
            oauth_client_secret: require("OAUTH_CLIENT_SECRET")?,
            oauth_redirect_url: require("OAUTH_REDIRECT_URL")?,
            oauth_token_url: env::var("OAUTH_TOKEN_URL")
                .unwrap_or_else(|_| oauth::TOKEN_ENDPOINT.to_string()),
            api_base: env::var("STREETVIEW_API_BASE")
                .unwrap_or_else(|_| STREETVIEW_API_BASE.to_string()),
            cookie_key: parse_cookie_key(&require("COOKIE_KEY")?)?,
        })
    }
}

fn require(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}

fn parse_cookie_key(hex_key: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_key.trim()).context("COOKIE_KEY must be a hex string")?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("COOKIE_KEY must decode to exactly 32 bytes"))
}

// App state shared across handlers
pub struct AppState {
    config: Config,
    http: reqwest::Client,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("photosphere_studio=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let port = config.port;

    let state = Arc::new(AppState {
        config,
        http: reqwest::Client::new(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(86400));

    let app = Router::new()
        .route("/api/auth", get(handle_auth))
        .route(
            "/api/upload",
            post(handle_upload).options(handle_cors_preflight),
        )
        .route("/api/list", get(handle_list))
        .route("/api/thumbnail", get(handle_thumbnail))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(cors)
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Use hyper's auto builder which supports both HTTP/1 and HTTP/2
    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let app = app.clone();

        tokio::spawn(async move {
            let builder = Builder::new(hyper_util::rt::TokioExecutor::new());
            if let Err(e) = builder
                .serve_connection(
                    io,
                    hyper::service::service_fn(move |req| {
                        let mut app = app.clone();
                        async move { app.call(req).await }
                    }),
                )
                .await
            {
                error!("Connection error: {}", e);
            }
        });
    }
}

async fn handle_cors_preflight() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
struct AuthParams {
    code: Option<String>,
}

/// GET /api/auth - without a code, hand back the consent URL; with a code,
/// exchange it and seal the tokens into HTTP-only cookies. The response is
/// always a 200 page the OAuth popup can close itself with.
async fn handle_auth(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthParams>,
) -> Response {
    let Some(code) = params.code else {
        return match oauth::authorize_url(&state.config) {
            Ok(url) => (StatusCode::OK, url).into_response(),
            Err(e) => {
                error!("failed to build authorize url: {}", e);
                (StatusCode::OK, Html(AUTH_ERROR_HTML)).into_response()
            }
        };
    };

    match oauth::exchange_code(&state.http, &state.config, &code).await {
        Ok(tokens) => {
            let access = seal::seal(&tokens.access_token, &state.config.cookie_key);
            let refresh = seal::seal(&tokens.refresh_token, &state.config.cookie_key);
            info!("oauth tokens sealed and stored in cookies");

            (
                StatusCode::OK,
                AppendHeaders([
                    (
                        header::SET_COOKIE,
                        format!("{}={}; HttpOnly; Path=/", seal::ACCESS_COOKIE, access),
                    ),
                    (
                        header::SET_COOKIE,
                        format!("{}={}; HttpOnly; Path=/", seal::REFRESH_COOKIE, refresh),
                    ),
                ]),
                Html(AUTH_SUCCESS_HTML),
            )
                .into_response()
        }
        Err(e) => {
            error!("oauth code exchange failed: {}", e);
            (StatusCode::OK, Html(AUTH_ERROR_HTML)).into_response()
        }
    }
}

/// POST /api/upload - decode the hybrid JSON+bytes body and run the upload
/// pipeline against the remote API
async fn handle_upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    raw_body: Bytes,
) -> Result<Response, ApiError> {
    let creds = seal::read_credentials(&headers, &state.config.cookie_key)?
        .ok_or_else(|| ApiError::Auth("credential cookies absent".to_string()))?;

    let payload = body::decode(&raw_body);
    let metadata = payload
        .metadata
        .ok_or_else(|| ApiError::Decode("no JSON value in request body".to_string()))?;

    info!(
        "upload request parsed, {} image bytes after metadata",
        payload.remainder.len()
    );

    let client = StreetViewClient::new(
        state.http.clone(),
        &state.config.api_base,
        &creds.access_token,
    );
    let published = client.upload(payload.remainder, metadata).await?;

    Ok(Json(published).into_response())
}

/// GET /api/list - list the authenticated user's photospheres
async fn handle_list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let creds = seal::read_credentials(&headers, &state.config.cookie_key)?
        .ok_or_else(|| ApiError::Auth("credential cookies absent".to_string()))?;

    let client = StreetViewClient::new(
        state.http.clone(),
        &state.config.api_base,
        &creds.access_token,
    );
    let photos = client.list_photos().await?;
    info!("fetched {} photos", photos.len());

    Ok(Json(photos).into_response())
}

#[derive(Deserialize)]
struct ThumbnailParams {
    #[serde(rename = "thumbnailUrl")]
    thumbnail_url: Option<String>,
}

/// GET /api/thumbnail?thumbnailUrl=... - proxy a thumbnail the remote API
/// only serves with bearer auth
async fn handle_thumbnail(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ThumbnailParams>,
) -> Result<Response, ApiError> {
    let creds = seal::read_credentials(&headers, &state.config.cookie_key)?
        .ok_or_else(|| ApiError::Auth("credential cookies absent".to_string()))?;

    let url = params
        .thumbnail_url
        .ok_or_else(|| ApiError::Validation("Missing thumbnailUrl parameter".to_string()))?;

    let client = StreetViewClient::new(
        state.http.clone(),
        &state.config.api_base,
        &creds.access_token,
    );
    let image = client.fetch_thumbnail(&url).await?;

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], image).into_response())
}
