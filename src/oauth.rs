// ABOUTME: OAuth authorization-URL generation and authorization-code exchange
// ABOUTME: The consent flow itself runs in a browser popup; this side only mints tokens

use crate::error::{ApiError, Result};
use crate::Config;
use serde::Deserialize;

/// Google OAuth consent endpoint
pub const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth token endpoint (overridable via config for tests)
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Scope required to manage Street View photospheres
pub const STREETVIEW_SCOPE: &str = "https://www.googleapis.com/auth/streetviewpublish";

/// Token pair minted by a successful code exchange
#[derive(Debug)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Build the consent URL the frontend opens in a popup. `access_type=offline`
/// plus `prompt=consent` forces Google to issue a refresh token.
pub fn authorize_url(config: &Config) -> Result<String> {
    let url = reqwest::Url::parse_with_params(
        AUTH_ENDPOINT,
        &[
            ("client_id", config.oauth_client_id.as_str()),
            ("redirect_uri", config.oauth_redirect_url.as_str()),
            ("response_type", "code"),
            ("scope", STREETVIEW_SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| ApiError::Internal(format!("authorize url: {}", e)))?;

    Ok(url.to_string())
}

/// Exchange an authorization code for an access/refresh token pair. A
/// response missing either token is an auth failure, not a success.
pub async fn exchange_code(
    http: &reqwest::Client,
    config: &Config,
    code: &str,
) -> Result<OAuthTokens> {
    let resp = http
        .post(&config.oauth_token_url)
        .form(&[
            ("client_id", config.oauth_client_id.as_str()),
            ("client_secret", config.oauth_client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", config.oauth_redirect_url.as_str()),
        ])
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(ApiError::Upstream(format!(
            "token exchange failed with status {}",
            resp.status()
        )));
    }

    let tokens: TokenResponse = resp.json().await?;
    match (tokens.access_token, tokens.refresh_token) {
        (Some(access_token), Some(refresh_token)) => Ok(OAuthTokens {
            access_token,
            refresh_token,
        }),
        _ => Err(ApiError::Auth(
            "token response missing access or refresh token".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(token_url: &str) -> Config {
        Config {
            port: 8080,
            oauth_client_id: "client-id-123".to_string(),
            oauth_client_secret: "client-secret".to_string(),
            oauth_redirect_url: "https://studio.example.test/api/auth".to_string(),
            oauth_token_url: token_url.to_string(),
            api_base: "https://streetviewpublish.googleapis.com".to_string(),
            cookie_key: [0u8; 32],
        }
    }

    #[test]
    fn test_authorize_url_carries_offline_consent_params() {
        let url = authorize_url(&test_config(TOKEN_ENDPOINT)).unwrap();
        assert!(url.starts_with(AUTH_ENDPOINT));
        assert!(url.contains("client_id=client-id-123"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("streetviewpublish"));
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("code".into(), "auth-code".into()),
                mockito::Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"at-1","refresh_token":"rt-1","expires_in":3599}"#)
            .expect(1)
            .create_async()
            .await;

        let config = test_config(&format!("{}/token", server.url()));
        let tokens = exchange_code(&reqwest::Client::new(), &config, "auth-code")
            .await
            .unwrap();
        assert_eq!(tokens.access_token, "at-1");
        assert_eq!(tokens.refresh_token, "rt-1");
        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_exchange_code_missing_refresh_token_is_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"at-1"}"#)
            .create_async()
            .await;

        let config = test_config(&format!("{}/token", server.url()));
        let err = exchange_code(&reqwest::Client::new(), &config, "auth-code")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }
}
