use reqwest::header::AUTHORIZATION;
use serde::Deserialize;

use crate::error::AuthError;

/// Subset of the OIDC userinfo profile the platform consumes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Fetch the caller's profile from the issuer's userinfo endpoint, forwarding
/// the original `Authorization` header value.
pub async fn fetch(
    http: &reqwest::Client,
    issuer: &str,
    authorization: &str,
) -> Result<Profile, AuthError> {
    let url = format!("{issuer}userinfo");
    let response = http
        .get(&url)
        .header(AUTHORIZATION, authorization)
        .send()
        .await
        .map_err(|e| AuthError::Profile(format!("GET {url}: {e}")))?;
    if !response.status().is_success() {
        return Err(AuthError::Profile(format!(
            "userinfo returned http status {}",
            response.status().as_u16()
        )));
    }
    response
        .json::<Profile>()
        .await
        .map_err(|e| AuthError::Profile(format!("malformed userinfo response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn forwards_authorization_and_extracts_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sub": "user-42",
                "email": "user@example.net",
                "email_verified": true,
            })))
            .mount(&server)
            .await;

        let issuer = format!("{}/", server.uri());
        let profile = fetch(&reqwest::Client::new(), &issuer, "Bearer tok-1")
            .await
            .unwrap();
        assert_eq!(profile.email, "user@example.net");
        assert!(profile.email_verified);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let issuer = format!("{}/", server.uri());
        let err = fetch(&reqwest::Client::new(), &issuer, "Bearer bad")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Profile(_)));
    }
}
