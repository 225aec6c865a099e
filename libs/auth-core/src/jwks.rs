use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use dashmap::DashMap;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::AuthError;

/// Default lifetime of a cached key document.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// One entry of an issuer's published key document (RFC 7517 subset).
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kid: String,
    pub kty: String,
    #[serde(rename = "use")]
    pub use_: Option<String>,
    pub alg: Option<String>,
    /// RSA modulus, base64url.
    pub n: Option<String>,
    /// RSA exponent, base64url.
    pub e: Option<String>,
    /// X.509 certificate chain; the leaf carries the public key.
    pub x5c: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid == kid)
    }
}

#[derive(Clone)]
struct CachedKeySet {
    keys: Arc<JwkSet>,
    fetched_at: Instant,
}

/// Resolves signing keys from an issuer's `.well-known/jwks.json` document.
///
/// Documents are cached per issuer with a TTL, and concurrent misses for the
/// same issuer coalesce behind one fetch. A key id absent from a cached
/// document forces one refetch before failing, so a rotated key is picked up
/// on first use rather than after the TTL or a restart. A key id absent from
/// a freshly fetched document is [`AuthError::KeyNotFound`].
pub struct JwksClient {
    http: reqwest::Client,
    ttl: Duration,
    cache: DashMap<String, CachedKeySet>,
    flights: DashMap<String, Arc<Mutex<()>>>,
}

impl JwksClient {
    pub fn new(ttl: Duration) -> Self {
        Self::with_http(reqwest::Client::new(), ttl)
    }

    pub fn with_http(http: reqwest::Client, ttl: Duration) -> Self {
        Self {
            http,
            ttl,
            cache: DashMap::new(),
            flights: DashMap::new(),
        }
    }

    /// Produce the decoding key for `kid` as published by `issuer`.
    ///
    /// `issuer` is the issuer base URL including its trailing slash; the key
    /// document lives at `<issuer>.well-known/jwks.json`.
    pub async fn decoding_key(&self, issuer: &str, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(keys) = self.cached(issuer) {
            if let Some(key) = keys.find(kid) {
                return decoding_key_for(key);
            }
            debug!(%issuer, %kid, "key id absent from cached document, refetching");
        }

        let flight = self.flight(issuer);
        let started = Instant::now();
        let _guard = flight.lock().await;

        // Another task may have fetched while we waited on the flight lock.
        let refreshed = self
            .cache
            .get(issuer)
            .filter(|entry| entry.fetched_at > started)
            .map(|entry| entry.keys.clone());
        let keys = match refreshed {
            Some(keys) => keys,
            None => self.fetch(issuer).await?,
        };

        match keys.find(kid) {
            Some(key) => decoding_key_for(key),
            None => Err(AuthError::KeyNotFound {
                kid: kid.to_string(),
            }),
        }
    }

    fn cached(&self, issuer: &str) -> Option<Arc<JwkSet>> {
        self.cache.get(issuer).and_then(|entry| {
            (entry.fetched_at.elapsed() < self.ttl).then(|| entry.keys.clone())
        })
    }

    fn flight(&self, issuer: &str) -> Arc<Mutex<()>> {
        self.flights
            .entry(issuer.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn fetch(&self, issuer: &str) -> Result<Arc<JwkSet>, AuthError> {
        let url = format!("{issuer}.well-known/jwks.json");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AuthError::KeyFetch(format!("GET {url}: {e}")))?;
        if !response.status().is_success() {
            return Err(AuthError::KeyFetch(format!(
                "GET {url}: http status {}",
                response.status().as_u16()
            )));
        }
        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::KeyFetch(format!("malformed key document: {e}")))?;

        debug!(%issuer, keys = set.keys.len(), "fetched signing key document");
        let keys = Arc::new(set);
        self.cache.insert(
            issuer.to_string(),
            CachedKeySet {
                keys: keys.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(keys)
    }
}

fn decoding_key_for(key: &Jwk) -> Result<DecodingKey, AuthError> {
    if key.kty != "RSA" {
        return Err(AuthError::InvalidCredential(format!(
            "unsupported key type {}",
            key.kty
        )));
    }
    if let (Some(n), Some(e)) = (key.n.as_deref(), key.e.as_deref()) {
        return DecodingKey::from_rsa_components(n, e)
            .map_err(|e| AuthError::KeyFetch(format!("malformed RSA key components: {e}")));
    }
    if let Some(cert) = key.x5c.as_ref().and_then(|chain| chain.first()) {
        return decoding_key_from_certificate(cert);
    }
    Err(AuthError::KeyFetch(format!(
        "key {} carries no usable key material",
        key.kid
    )))
}

/// Convert the leaf entry of a certificate chain into a decoding key.
fn decoding_key_from_certificate(cert_b64: &str) -> Result<DecodingKey, AuthError> {
    let der = STANDARD
        .decode(cert_b64)
        .map_err(|e| AuthError::KeyFetch(format!("invalid certificate encoding: {e}")))?;
    let (_, cert) = x509_parser::parse_x509_certificate(&der)
        .map_err(|e| AuthError::KeyFetch(format!("invalid certificate: {e}")))?;
    match cert.public_key().parsed() {
        Ok(x509_parser::public_key::PublicKey::RSA(rsa)) => {
            Ok(DecodingKey::from_rsa_raw_components(rsa.modulus, rsa.exponent))
        }
        Ok(_) => Err(AuthError::KeyFetch(
            "certificate does not carry an RSA public key".into(),
        )),
        Err(e) => Err(AuthError::KeyFetch(format!(
            "unreadable certificate public key: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkeys;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn parses_key_document() {
        let doc = r#"{"keys":[{"kty":"RSA","kid":"k1","use":"sig","alg":"RS256","n":"AQAB","e":"AQAB","x5c":["Zm9v"]}]}"#;
        let set: JwkSet = serde_json::from_str(doc).unwrap();
        assert_eq!(set.keys.len(), 1);
        assert!(set.find("k1").is_some());
        assert!(set.find("k2").is_none());
    }

    #[test]
    fn builds_decoding_key_from_components() {
        let (n, e) = testkeys::rsa_components(testkeys::TEST_PUBLIC_KEY);
        let key = Jwk {
            kid: "k1".into(),
            kty: "RSA".into(),
            use_: Some("sig".into()),
            alg: Some("RS256".into()),
            n: Some(n),
            e: Some(e),
            x5c: None,
        };
        assert!(decoding_key_for(&key).is_ok());
    }

    #[test]
    fn rejects_key_without_material() {
        let key = Jwk {
            kid: "k1".into(),
            kty: "RSA".into(),
            use_: None,
            alg: None,
            n: None,
            e: None,
            x5c: None,
        };
        assert!(matches!(
            decoding_key_for(&key),
            Err(AuthError::KeyFetch(_))
        ));
    }

    #[test]
    fn rejects_non_rsa_key() {
        let key = Jwk {
            kid: "k1".into(),
            kty: "EC".into(),
            use_: None,
            alg: None,
            n: None,
            e: None,
            x5c: None,
        };
        assert!(matches!(
            decoding_key_for(&key),
            Err(AuthError::InvalidCredential(_))
        ));
    }

    #[tokio::test]
    async fn caches_document_within_ttl() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(testkeys::jwks_document("k1")))
            .expect(1)
            .mount(&server)
            .await;

        let issuer = format!("{}/", server.uri());
        let client = JwksClient::new(Duration::from_secs(300));
        client.decoding_key(&issuer, "k1").await.unwrap();
        client.decoding_key(&issuer, "k1").await.unwrap();
    }

    #[tokio::test]
    async fn unknown_kid_on_cached_document_forces_refetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(testkeys::jwks_document("k1")))
            .expect(2)
            .mount(&server)
            .await;

        let issuer = format!("{}/", server.uri());
        let client = JwksClient::new(Duration::from_secs(300));
        client.decoding_key(&issuer, "k1").await.unwrap();

        // The cached document does not know "rotated", so one refetch happens
        // before the miss is reported.
        let err = client.decoding_key(&issuer, "rotated").await.err().unwrap();
        assert!(matches!(err, AuthError::KeyNotFound { .. }));
    }

    #[tokio::test]
    async fn rotation_is_observed_on_refetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(testkeys::jwks_document("k1")))
            .expect(1)
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let issuer = format!("{}/", server.uri());
        let client = JwksClient::new(Duration::from_secs(300));
        client.decoding_key(&issuer, "k1").await.unwrap();

        // The issuer rotates to k2; the forced refetch picks it up.
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(testkeys::jwks_document("k2")))
            .mount(&server)
            .await;
        client.decoding_key(&issuer, "k2").await.unwrap();
    }

    #[tokio::test]
    async fn fetch_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let issuer = format!("{}/", server.uri());
        let client = JwksClient::new(Duration::from_secs(300));
        let err = client.decoding_key(&issuer, "k1").await.err().unwrap();
        assert!(matches!(err, AuthError::KeyFetch(_)));
    }
}
