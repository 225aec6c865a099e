use jsonwebtoken::{decode, decode_header, Algorithm, Validation};

use crate::claims::Claims;
use crate::error::AuthError;
use crate::jwks::JwksClient;

/// Verifies bearer tokens against the configured issuer and audience.
///
/// Accepts RS256 only. The token's declared key id selects the public key
/// from the issuer's key document; signature, audience, issuer and expiry
/// are all mandatory and the first failing check rejects the credential.
/// The issuer claim must equal the configured issuer exactly, trailing
/// slash included.
pub struct TokenVerifier {
    issuer: String,
    audience: String,
    keys: JwksClient,
}

impl TokenVerifier {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>, keys: JwksClient) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            keys,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header =
            decode_header(token).map_err(|e| AuthError::InvalidCredential(reason_for(&e)))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidCredential(format!(
                "unexpected signing algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidCredential("token header carries no key id".into()))?;

        let key = match self.keys.decoding_key(&self.issuer, &kid).await {
            Ok(key) => key,
            // A key id the issuer does not publish means the token cannot be
            // trusted; the caller must re-authenticate.
            Err(AuthError::KeyNotFound { kid }) => {
                return Err(AuthError::InvalidCredential(format!(
                    "token signed with unknown key id {kid}"
                )))
            }
            Err(other) => return Err(other),
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);

        let data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| AuthError::InvalidCredential(reason_for(&e)))?;
        Ok(data.claims)
    }
}

fn reason_for(err: &jsonwebtoken::errors::Error) -> String {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::InvalidAudience => "invalid audience".into(),
        ErrorKind::InvalidIssuer => "invalid issuer".into(),
        ErrorKind::ExpiredSignature => "token expired".into(),
        ErrorKind::InvalidSignature => "invalid signature".into(),
        ErrorKind::InvalidAlgorithm => "unexpected signing algorithm".into(),
        ErrorKind::InvalidToken => "malformed token".into(),
        other => format!("token rejected: {other:?}"),
    }
}
