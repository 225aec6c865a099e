use serde::{Deserialize, Serialize};

/// Claim set extracted from a verified bearer token.
///
/// Audience, issuer and expiry are enforced during decoding; only the fields
/// the platform consumes afterwards are kept here. Nothing in this struct is
/// populated before signature verification succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// External principal, unique per issuer.
    pub sub: String,
    /// Issuer URL, matched exactly against the configured issuer.
    pub iss: String,
    /// Expiry as a unix timestamp.
    pub exp: i64,
    /// Issued-at as a unix timestamp.
    #[serde(default)]
    pub iat: i64,
}

/// Resolved identity attached to one request or one long-lived connection.
///
/// Built once by the gateway's auth middleware (or a connection's init
/// payload) and immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    /// External principal asserted by the verified credential.
    pub principal: String,
    /// Internal account id; empty until the principal signs up.
    pub account_id: String,
    /// Account display name.
    pub name: String,
    /// Usernames the account's devices authenticate with.
    pub device_usernames: Vec<String>,
}

impl AuthContext {
    /// An empty account id is the "authenticated but not yet provisioned"
    /// state: the token verified but no account owns the principal yet.
    pub fn is_provisioned(&self) -> bool {
        !self.account_id.is_empty()
    }
}
