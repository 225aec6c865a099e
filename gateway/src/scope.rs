use auth_core::AuthContext;

/// Topic-pattern wildcard matching everything below a prefix.
pub const MATCH_ALL: &str = "#";
/// Pattern segment matching any single application.
pub const ANY_APPLICATION: &str = "+";

/// Tenant-scoped namespace patterns.
///
/// The namespace hierarchy is `account/application/topic...`. Every
/// downstream list/stream call filters by a pattern built here, and the only
/// constructor takes the already-verified [`AuthContext`]: there is no way
/// to build a scope for another tenant's account id. This is the
/// tenant-isolation enforcement point of the gateway.
#[derive(Debug, Clone, Copy)]
pub struct NamespaceScope<'a> {
    account_id: &'a str,
}

impl<'a> NamespaceScope<'a> {
    pub fn of(identity: &'a AuthContext) -> Self {
        Self {
            account_id: &identity.account_id,
        }
    }

    pub fn account_id(&self) -> &str {
        self.account_id
    }

    /// Pattern for topic queries, optionally pinned to one application.
    /// An absent or empty caller pattern matches everything.
    pub fn topics(&self, application_id: Option<&str>, pattern: Option<&str>) -> String {
        let pattern = match pattern {
            Some(p) if !p.is_empty() => p,
            _ => MATCH_ALL,
        };
        format!(
            "{}/{}/{}",
            self.account_id,
            application_id.unwrap_or(ANY_APPLICATION),
            pattern
        )
    }

    /// Everything the tenant owns.
    pub fn all_topics(&self) -> String {
        format!("{}/{}", self.account_id, MATCH_ALL)
    }

    /// Prefix a session mount point carries when it belongs to this tenant.
    pub fn session_prefix(&self) -> String {
        format!("{}/", self.account_id)
    }

    pub fn owns_session(&self, mount_point: &str) -> bool {
        mount_point.starts_with(&self.session_prefix())
    }

    pub fn owns_pattern(&self, pattern: &str) -> bool {
        pattern.starts_with(&self.session_prefix())
    }

    /// Client-facing name: the tenant prefix is an implementation detail
    /// and never leaves the gateway.
    pub fn strip<'n>(&self, name: &'n str) -> &'n str {
        name.strip_prefix(&self.session_prefix()).unwrap_or(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(account_id: &str) -> AuthContext {
        AuthContext {
            principal: "user-42".into(),
            account_id: account_id.into(),
            name: "user@example.net".into(),
            device_usernames: vec![],
        }
    }

    #[test]
    fn every_pattern_is_tenant_prefixed() {
        let identity = identity("acc-1");
        let scope = NamespaceScope::of(&identity);

        for pattern in [
            scope.all_topics(),
            scope.topics(None, None),
            scope.topics(Some("app-7"), Some("sensors/#")),
            scope.topics(None, Some("sensors/+/temperature")),
        ] {
            assert!(
                pattern.starts_with("acc-1/"),
                "pattern {pattern:?} escapes the tenant namespace"
            );
        }
    }

    #[test]
    fn caller_pattern_cannot_claim_another_tenant() {
        let identity = identity("acc-1");
        let scope = NamespaceScope::of(&identity);

        // A hostile caller naming another tenant's id only narrows their own
        // namespace further.
        let pattern = scope.topics(None, Some("acc-2/#"));
        assert_eq!(pattern, "acc-1/+/acc-2/#");
    }

    #[test]
    fn empty_pattern_defaults_to_match_all() {
        let identity = identity("acc-1");
        let scope = NamespaceScope::of(&identity);
        assert_eq!(scope.topics(None, Some("")), "acc-1/+/#");
        assert_eq!(scope.topics(None, None), "acc-1/+/#");
    }

    #[test]
    fn application_pinning() {
        let identity = identity("acc-1");
        let scope = NamespaceScope::of(&identity);
        assert_eq!(scope.topics(Some("app-7"), None), "acc-1/app-7/#");
    }

    #[test]
    fn session_ownership() {
        let identity = identity("acc-1");
        let scope = NamespaceScope::of(&identity);
        assert!(scope.owns_session("acc-1/app-7"));
        assert!(!scope.owns_session("acc-10/app-7"));
        assert!(!scope.owns_session("acc-2/acc-1"));
    }

    #[test]
    fn strip_removes_only_the_tenant_prefix() {
        let identity = identity("acc-1");
        let scope = NamespaceScope::of(&identity);
        assert_eq!(scope.strip("acc-1/app-7/sensors"), "app-7/sensors");
        assert_eq!(scope.strip("other/app-7"), "other/app-7");
    }
}
