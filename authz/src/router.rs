//! Post-authentication redirect selection.
//!
//! When an anonymous visitor hits a protected page the firewall stores the
//! requested path under a realm-scoped session key and sends the visitor to
//! the login form. After a successful login the router consumes that path (if
//! any) and otherwise falls back to a landing page chosen by role.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::types::Role;

/// Realm used when the application runs a single firewall.
pub const DEFAULT_REALM: &str = "main";

/// Session key holding the stored target path for `realm`.
pub fn target_path_key(realm: &str) -> String {
    format!("_security.{}.target_path", realm)
}

/// Storage for the per-realm "return-to" path.
///
/// Implemented over the HTTP session by the user crate and over a plain map
/// in tests.
#[async_trait]
pub trait TargetPathStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Removes and returns the stored path. A second call returns `None`.
    async fn take_target_path(&self, realm: &str) -> Result<Option<String>, Self::Error>;

    /// Stores `path`, replacing any previous value.
    async fn save_target_path(&self, realm: &str, path: &str) -> Result<(), Self::Error>;
}

/// Where to send a freshly authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedirectTarget {
    /// The path the visitor originally asked for.
    Stored(String),
    AdminDashboard,
    AuthorHome,
    /// Fallback for principals without even the baseline grant.
    PublicHome,
}

impl RedirectTarget {
    pub const ADMIN_DASHBOARD_PATH: &'static str = "/admin/dashboard";
    pub const AUTHOR_HOME_PATH: &'static str = "/author";
    pub const PUBLIC_HOME_PATH: &'static str = "/";

    /// The URL path to redirect to.
    pub fn path(&self) -> &str {
        match self {
            RedirectTarget::Stored(path) => path,
            RedirectTarget::AdminDashboard => Self::ADMIN_DASHBOARD_PATH,
            RedirectTarget::AuthorHome => Self::AUTHOR_HOME_PATH,
            RedirectTarget::PublicHome => Self::PUBLIC_HOME_PATH,
        }
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Picks the post-login destination for one firewall realm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostAuthenticationRouter {
    realm: String,
}

impl PostAuthenticationRouter {
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
        }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Chooses a destination from an already-consumed stored path.
    ///
    /// An empty stored path counts as absent.
    pub fn resolve<F>(&self, stored: Option<String>, is_granted: F) -> RedirectTarget
    where
        F: Fn(Role) -> bool,
    {
        match stored {
            Some(path) if !path.is_empty() => RedirectTarget::Stored(path),
            _ if is_granted(Role::Admin) => RedirectTarget::AdminDashboard,
            _ if is_granted(Role::User) => RedirectTarget::AuthorHome,
            _ => RedirectTarget::PublicHome,
        }
    }

    /// Consumes the stored path for this realm and chooses a destination.
    pub async fn route_after_login<S, F>(
        &self,
        store: &S,
        is_granted: F,
    ) -> Result<RedirectTarget, S::Error>
    where
        S: TargetPathStore + ?Sized,
        F: Fn(Role) -> bool + Send,
    {
        let stored = store.take_target_path(&self.realm).await?;
        let target = self.resolve(stored, is_granted);
        debug!("Post-login redirect for realm '{}': {}", self.realm, target);
        Ok(target)
    }
}

impl Default for PostAuthenticationRouter {
    fn default() -> Self {
        Self::new(DEFAULT_REALM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Principal, RoleSet};
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapStore {
        values: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl TargetPathStore for MapStore {
        type Error = Infallible;

        async fn take_target_path(&self, realm: &str) -> Result<Option<String>, Infallible> {
            Ok(self.values.lock().unwrap().remove(&target_path_key(realm)))
        }

        async fn save_target_path(&self, realm: &str, path: &str) -> Result<(), Infallible> {
            self.values
                .lock()
                .unwrap()
                .insert(target_path_key(realm), path.to_string());
            Ok(())
        }
    }

    fn grants(roles: &RoleSet) -> impl Fn(Role) -> bool + Send + '_ {
        move |role| roles.grants(role)
    }

    #[test]
    fn test_key_format() {
        assert_eq!(target_path_key("main"), "_security.main.target_path");
        assert_eq!(target_path_key("admin"), "_security.admin.target_path");
    }

    #[test]
    fn test_resolve_prefers_stored_path() {
        let router = PostAuthenticationRouter::default();
        let roles = RoleSet::from_roles([Role::SuperAdmin]);
        let target = router.resolve(Some("/admin/article/7/edit".to_string()), grants(&roles));
        assert_eq!(target, RedirectTarget::Stored("/admin/article/7/edit".to_string()));
        assert_eq!(target.path(), "/admin/article/7/edit");
    }

    #[test]
    fn test_resolve_by_role() {
        let router = PostAuthenticationRouter::default();

        let admin = RoleSet::from_roles([Role::Admin]);
        assert_eq!(router.resolve(None, grants(&admin)), RedirectTarget::AdminDashboard);

        let super_admin = RoleSet::from_roles([Role::SuperAdmin]);
        assert_eq!(
            router.resolve(None, grants(&super_admin)),
            RedirectTarget::AdminDashboard
        );

        let user = RoleSet::new();
        assert_eq!(router.resolve(None, grants(&user)), RedirectTarget::AuthorHome);
        assert_eq!(
            router.resolve(Some(String::new()), grants(&user)),
            RedirectTarget::AuthorHome
        );
    }

    #[test]
    fn test_resolve_without_any_grant() {
        let router = PostAuthenticationRouter::default();
        let target = router.resolve(None, |_| false);
        assert_eq!(target, RedirectTarget::PublicHome);
        assert_eq!(target.to_string(), "/");
    }

    #[tokio::test]
    async fn test_stored_path_is_consumed_once() {
        let store = MapStore::default();
        let router = PostAuthenticationRouter::default();
        let user = Principal::persisted(3, []);

        store.save_target_path(DEFAULT_REALM, "/author").await.unwrap();

        let first = router
            .route_after_login(&store, |role| user.is_granted(role))
            .await
            .unwrap();
        assert_eq!(first, RedirectTarget::Stored("/author".to_string()));

        let second = router
            .route_after_login(&store, |role| user.is_granted(role))
            .await
            .unwrap();
        assert_eq!(second, RedirectTarget::AuthorHome);
    }

    #[tokio::test]
    async fn test_realms_do_not_share_paths() {
        let store = MapStore::default();
        store.save_target_path("other", "/admin/tag").await.unwrap();

        let router = PostAuthenticationRouter::new("main");
        let admin = Principal::persisted(1, [Role::Admin]);
        let target = router
            .route_after_login(&store, |role| admin.is_granted(role))
            .await
            .unwrap();
        assert_eq!(target, RedirectTarget::AdminDashboard);

        let other = PostAuthenticationRouter::new("other");
        assert_eq!(other.realm(), "other");
        let target = other
            .route_after_login(&store, |role| admin.is_granted(role))
            .await
            .unwrap();
        assert_eq!(target.path(), "/admin/tag");
    }
}
