//! Tests for the firewall helpers that do not need a running router.

#[cfg(test)]
mod tests {
    use super::super::middleware_hooks::*;
    use authz::RoleSet;
    use axum::http::{header, HeaderMap, HeaderValue, Uri};
    use rstest::rstest;
    use user::{AuthLevel, AuthState, SessionConfig, SessionToken, User};

    fn state(roles: &[&str], level: AuthLevel) -> AuthState {
        let mut user = User::new("alice@test.fr", "Miss Alice");
        user.id = Some(1);
        user.roles = RoleSet::parse(roles.iter().copied()).unwrap();
        AuthState::Authenticated {
            user,
            token: SessionToken::new(1, level),
        }
    }

    #[rstest]
    #[case("/admin", AccessRule::AdminFullyAuthenticated)]
    #[case("/admin/dashboard", AccessRule::AdminFullyAuthenticated)]
    #[case("/admin/user/3/edit", AccessRule::AdminFullyAuthenticated)]
    #[case("/author", AccessRule::Authenticated)]
    #[case("/login", AccessRule::Public)]
    #[case("/", AccessRule::Public)]
    #[case("/health", AccessRule::Public)]
    fn test_access_rule_for_path(#[case] path: &str, #[case] expected: AccessRule) {
        assert_eq!(AccessRule::for_path(path), expected);
    }

    #[test]
    fn test_admin_rule_needs_full_login() {
        let rule = AccessRule::AdminFullyAuthenticated;
        assert!(rule.allows(&state(&["ROLE_ADMIN"], AuthLevel::Full)));
        assert!(rule.allows(&state(&["ROLE_SUPER_ADMIN"], AuthLevel::Full)));
        assert!(!rule.allows(&state(&["ROLE_ADMIN"], AuthLevel::Remembered)));
        assert!(!rule.allows(&state(&[], AuthLevel::Full)));
        assert!(!rule.allows(&AuthState::Anonymous));
    }

    #[test]
    fn test_author_rule_accepts_remembered_login() {
        let rule = AccessRule::Authenticated;
        assert!(rule.allows(&state(&[], AuthLevel::Remembered)));
        assert!(rule.allows(&state(&["ROLE_ADMIN"], AuthLevel::Full)));
        assert!(!rule.allows(&AuthState::Anonymous));
        assert!(AccessRule::Public.allows(&AuthState::Anonymous));
    }

    #[rstest]
    #[case("/author?_switch_user=bob@test.fr", Some("bob@test.fr"))]
    #[case("/author?page=2&_switch_user=_exit", Some("_exit"))]
    #[case("/author?_switch_user=", None)]
    #[case("/author?page=2", None)]
    #[case("/author", None)]
    fn test_switch_user_param(#[case] uri: &str, #[case] expected: Option<&str>) {
        let uri: Uri = uri.parse().unwrap();
        assert_eq!(switch_user_param(&uri).as_deref(), expected);
    }

    #[rstest]
    #[case("/author?_switch_user=bob@test.fr", "/author")]
    #[case("/admin/article?page=2&_switch_user=_exit", "/admin/article?page=2")]
    #[case("/?a=1&_switch_user=x&b=2", "/?a=1&b=2")]
    fn test_strip_switch_user(#[case] uri: &str, #[case] expected: &str) {
        let uri: Uri = uri.parse().unwrap();
        assert_eq!(strip_switch_user(&uri), expected);
    }

    #[test]
    fn test_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.append(
            header::COOKIE,
            HeaderValue::from_static("id=abc; INKLOG_REMEMBERME=series:token"),
        );
        assert_eq!(
            cookie_value(&headers, "INKLOG_REMEMBERME").as_deref(),
            Some("series:token")
        );
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_remember_me_cookies() {
        let config = SessionConfig::with_secret(vec![1; 32]);
        let set = remember_me_cookie(&config, "series:token").unwrap();
        let set = set.to_str().unwrap();
        assert!(set.starts_with(&format!("{}=series:token", config.remember_me_cookie)));
        assert!(set.contains("HttpOnly"));
        assert!(set.contains("Path=/"));

        let cleared = clear_remember_me_cookie(&config).unwrap();
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
    }

    fn account(roles: &[&str]) -> User {
        let mut user = User::new("someone@test.fr", "someone");
        user.roles = RoleSet::parse(roles.iter().copied()).unwrap();
        user
    }

    #[rstest]
    #[case(&["ROLE_ADMIN"], &[], true)]
    #[case(&["ROLE_ADMIN"], &["ROLE_ADMIN"], true)]
    #[case(&["ROLE_ADMIN"], &["ROLE_SUPER_ADMIN"], false)]
    #[case(&["ROLE_SUPER_ADMIN"], &["ROLE_SUPER_ADMIN"], true)]
    #[case(&["ROLE_SUPER_ADMIN"], &["ROLE_ADMIN"], true)]
    #[case(&[], &[], false)]
    fn test_may_impersonate(
        #[case] actor: &[&str],
        #[case] target: &[&str],
        #[case] expected: bool,
    ) {
        assert_eq!(may_impersonate(&account(actor), &account(target)), expected);
    }
}
