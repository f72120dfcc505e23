//! Login, logout, remember-me, switch-user and access rules through the full router.

mod common;

use axum::http::{Method, StatusCode};
use common::*;
use user::UserRepository;

#[tokio::test]
async fn test_login_redirects_by_role() {
    let state = state().await;
    create_user(&state, "user@test.fr", &[]).await;
    create_user(&state, "admin@test.fr", &["ROLE_ADMIN"]).await;
    create_user(&state, "super@test.fr", &["ROLE_SUPER_ADMIN"]).await;

    for (email, expected) in [
        ("user@test.fr", "/author"),
        ("admin@test.fr", "/admin/dashboard"),
        ("super@test.fr", "/admin/dashboard"),
    ] {
        let mut client = Client::new(&state);
        let response = client.login(email).await;
        assert!(is_redirect(&response), "{}", email);
        assert_eq!(location(&response), expected, "{}", email);
    }
}

#[tokio::test]
async fn test_login_is_case_insensitive_on_email() {
    let state = state().await;
    create_user(&state, "admin@test.fr", &["ROLE_ADMIN"]).await;

    let mut client = Client::new(&state);
    let response = client.login("Admin@Test.FR").await;
    assert_eq!(location(&response), "/admin/dashboard");
}

#[tokio::test]
async fn test_anonymous_is_sent_to_login_then_back() {
    let state = state().await;
    create_user(&state, "admin@test.fr", &["ROLE_ADMIN"]).await;
    let mut client = Client::new(&state);

    let response = client.get("/admin/article?page=2").await;
    assert!(is_redirect(&response));
    assert_eq!(location(&response), "/login");

    let response = client.login("admin@test.fr").await;
    assert_eq!(location(&response), "/admin/article?page=2");

    // The stored path is consumed by the first login
    let response = client.get("/admin/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = client.login("admin@test.fr").await;
    assert_eq!(location(&response), "/admin/dashboard");
}

#[tokio::test]
async fn test_invalid_credentials() {
    let state = state().await;
    create_user(&state, "user@test.fr", &[]).await;
    let mut client = Client::new(&state);

    let response = client.login_with("user@test.fr", "wrong-password", false).await;
    assert_eq!(location(&response), "/login");

    let page = json(client.get("/login").await).await;
    assert_eq!(page["last_username"], "user@test.fr");
    assert_eq!(page["flashes"][0]["message"], "Invalid credentials.");

    let response = client.get("/author").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_login_requires_csrf_token() {
    let state = state().await;
    create_user(&state, "user@test.fr", &[]).await;
    let mut client = Client::new(&state);
    client.get("/login").await;

    let response = client
        .post_form("/login", "email=user@test.fr&password=password123&_csrf_token=forged")
        .await;
    assert_eq!(location(&response), "/login");
    assert_eq!(
        client.flashes("/login").await,
        vec![("danger".to_string(), "Invalid CSRF token.".to_string())]
    );
}

#[tokio::test]
async fn test_admin_area_access() {
    let state = state().await;
    create_user(&state, "user@test.fr", &[]).await;
    create_user(&state, "admin@test.fr", &["ROLE_ADMIN"]).await;

    let mut anonymous = Client::new(&state);
    let response = anonymous.get("/admin/dashboard").await;
    assert_eq!(location(&response), "/login");

    let mut user = Client::new(&state);
    user.login("user@test.fr").await;
    assert_eq!(user.get("/author").await.status(), StatusCode::OK);
    let response = user.get("/admin/dashboard").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json(response).await["error"]["message"], "Access Denied.");

    let mut admin = Client::new(&state);
    admin.login("admin@test.fr").await;
    let response = admin.get("/admin").await;
    assert_eq!(location(&response), "/admin/dashboard");
    let dashboard = json(admin.get("/admin/dashboard").await).await;
    assert_eq!(dashboard["users"], 2);
    assert_eq!(dashboard["user"]["email"], "admin@test.fr");
}

#[tokio::test]
async fn test_logout() {
    let state = state().await;
    create_user(&state, "user@test.fr", &[]).await;
    let mut client = Client::new(&state);
    client.login("user@test.fr").await;

    let response = client.get("/logout").await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = client.post_form("/logout", "_csrf_token=forged").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(client.get("/author").await.status(), StatusCode::OK);

    let token = client.csrf("logout").await;
    let response = client
        .post_form("/logout", &format!("_csrf_token={}", token))
        .await;
    assert_eq!(location(&response), "/");

    let response = client.get("/author").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_remember_me_restores_a_partial_login() {
    let state = state().await;
    create_user(&state, "admin@test.fr", &["ROLE_ADMIN"]).await;
    let mut client = Client::new(&state);

    client.login_with("admin@test.fr", PASSWORD, true).await;
    let first_cookie = client.cookies.get("INKLOG_REMEMBERME").cloned().unwrap();

    // Browser restart: the session cookie is gone
    client.cookies.remove("inklog_session");
    let response = client.get("/author").await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = client.cookies.get("INKLOG_REMEMBERME").cloned().unwrap();
    assert_ne!(rotated, first_cookie);

    // A remembered login is not enough for the back office
    let response = client.get("/admin/dashboard").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_stolen_remember_me_cookie_is_revoked() {
    let mut config = session_config();
    config.remember_me_rotation_grace_seconds = 0;
    let state = state_with(config).await;
    create_user(&state, "user@test.fr", &[]).await;
    let mut victim = Client::new(&state);
    victim.login_with("user@test.fr", PASSWORD, true).await;
    let stolen = victim.cookies.get("INKLOG_REMEMBERME").cloned().unwrap();

    let mut thief = Client::new(&state);
    thief.cookies.insert("INKLOG_REMEMBERME".to_string(), stolen.clone());
    assert_eq!(thief.get("/author").await.status(), StatusCode::OK);

    // The original token was rotated away; replaying it revokes the series
    let mut replay = Client::new(&state);
    replay.cookies.insert("INKLOG_REMEMBERME".to_string(), stolen);
    let response = replay.get("/author").await;
    assert_eq!(location(&response), "/login");
    assert!(!replay.cookies.contains_key("INKLOG_REMEMBERME"));
}

#[tokio::test]
async fn test_parallel_requests_share_a_remember_me_cookie() {
    let state = state().await;
    create_user(&state, "user@test.fr", &[]).await;
    let mut client = Client::new(&state);
    client.login_with("user@test.fr", PASSWORD, true).await;
    let cookie = client.cookies.get("INKLOG_REMEMBERME").cloned().unwrap();

    // Two tabs restored at once, both still carrying the first cookie
    let mut first_tab = Client::new(&state);
    first_tab.cookies.insert("INKLOG_REMEMBERME".to_string(), cookie.clone());
    let mut second_tab = Client::new(&state);
    second_tab.cookies.insert("INKLOG_REMEMBERME".to_string(), cookie.clone());

    assert_eq!(first_tab.get("/author").await.status(), StatusCode::OK);
    assert_ne!(first_tab.cookies["INKLOG_REMEMBERME"], cookie);
    assert_eq!(second_tab.get("/author").await.status(), StatusCode::OK);
    assert_eq!(second_tab.cookies["INKLOG_REMEMBERME"], cookie);

    // The rotated cookie keeps working
    first_tab.cookies.remove("inklog_session");
    assert_eq!(first_tab.get("/author").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_switch_user() {
    let state = state().await;
    let admin = create_user(&state, "admin@test.fr", &["ROLE_ADMIN"]).await;
    create_user(&state, "bob@test.fr", &[]).await;
    let mut client = Client::new(&state);
    client.login("admin@test.fr").await;

    let response = client.get("/author?_switch_user=bob@test.fr").await;
    assert_eq!(location(&response), "/author");

    let page = json(client.get("/author").await).await;
    assert_eq!(page["user"]["email"], "bob@test.fr");
    assert_eq!(page["impersonator_id"], admin.id.unwrap());

    // Bob may not switch any further
    let response = client.get("/author?_switch_user=admin@test.fr").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client.get("/author?_switch_user=_exit").await;
    assert_eq!(location(&response), "/author");
    let page = json(client.get("/author").await).await;
    assert_eq!(page["user"]["email"], "admin@test.fr");
    assert!(page["impersonator_id"].is_null());
}

#[tokio::test]
async fn test_switch_user_is_refused() {
    let state = state().await;
    create_user(&state, "admin@test.fr", &["ROLE_ADMIN"]).await;
    create_user(&state, "super@test.fr", &["ROLE_SUPER_ADMIN"]).await;
    create_user(&state, "bob@test.fr", &[]).await;

    let mut bob = Client::new(&state);
    bob.login("bob@test.fr").await;
    let response = bob.get("/author?_switch_user=admin@test.fr").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let mut admin = Client::new(&state);
    admin.login("admin@test.fr").await;
    let response = admin.get("/author?_switch_user=nobody@test.fr").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Super administrators switch too, but not twice
    let mut root = Client::new(&state);
    root.login("super@test.fr").await;
    root.get("/author?_switch_user=admin@test.fr").await;
    let response = root.get("/author?_switch_user=bob@test.fr").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        json(response).await["error"]["message"],
        "You are already switched to another user."
    );

    let mut anonymous = Client::new(&state);
    let response = anonymous.get("/author?_switch_user=bob@test.fr").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_admin_cannot_switch_to_a_super_admin() {
    let state = state().await;
    create_user(&state, "admin@test.fr", &["ROLE_ADMIN"]).await;
    create_user(&state, "root@test.fr", &["ROLE_SUPER_ADMIN"]).await;
    let other_root = create_user(&state, "root2@test.fr", &["ROLE_SUPER_ADMIN"]).await;

    let mut admin = Client::new(&state);
    admin.login("admin@test.fr").await;
    let response = admin.get("/admin/dashboard?_switch_user=root@test.fr").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Still acting as the administrator, who may not delete a super admin
    let dashboard = json(admin.get("/admin/dashboard").await).await;
    assert_eq!(dashboard["user"]["email"], "admin@test.fr");
    let id = other_root.id.unwrap();
    let token = admin.csrf(&format!("delete{}", id)).await;
    let response = admin
        .send_json(
            Method::DELETE,
            &format!("/admin/user/{}/delete", id),
            serde_json::json!({ "_token": token }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(state.users.database().find_by_id(id).await.unwrap().is_some());

    // Administrators of the same rank may switch to each other
    create_user(&state, "admin2@test.fr", &["ROLE_ADMIN"]).await;
    let response = admin.get("/admin/dashboard?_switch_user=admin2@test.fr").await;
    assert_eq!(location(&response), "/admin/dashboard");
}

#[tokio::test]
async fn test_password_change_ends_other_sessions() {
    let state = state().await;
    create_user(&state, "admin@test.fr", &["ROLE_ADMIN"]).await;
    let bob = create_user(&state, "bob@test.fr", &[]).await;

    let mut bob_client = Client::new(&state);
    bob_client.login_with("bob@test.fr", PASSWORD, true).await;
    assert!(bob_client.cookies.contains_key("INKLOG_REMEMBERME"));
    assert_eq!(bob_client.get("/author").await.status(), StatusCode::OK);
    let old_cookie = bob_client.cookies["INKLOG_REMEMBERME"].clone();

    let mut admin = Client::new(&state);
    admin.login("admin@test.fr").await;
    let token = admin.csrf("user").await;
    let response = admin
        .send_json(
            Method::POST,
            &format!("/admin/user/{}/edit", bob.id.unwrap()),
            serde_json::json!({
                "email": "bob@test.fr",
                "username": "bob",
                "password": "a-new-password",
                "password_confirmation": "a-new-password",
                "_token": token,
            }),
        )
        .await;
    assert_eq!(location(&response), "/admin/user");

    let response = bob_client.get("/author").await;
    assert_eq!(location(&response), "/login");
    assert!(!bob_client.cookies.contains_key("INKLOG_REMEMBERME"));
    let response = bob_client.get("/author").await;
    assert_eq!(location(&response), "/login");

    // The cookie issued before the change does not log in anywhere else
    let mut elsewhere = Client::new(&state);
    elsewhere
        .cookies
        .insert("INKLOG_REMEMBERME".to_string(), old_cookie);
    let response = elsewhere.get("/author").await;
    assert_eq!(location(&response), "/login");

    let response = bob_client.login_with("bob@test.fr", "a-new-password", false).await;
    assert_eq!(location(&response), "/author");
}
