//! E2E tests for the Google login flow and session endpoints

mod common;

use common::{TestServer, location_header, no_redirect_client, session_cookie, state_param};

#[tokio::test]
async fn test_home_page_is_public() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("response body");
    assert!(body.contains("Home Page"));
}

#[tokio::test]
async fn test_login_page_renders() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/login"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("response body");
    assert!(body.contains("Sign in with Google"));
}

#[tokio::test]
async fn test_user_page_redirects_anonymous_to_login_flow() {
    let server = TestServer::new().await;
    let client = no_redirect_client();

    let response = client
        .get(server.url("/user"))
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    assert_eq!(
        location_header(&response).as_deref(),
        Some("/auth/google")
    );
}

#[tokio::test]
async fn test_session_without_identity_is_anonymous() {
    let server = TestServer::new().await;
    let client = no_redirect_client();

    // Beginning a login creates a session, but until the handshake
    // completes the client is still treated exactly like one with no
    // session at all.
    let response = client
        .get(server.url("/auth/google"))
        .send()
        .await
        .expect("request succeeds");
    let cookie = session_cookie(&response).expect("session cookie set");

    let response = client
        .get(server.url("/user"))
        .header("Cookie", &cookie)
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    assert_eq!(
        location_header(&response).as_deref(),
        Some("/auth/google")
    );
}

#[tokio::test]
async fn test_google_redirect_sets_session_cookie_and_state() {
    let server = TestServer::new().await;
    let client = no_redirect_client();

    let response = client
        .get(server.url("/auth/google"))
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    let location = location_header(&response).expect("location header");
    assert!(location.starts_with(&format!("http://{}/authorize?", server.provider_addr)));
    assert!(location.contains("client_id=test-client-id"));
    assert!(location.contains("scope=profile+email"));
    assert!(location.contains("state="));

    let set_cookie = session_cookie(&response).expect("session cookie set");
    assert!(set_cookie.starts_with("session="));
}

#[tokio::test]
async fn test_full_login_flow_shows_identity() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let response = server
        .client
        .get(server.url("/user"))
        .header("Cookie", &cookie)
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("response body");
    assert!(body.contains("Test User"));
    assert!(body.contains("testuser@example.com"));
    assert!(body.contains("/logout"));
}

#[tokio::test]
async fn test_identity_is_restored_on_every_request() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    for _ in 0..3 {
        let response = server
            .client
            .get(server.url("/user"))
            .header("Cookie", &cookie)
            .send()
            .await
            .expect("request succeeds");

        assert_eq!(response.status(), 200);
        let body = response.text().await.expect("response body");
        assert!(body.contains("Test User"));
        assert!(body.contains("testuser@example.com"));
    }
}

#[tokio::test]
async fn test_callback_with_mismatched_state_redirects_to_failure_route() {
    let server = TestServer::new().await;
    let client = no_redirect_client();

    let response = client
        .get(server.url("/auth/google"))
        .send()
        .await
        .expect("request succeeds");
    let cookie = session_cookie(&response).expect("session cookie set");

    let response = client
        .get(server.url("/auth/google/callback?code=good-code&state=forged-state"))
        .header("Cookie", &cookie)
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    assert_eq!(location_header(&response).as_deref(), Some("/login"));

    // Session must be unchanged: still anonymous.
    let response = client
        .get(server.url("/user"))
        .header("Cookie", &cookie)
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(
        location_header(&response).as_deref(),
        Some("/auth/google")
    );
}

#[tokio::test]
async fn test_callback_without_session_redirects_to_failure_route() {
    let server = TestServer::new().await;
    let client = no_redirect_client();

    let response = client
        .get(server.url("/auth/google/callback?code=good-code&state=whatever"))
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    assert_eq!(location_header(&response).as_deref(), Some("/login"));
}

#[tokio::test]
async fn test_callback_with_provider_error_redirects_to_failure_route() {
    let server = TestServer::new().await;
    let client = no_redirect_client();

    let response = client
        .get(server.url("/auth/google/callback?error=access_denied"))
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    assert_eq!(location_header(&response).as_deref(), Some("/login"));
}

#[tokio::test]
async fn test_rejected_code_redirects_to_failure_route() {
    let server = TestServer::new().await;
    let client = no_redirect_client();

    let response = client
        .get(server.url("/auth/google"))
        .send()
        .await
        .expect("request succeeds");
    let cookie = session_cookie(&response).expect("session cookie set");
    let location = location_header(&response).expect("location header");
    let state = state_param(&location).expect("state param");

    let response = client
        .get(server.url(&format!(
            "/auth/google/callback?code=bad-code&state={state}"
        )))
        .header("Cookie", &cookie)
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    assert_eq!(location_header(&response).as_deref(), Some("/login"));

    let response = client
        .get(server.url("/user"))
        .header("Cookie", &cookie)
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(
        location_header(&response).as_deref(),
        Some("/auth/google")
    );
}

#[tokio::test]
async fn test_logout_destroys_session() {
    let server = TestServer::new().await;
    let client = no_redirect_client();
    let cookie = server.login().await;

    assert_eq!(server.state.sessions.len().await, 1);

    let response = client
        .get(server.url("/logout"))
        .header("Cookie", &cookie)
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    assert_eq!(location_header(&response).as_deref(), Some("/"));
    assert_eq!(server.state.sessions.len().await, 0);

    // Replaying the old cookie must not resurrect the session: the
    // record is gone server-side.
    let response = client
        .get(server.url("/user"))
        .header("Cookie", &cookie)
        .send()
        .await
        .expect("request succeeds");
    assert!(response.status().is_redirection());
    assert_eq!(
        location_header(&response).as_deref(),
        Some("/auth/google")
    );
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let server = TestServer::new().await;
    let client = no_redirect_client();
    let cookie = server.login().await;

    for _ in 0..2 {
        let response = client
            .get(server.url("/logout"))
            .header("Cookie", &cookie)
            .send()
            .await
            .expect("request succeeds");

        assert!(response.status().is_redirection());
        assert_eq!(location_header(&response).as_deref(), Some("/"));
    }
}

#[tokio::test]
async fn test_forged_session_cookie_is_ignored() {
    let server = TestServer::new().await;
    let client = no_redirect_client();

    let response = client
        .get(server.url("/user"))
        .header("Cookie", "session=forged-id.forged-signature")
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    assert_eq!(
        location_header(&response).as_deref(),
        Some("/auth/google")
    );
}
