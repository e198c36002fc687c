//! Flow tests driving the three CAS routes end to end, with the CAS
//! server stubbed out.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::{TestResponse, TestServer};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sso_identity_core::{
    MemoryMessageStore, MemorySessionStore, MessageLevel, MessageStore, ProviderRegistry,
    SessionStore,
};
use sso_identity_session::{
    AccountConfig, AccountService, SESSION_ACCOUNT_USER_KEY,
};

use crate::{
    CAS_PROVIDER_SESSION_KEY, CasLogoutListener, CasProvider, CasProviderConfig, CasState,
    CasVersion, router,
};

const BASE_URL: &str = "http://testserver";
const SERVICE_URL: &str = "http://testserver/accounts/theid/login/callback/";

const SUCCESS_XML: &str = r#"
    <cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
        <cas:authenticationSuccess>
            <cas:user>username</cas:user>
        </cas:authenticationSuccess>
    </cas:serviceResponse>
"#;

const FAILURE_XML: &str = r#"
    <cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
        <cas:authenticationFailure code="INVALID_TICKET">
            Ticket not recognized
        </cas:authenticationFailure>
    </cas:serviceResponse>
"#;

fn state_with(config: CasProviderConfig) -> CasState {
    let mut registry = ProviderRegistry::new();
    registry.register(CasProvider::new(config));

    CasState {
        base_url: BASE_URL.to_string(),
        registry: Arc::new(registry),
        session: Arc::new(MemorySessionStore::new()),
        accounts: Arc::new(AccountService::new(AccountConfig::default())),
    }
}

fn provider_config(server_url: &str) -> CasProviderConfig {
    CasProviderConfig::new("theid", "The Provider", server_url, CasVersion::V2)
}

fn test_server(state: &CasState) -> TestServer {
    TestServer::new(router(state.clone())).unwrap()
}

fn location(response: &TestResponse) -> String {
    response
        .header("location")
        .to_str()
        .expect("location header is valid UTF-8")
        .to_string()
}

fn query_map(url: &str) -> HashMap<String, String> {
    Url::parse(url)
        .unwrap()
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Stub CAS server accepting exactly the ticket `123456`.
async fn mock_cas_server() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/serviceValidate"))
        .and(query_param("ticket", "123456"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SUCCESS_XML))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/serviceValidate"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FAILURE_XML))
        .with_priority(2)
        .mount(&server)
        .await;

    server
}

fn assert_login_failure(response: TestResponse) {
    response.assert_status(StatusCode::OK);
    let body = response.text();
    assert!(
        body.contains("<h1>Social Network Login Failure</h1>"),
        "expected the generic failure page, got: {body}"
    );
}

#[tokio::test]
async fn login_redirects_to_cas_server() {
    let state = state_with(provider_config("https://server.cas"));
    let server = test_server(&state);

    let response = server.get("/accounts/theid/login/").await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "https://server.cas/login?service=http%3A%2F%2Ftestserver%2Faccounts%2Ftheid%2Flogin%2Fcallback%2F",
    );
}

#[tokio::test]
async fn login_keeps_next_on_service_url() {
    let state = state_with(provider_config("https://server.cas"));
    let server = test_server(&state);

    let response = server
        .get("/accounts/theid/login/")
        .add_query_param("next", "/path/")
        .await;

    let params = query_map(&location(&response));
    assert_eq!(
        params.get("service").map(String::as_str),
        Some("http://testserver/accounts/theid/login/callback/?next=%2Fpath%2F"),
    );
}

#[tokio::test]
async fn login_requests_renew_once_session_used_cas() {
    let state = state_with(provider_config("https://server.cas"));
    let server = test_server(&state);

    // Anonymous session: single sign-on stays available.
    let response = server.get("/accounts/theid/login/").await;
    assert!(!query_map(&location(&response)).contains_key("renew"));

    // Already authenticated through a CAS provider: re-prompt.
    state
        .session
        .set(CAS_PROVIDER_SESSION_KEY, "theid".to_string())
        .await
        .unwrap();

    let response = server.get("/accounts/theid/login/").await;
    assert_eq!(
        query_map(&location(&response)).get("renew").map(String::as_str),
        Some("true"),
    );
}

#[tokio::test]
async fn login_forwards_static_and_dynamic_auth_params() {
    let state = state_with(
        provider_config("https://server.cas").with_auth_param("key", "value"),
    );
    let server = test_server(&state);

    let response = server
        .get("/accounts/theid/login/")
        .add_query_param("auth_params", "locale=fr")
        .await;

    let params = query_map(&location(&response));
    assert_eq!(params.get("key").map(String::as_str), Some("value"));
    assert_eq!(params.get("locale").map(String::as_str), Some("fr"));
}

#[tokio::test]
async fn login_dynamic_params_cannot_shadow_service() {
    let state = state_with(provider_config("https://server.cas"));
    let server = test_server(&state);

    let response = server
        .get("/accounts/theid/login/")
        .add_query_param("auth_params", "service=https://evil.net/&renew=false")
        .await;

    let params = query_map(&location(&response));
    assert_eq!(params.get("service").map(String::as_str), Some(SERVICE_URL));
    assert!(!params.contains_key("renew"));
}

#[tokio::test]
async fn callback_with_valid_ticket_logs_user_in() {
    let cas = mock_cas_server().await;
    let state = state_with(provider_config(&cas.uri()));
    let server = test_server(&state);

    let response = server
        .get("/accounts/theid/login/callback/")
        .add_query_param("ticket", "123456")
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/accounts/profile/");

    assert_eq!(
        state
            .session
            .get(CAS_PROVIDER_SESSION_KEY)
            .await
            .unwrap()
            .as_deref(),
        Some("theid"),
    );
    assert_eq!(
        state
            .session
            .get(SESSION_ACCOUNT_USER_KEY)
            .await
            .unwrap()
            .as_deref(),
        Some("username"),
    );
}

#[tokio::test]
async fn callback_with_invalid_ticket_renders_failure_page() {
    let cas = mock_cas_server().await;
    let state = state_with(provider_config(&cas.uri()));
    let server = test_server(&state);

    let response = server
        .get("/accounts/theid/login/callback/")
        .add_query_param("ticket", "000000")
        .await;

    assert_login_failure(response);
    assert_eq!(
        state.session.get(CAS_PROVIDER_SESSION_KEY).await.unwrap(),
        None,
    );
}

#[tokio::test]
async fn callback_without_ticket_renders_failure_page() {
    // No CAS exchange happens at all; the request dies before any
    // network call.
    let state = state_with(provider_config("https://server.cas"));
    let server = test_server(&state);

    let response = server.get("/accounts/theid/login/callback/").await;

    assert_login_failure(response);
    assert_eq!(
        state.session.get(CAS_PROVIDER_SESSION_KEY).await.unwrap(),
        None,
    );
}

#[tokio::test]
async fn callback_validates_with_matching_service_url() {
    // The validation request must carry the same service URL the login
    // leg sent, including `next`.
    let cas = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/serviceValidate"))
        .and(query_param("ticket", "123456"))
        .and(query_param(
            "service",
            "http://testserver/accounts/theid/login/callback/?next=%2Fnext%2F",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(SUCCESS_XML))
        .mount(&cas)
        .await;

    let state = state_with(provider_config(&cas.uri()));
    let server = test_server(&state);

    let response = server
        .get("/accounts/theid/login/callback/")
        .add_query_param("ticket", "123456")
        .add_query_param("next", "/next/")
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/next/");
}

#[tokio::test]
async fn callback_ignores_unsafe_next() {
    let cas = mock_cas_server().await;
    let state = state_with(provider_config(&cas.uri()));
    let server = test_server(&state);

    let response = server
        .get("/accounts/theid/login/callback/")
        .add_query_param("ticket", "123456")
        .add_query_param("next", "https://evil.net/")
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/accounts/profile/");
}

#[tokio::test]
async fn logout_redirects_to_cas_server() {
    let state = state_with(provider_config("https://server.cas"));
    let server = test_server(&state);

    let response = server.get("/accounts/theid/logout/").await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "https://server.cas/logout?url=http%3A%2F%2Ftestserver%2F",
    );
}

#[tokio::test]
async fn logout_carries_next_as_redirect_target() {
    let state = state_with(provider_config("https://server.cas"));
    let server = test_server(&state);

    let response = server
        .get("/accounts/theid/logout/")
        .add_query_param("next", "/path/")
        .await;

    assert_eq!(
        location(&response),
        "https://server.cas/logout?url=http%3A%2F%2Ftestserver%2Fpath%2F",
    );
}

#[tokio::test]
async fn unknown_provider_is_not_found() {
    let state = state_with(provider_config("https://server.cas"));
    let server = test_server(&state);

    let response = server.get("/accounts/unknown/login/").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn logout_flow_queues_cas_notice() {
    // Full journey: CAS login through the callback, then application
    // logout with the CAS listener registered.
    let cas = mock_cas_server().await;
    let state = state_with(
        provider_config(&cas.uri()).with_logout_message(MessageLevel::Warning),
    );
    let server = test_server(&state);

    server
        .get("/accounts/theid/login/callback/")
        .add_query_param("ticket", "123456")
        .await
        .assert_status(StatusCode::SEE_OTHER);

    let mut accounts = AccountService::new(AccountConfig::default());
    accounts.add_logout_listener(Arc::new(CasLogoutListener::new(state.registry.clone())));
    let messages = MemoryMessageStore::new();

    let redirect = accounts
        .logout(state.session.as_ref(), &messages, Some("/redir/"))
        .await
        .unwrap();
    assert_eq!(redirect, "/redir/");

    let queued = messages.drain().await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].level, MessageLevel::Warning);
    assert_eq!(
        queued[0].body,
        "To logout of The Provider, please close your browser, or visit this \
         <a href=\"/accounts/theid/logout/?next=%2Fredir%2F\">link</a>.",
    );

    // The session ended with the logout.
    assert_eq!(
        state.session.get(CAS_PROVIDER_SESSION_KEY).await.unwrap(),
        None,
    );
}

#[tokio::test]
async fn logout_flow_is_silent_without_message_flag() {
    let cas = mock_cas_server().await;
    let state = state_with(provider_config(&cas.uri()));
    let server = test_server(&state);

    server
        .get("/accounts/theid/login/callback/")
        .add_query_param("ticket", "123456")
        .await
        .assert_status(StatusCode::SEE_OTHER);

    let mut accounts = AccountService::new(AccountConfig::default());
    accounts.add_logout_listener(Arc::new(CasLogoutListener::new(state.registry.clone())));
    let messages = MemoryMessageStore::new();

    accounts
        .logout(state.session.as_ref(), &messages, None)
        .await
        .unwrap();

    assert!(messages.drain().await.unwrap().is_empty());
}
