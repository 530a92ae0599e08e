//! Session guard: access-token lifecycle and request retry policy
//!
//! [`SessionClient`] owns no state of its own beyond the in-flight refresh
//! handle; tokens live in the injected [`SessionStore`] so that separate
//! components (and separate CLI invocations) observe the same session.
//!
//! Per page load the guard moves through:
//!
//! ```text
//! Unchecked -> Unprotected
//!           -> NoToken -> Redirecting
//!           -> ValidToken -> Idle
//!           -> NearOrExpired -> Refreshing -> RefreshedOK -> Idle
//!                                          -> RefreshFailed -> Redirecting
//! ```

pub mod navigator;

pub use navigator::{ConsoleNavigator, Navigator, login_location};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tokio::sync::Mutex;

use crate::client::models::{LoginResponse, RefreshTokenRequest, RefreshTokenResponse};
use crate::client::token::{TokenStatus, decode_expiry};
use crate::client::{HttpRequest, HttpResponse, HttpTransport};
use crate::config::SessionSettings;
use crate::error::{ApiError, Error, Result, StorageError};
use crate::storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SessionStore};

/// Why the user was sent to the login page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectReason {
    NoAccessToken,
    MalformedToken(String),
    NoRefreshToken,
    RefreshRejected(u16),
    RefreshInvalidBody(String),
}

impl std::fmt::Display for RedirectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RedirectReason::NoAccessToken => write!(f, "no access token stored"),
            RedirectReason::MalformedToken(e) => write!(f, "access token is malformed ({})", e),
            RedirectReason::NoRefreshToken => write!(f, "no refresh token stored"),
            RedirectReason::RefreshRejected(status) => {
                write!(f, "refresh rejected with HTTP {}", status)
            }
            RedirectReason::RefreshInvalidBody(e) => {
                write!(f, "refresh response was unusable ({})", e)
            }
        }
    }
}

/// Result of a refresh attempt that did not fail at the transport level
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new access token was stored
    Refreshed,
    /// Session abandoned; the navigator was sent to `location`
    LoginRequired {
        location: String,
        reason: RedirectReason,
    },
}

/// Terminal state of [`SessionClient::on_load`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Path is not protected; nothing checked
    Unprotected,
    /// Token accepted as-is
    Valid { expires_at: DateTime<Utc> },
    /// Token was near or past expiry and has been replaced
    Refreshed,
    /// The navigator was sent to the login page
    Redirecting {
        location: String,
        reason: RedirectReason,
    },
}

/// What is currently stored, for status reporting
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// `None` when no access token is stored
    pub access: Option<std::result::Result<(DateTime<Utc>, TokenStatus), ApiError>>,
    pub has_refresh_token: bool,
}

/// Failure shared between coalesced refresh callers
#[derive(Debug, Clone)]
enum RefreshFailure {
    Api(ApiError),
    Storage(StorageError),
}

impl From<StorageError> for RefreshFailure {
    fn from(err: StorageError) -> Self {
        RefreshFailure::Storage(err)
    }
}

impl From<RefreshFailure> for Error {
    fn from(err: RefreshFailure) -> Self {
        match err {
            RefreshFailure::Api(e) => Error::Api(e),
            RefreshFailure::Storage(e) => Error::Storage(e),
        }
    }
}

type RefreshResult = std::result::Result<RefreshOutcome, RefreshFailure>;
type PendingRefresh = Shared<BoxFuture<'static, RefreshResult>>;

/// Guards protected pages and keeps the access token fresh
pub struct SessionClient {
    store: Arc<dyn SessionStore>,
    transport: Arc<dyn HttpTransport>,
    navigator: Arc<dyn Navigator>,
    settings: SessionSettings,
    in_flight: Mutex<Option<PendingRefresh>>,
}

impl SessionClient {
    pub fn new(
        store: Arc<dyn SessionStore>,
        transport: Arc<dyn HttpTransport>,
        navigator: Arc<dyn Navigator>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            store,
            transport,
            navigator,
            settings,
            in_flight: Mutex::new(None),
        }
    }

    /// Whether `path` requires a session
    pub fn is_protected(&self, path: &str) -> bool {
        path.starts_with(&self.settings.protected_prefix)
    }

    /// Check the stored token once for a page load at `current_path`.
    ///
    /// No background timer is started; a token that is valid now is not
    /// re-checked until the next load or a 401.
    pub async fn on_load(&self, current_path: &str) -> Result<GuardOutcome> {
        if !self.is_protected(current_path) {
            return Ok(GuardOutcome::Unprotected);
        }

        let Some(token) = self.store.get(ACCESS_TOKEN_KEY)? else {
            log::info!("No access token found, redirecting to login");
            return Ok(self.redirect_on_load(current_path, RedirectReason::NoAccessToken));
        };

        let expires_at = match decode_expiry(&token) {
            Ok(expires_at) => expires_at,
            Err(e) => {
                log::warn!("Invalid token format: {}", e);
                let reason = match e {
                    ApiError::MalformedToken(detail) => RedirectReason::MalformedToken(detail),
                    other => RedirectReason::MalformedToken(other.to_string()),
                };
                return Ok(self.redirect_on_load(current_path, reason));
            }
        };

        let now = Utc::now();
        log::debug!("Token expires at {}, now {}", expires_at, now);

        match TokenStatus::classify(expires_at, now, self.settings.refresh_threshold()) {
            status if !status.needs_refresh() => {
                log::debug!("Token is valid");
                Ok(GuardOutcome::Valid { expires_at })
            }
            status => {
                log::info!("Token {:?}, attempting refresh", status);
                match self.refresh().await? {
                    RefreshOutcome::Refreshed => Ok(GuardOutcome::Refreshed),
                    RefreshOutcome::LoginRequired { location, reason } => {
                        Ok(GuardOutcome::Redirecting { location, reason })
                    }
                }
            }
        }
    }

    fn redirect_on_load(&self, current_path: &str, reason: RedirectReason) -> GuardOutcome {
        let location = login_location(&self.settings.login_path, current_path);
        self.navigator.redirect(&location);
        GuardOutcome::Redirecting { location, reason }
    }

    /// Mint a new access token from the stored refresh token.
    ///
    /// Concurrent callers share one request: whoever arrives while a refresh
    /// is pending awaits that refresh instead of starting another.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let pending = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some(pending) => {
                    log::debug!("Joining in-flight refresh");
                    pending.clone()
                }
                None => {
                    let pending = refresh_once(
                        self.store.clone(),
                        self.transport.clone(),
                        self.navigator.clone(),
                        self.settings.clone(),
                    )
                    .boxed()
                    .shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;

        {
            let mut slot = self.in_flight.lock().await;
            if slot.as_ref().is_some_and(|current| current.ptr_eq(&pending)) {
                *slot = None;
            }
        }

        result.map_err(Error::from)
    }

    /// Send `request` with session headers, retrying once after a refresh on 401.
    ///
    /// The wrapped request goes out at most twice. A 401 on the retry is
    /// returned to the caller as-is.
    pub async fn authorized_request(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(request.headers.clone());

        if let Some(token) = self.store.get(ACCESS_TOKEN_KEY)? {
            headers.insert(AUTHORIZATION, bearer(&token)?);
        }

        let mut outgoing = request;
        outgoing.headers = headers;

        let response = self.transport.send(outgoing.clone()).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        log::info!("401 Unauthorized, attempting token refresh");
        self.refresh().await?;

        match self.store.get(ACCESS_TOKEN_KEY)? {
            Some(token) => {
                outgoing.headers.insert(AUTHORIZATION, bearer(&token)?);
                Ok(self.transport.send(outgoing).await?)
            }
            None => {
                let location =
                    login_location(&self.settings.login_path, &self.navigator.current_path());
                self.navigator.redirect(&location);
                Err(ApiError::Unauthorized.into())
            }
        }
    }

    /// Store the tokens issued at login
    pub fn establish(&self, tokens: &LoginResponse) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, &tokens.access_token)?;
        self.store.set(REFRESH_TOKEN_KEY, &tokens.refresh_token)?;
        Ok(())
    }

    /// Drop all local session state
    pub fn clear(&self) -> Result<()> {
        self.store.clear()?;
        Ok(())
    }

    /// Describe the stored session without touching the network
    pub fn snapshot(&self) -> Result<SessionSnapshot> {
        let threshold = self.settings.refresh_threshold();
        let access = self.store.get(ACCESS_TOKEN_KEY)?.map(|token| {
            decode_expiry(&token)
                .map(|exp| (exp, TokenStatus::classify(exp, Utc::now(), threshold)))
        });
        Ok(SessionSnapshot {
            access,
            has_refresh_token: self.store.get(REFRESH_TOKEN_KEY)?.is_some(),
        })
    }
}

fn bearer(token: &str) -> std::result::Result<HeaderValue, ApiError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
        ApiError::MalformedToken("token contains characters not allowed in a header".to_string())
    })?;
    value.set_sensitive(true);
    Ok(value)
}

/// One refresh round-trip. Never retried.
async fn refresh_once(
    store: Arc<dyn SessionStore>,
    transport: Arc<dyn HttpTransport>,
    navigator: Arc<dyn Navigator>,
    settings: SessionSettings,
) -> RefreshResult {
    let return_path = navigator.current_path();

    let Some(refresh_token) = store.get(REFRESH_TOKEN_KEY)? else {
        log::info!("No refresh token, redirecting to login");
        return Ok(abandon(
            &*navigator,
            &settings,
            &return_path,
            RedirectReason::NoRefreshToken,
        ));
    };

    let body = serde_json::to_string(&RefreshTokenRequest { refresh_token })
        .map_err(|e| RefreshFailure::Api(ApiError::BadRequest(e.to_string())))?;
    let mut request = HttpRequest::post(settings.refresh_path.clone()).body(body);
    request
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    log::debug!("Refreshing access token");
    match transport.send(request).await {
        Ok(response) if response.is_success() => {
            match response.json::<RefreshTokenResponse>() {
                Ok(tokens) => {
                    store.set(ACCESS_TOKEN_KEY, &tokens.access_token)?;
                    log::info!("Access token refreshed");
                    Ok(RefreshOutcome::Refreshed)
                }
                Err(e) => {
                    log::error!("Refresh response unusable: {}", e);
                    clear_quietly(&*store);
                    Ok(abandon(
                        &*navigator,
                        &settings,
                        &return_path,
                        RedirectReason::RefreshInvalidBody(e.to_string()),
                    ))
                }
            }
        }
        Ok(response) => {
            log::warn!("Refresh failed: {}", response.status);
            clear_quietly(&*store);
            Ok(abandon(
                &*navigator,
                &settings,
                &return_path,
                RedirectReason::RefreshRejected(response.status.as_u16()),
            ))
        }
        Err(e) => {
            log::error!("Refresh request failed: {}", e);
            clear_quietly(&*store);
            navigator.redirect(&login_location(&settings.login_path, &return_path));
            Err(RefreshFailure::Api(e))
        }
    }
}

fn clear_quietly(store: &dyn SessionStore) {
    if let Err(e) = store.clear() {
        log::warn!("Failed to clear session storage: {}", e);
    }
}

fn abandon(
    navigator: &dyn Navigator,
    settings: &SessionSettings,
    return_path: &str,
    reason: RedirectReason,
) -> RefreshOutcome {
    let location = login_location(&settings.login_path, return_path);
    navigator.redirect(&location);
    RefreshOutcome::LoginRequired { location, reason }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{Duration as ChronoDuration, Utc};
    use reqwest::StatusCode;
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue};

    use super::*;
    use crate::client::mock::MockTransport;
    use crate::client::token::test_support::token_expiring_at;
    use crate::storage::{MemoryStore, SIGNUP_EMAIL_KEY};

    const REFRESH: &str = "/api/auth/refresh";
    const STATS: &str = "/dashboard/api/stats";

    struct Harness {
        client: SessionClient,
        store: Arc<MemoryStore>,
        transport: MockTransport,
        navigator: Arc<ConsoleNavigator>,
    }

    fn harness(store: MemoryStore, transport: MockTransport, path: &str) -> Harness {
        let store = Arc::new(store);
        let navigator = Arc::new(ConsoleNavigator::new(path));
        let client = SessionClient::new(
            store.clone(),
            Arc::new(transport.clone()),
            navigator.clone(),
            SessionSettings::default(),
        );
        Harness {
            client,
            store,
            transport,
            navigator,
        }
    }

    fn token_in(minutes: i64) -> String {
        token_expiring_at(Utc::now() + ChronoDuration::minutes(minutes))
    }

    fn stored(access: &str, refresh: &str) -> MemoryStore {
        MemoryStore::with_entries([(ACCESS_TOKEN_KEY, access), (REFRESH_TOKEN_KEY, refresh)])
    }

    fn refreshed_body(token: &str) -> String {
        format!(r#"{{"accessToken":"{}","tokenType":"Bearer","expiresIn":1800}}"#, token)
    }

    #[tokio::test]
    async fn test_unprotected_path_is_noop() {
        let h = harness(MemoryStore::new(), MockTransport::new(), "/signup");

        let outcome = h.client.on_load("/signup").await.unwrap();

        assert_eq!(outcome, GuardOutcome::Unprotected);
        assert!(h.transport.requests().await.is_empty());
        assert!(h.navigator.redirected_to().is_none());
    }

    #[tokio::test]
    async fn test_missing_access_token_redirects() {
        let h = harness(MemoryStore::new(), MockTransport::new(), "/dashboard/mail");

        let outcome = h.client.on_load("/dashboard/mail").await.unwrap();

        assert_eq!(
            outcome,
            GuardOutcome::Redirecting {
                location: "/login?returnUrl=%2Fdashboard%2Fmail".to_string(),
                reason: RedirectReason::NoAccessToken,
            }
        );
        assert_eq!(
            h.navigator.redirected_to().as_deref(),
            Some("/login?returnUrl=%2Fdashboard%2Fmail")
        );
        assert!(h.transport.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_token_redirects_without_refresh() {
        let h = harness(
            stored("not-a-jwt", "refresh"),
            MockTransport::new(),
            "/dashboard",
        );

        let outcome = h.client.on_load("/dashboard").await.unwrap();

        assert!(matches!(
            outcome,
            GuardOutcome::Redirecting {
                reason: RedirectReason::MalformedToken(_),
                ..
            }
        ));
        assert_eq!(h.transport.count("POST", REFRESH).await, 0);
    }

    #[tokio::test]
    async fn test_valid_token_is_accepted() {
        let h = harness(
            stored(&token_in(60), "refresh"),
            MockTransport::new(),
            "/dashboard",
        );

        let outcome = h.client.on_load("/dashboard").await.unwrap();

        assert!(matches!(outcome, GuardOutcome::Valid { .. }));
        assert!(h.transport.requests().await.is_empty());
        assert!(h.navigator.redirected_to().is_none());
    }

    #[tokio::test]
    async fn test_near_expiry_token_refreshes_once() {
        let transport = MockTransport::new()
            .with_json("POST", REFRESH, 200, &refreshed_body("fresh-token"))
            .await;
        let h = harness(stored(&token_in(2), "refresh"), transport, "/dashboard");

        let outcome = h.client.on_load("/dashboard").await.unwrap();

        assert_eq!(outcome, GuardOutcome::Refreshed);
        assert_eq!(h.transport.count("POST", REFRESH).await, 1);
        assert_eq!(
            h.store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(),
            Some("fresh-token")
        );
        // Refresh token is never rotated
        assert_eq!(
            h.store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(),
            Some("refresh")
        );

        let requests = h.transport.requests().await;
        let request = &requests[0];
        assert_eq!(request.body.as_deref(), Some(r#"{"refreshToken":"refresh"}"#));
        assert_eq!(
            request.headers.get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_once() {
        let transport = MockTransport::new()
            .with_json("POST", REFRESH, 200, &refreshed_body("fresh-token"))
            .await;
        let h = harness(stored(&token_in(-30), "refresh"), transport, "/dashboard");

        let outcome = h.client.on_load("/dashboard").await.unwrap();

        assert_eq!(outcome, GuardOutcome::Refreshed);
        assert_eq!(h.transport.count("POST", REFRESH).await, 1);
    }

    #[tokio::test]
    async fn test_refresh_rejected_clears_storage_and_redirects() {
        let transport = MockTransport::new()
            .with_status("POST", REFRESH, 403)
            .await;
        let store = MemoryStore::with_entries([
            (ACCESS_TOKEN_KEY, "old"),
            (REFRESH_TOKEN_KEY, "refresh"),
            (SIGNUP_EMAIL_KEY, "draft@gmail.com"),
        ]);
        let h = harness(store, transport, "/dashboard");
        h.navigator.set_path("/dashboard/schedule");

        let outcome = h.client.refresh().await.unwrap();

        assert_eq!(
            outcome,
            RefreshOutcome::LoginRequired {
                location: "/login?returnUrl=%2Fdashboard%2Fschedule".to_string(),
                reason: RedirectReason::RefreshRejected(403),
            }
        );
        assert_eq!(h.store.get(ACCESS_TOKEN_KEY).unwrap(), None);
        assert_eq!(h.store.get(REFRESH_TOKEN_KEY).unwrap(), None);
        assert_eq!(h.store.get(SIGNUP_EMAIL_KEY).unwrap(), None);
        assert_eq!(
            h.navigator.redirected_to().as_deref(),
            Some("/login?returnUrl=%2Fdashboard%2Fschedule")
        );
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_keeps_storage() {
        let store = MemoryStore::with_entries([(ACCESS_TOKEN_KEY, "old")]);
        let h = harness(store, MockTransport::new(), "/dashboard");

        let outcome = h.client.refresh().await.unwrap();

        assert!(matches!(
            outcome,
            RefreshOutcome::LoginRequired {
                reason: RedirectReason::NoRefreshToken,
                ..
            }
        ));
        assert_eq!(h.transport.count("POST", REFRESH).await, 0);
        assert_eq!(h.store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_refresh_transport_failure_is_surfaced() {
        let transport = MockTransport::new()
            .with_failure(
                "POST",
                REFRESH,
                ApiError::Network("connection reset".to_string()),
            )
            .await;
        let h = harness(stored("old", "refresh"), transport, "/dashboard");

        let err = h.client.refresh().await.unwrap_err();

        assert!(matches!(err, Error::Api(ApiError::Network(_))));
        assert_eq!(h.store.get(ACCESS_TOKEN_KEY).unwrap(), None);
        assert_eq!(h.store.get(REFRESH_TOKEN_KEY).unwrap(), None);
        assert_eq!(
            h.navigator.redirected_to().as_deref(),
            Some("/login?returnUrl=%2Fdashboard")
        );
    }

    #[tokio::test]
    async fn test_refresh_success_without_access_token_abandons_session() {
        let transport = MockTransport::new()
            .with_json("POST", REFRESH, 200, r#"{"tokenType":"Bearer"}"#)
            .await;
        let h = harness(stored("old", "refresh"), transport, "/dashboard");

        let outcome = h.client.refresh().await.unwrap();

        assert!(matches!(
            outcome,
            RefreshOutcome::LoginRequired {
                reason: RedirectReason::RefreshInvalidBody(_),
                ..
            }
        ));
        assert_eq!(h.store.get(REFRESH_TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_authorized_request_sets_headers() {
        let transport = MockTransport::new()
            .with_json("GET", STATS, 200, r#"{"unread":3}"#)
            .await;
        let h = harness(stored("abc.def.ghi", "refresh"), transport, "/dashboard");

        let mut request = HttpRequest::get(STATS);
        request.headers.insert(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("42"),
        );
        let response = h.client.authorized_request(request).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        let requests = h.transport.requests().await;
        let sent = &requests[0];
        assert_eq!(sent.headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(sent.headers.get(AUTHORIZATION).unwrap(), "Bearer abc.def.ghi");
        assert_eq!(sent.headers.get("x-request-id").unwrap(), "42");
    }

    #[tokio::test]
    async fn test_caller_content_type_wins() {
        let transport = MockTransport::new().with_status("POST", STATS, 200).await;
        let h = harness(MemoryStore::new(), transport, "/dashboard");

        let mut request = HttpRequest::post(STATS).body("a=1");
        request.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        h.client.authorized_request(request).await.unwrap();

        let requests = h.transport.requests().await;
        let sent = &requests[0];
        assert_eq!(
            sent.headers.get(CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );
        // No token stored, so no Authorization header
        assert!(sent.headers.get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_retries_once_with_new_token() {
        let transport = MockTransport::new()
            .with_status("GET", STATS, 401)
            .await
            .with_json("GET", STATS, 200, r#"{"unread":3}"#)
            .await
            .with_json("POST", REFRESH, 200, &refreshed_body("fresh-token"))
            .await;
        let h = harness(stored("stale-token", "refresh"), transport, "/dashboard");

        let response = h
            .client
            .authorized_request(HttpRequest::get(STATS))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(h.transport.count("GET", STATS).await, 2);
        assert_eq!(h.transport.count("POST", REFRESH).await, 1);

        let calls: Vec<_> = h
            .transport
            .requests()
            .await
            .into_iter()
            .filter(|r| r.url == STATS)
            .collect();
        assert_eq!(
            calls[0].headers.get(AUTHORIZATION).unwrap(),
            "Bearer stale-token"
        );
        assert_eq!(
            calls[1].headers.get(AUTHORIZATION).unwrap(),
            "Bearer fresh-token"
        );
    }

    #[tokio::test]
    async fn test_retry_is_never_repeated() {
        let transport = MockTransport::new()
            .with_status("GET", STATS, 401)
            .await
            .with_json("POST", REFRESH, 200, &refreshed_body("fresh-token"))
            .await;
        let h = harness(stored("stale-token", "refresh"), transport, "/dashboard");

        let response = h
            .client
            .authorized_request(HttpRequest::get(STATS))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(h.transport.count("GET", STATS).await, 2);
        assert_eq!(h.transport.count("POST", REFRESH).await, 1);
    }

    #[tokio::test]
    async fn test_unauthorized_with_failed_refresh_signals_failure() {
        let transport = MockTransport::new()
            .with_status("GET", STATS, 401)
            .await
            .with_status("POST", REFRESH, 401)
            .await;
        let h = harness(stored("stale-token", "refresh"), transport, "/dashboard/mail");

        let err = h
            .client
            .authorized_request(HttpRequest::get(STATS))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Api(ApiError::Unauthorized)));
        assert_eq!(h.transport.count("GET", STATS).await, 1);
        assert_eq!(
            h.navigator.redirected_to().as_deref(),
            Some("/login?returnUrl=%2Fdashboard%2Fmail")
        );
    }

    #[tokio::test]
    async fn test_transport_failure_on_wrapped_request_propagates() {
        let transport = MockTransport::new()
            .with_failure("GET", STATS, ApiError::Network("timed out".to_string()))
            .await;
        let h = harness(stored("t", "refresh"), transport, "/dashboard");

        let err = h
            .client
            .authorized_request(HttpRequest::get(STATS))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Api(ApiError::Network(_))));
        assert_eq!(h.store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("refresh"));
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_are_coalesced() {
        let transport = MockTransport::new()
            .with_json("POST", REFRESH, 200, &refreshed_body("fresh-token"))
            .await
            .with_delay(Duration::from_millis(50))
            .await;
        let h = harness(stored("stale-token", "refresh"), transport, "/dashboard");

        let (first, second) = tokio::join!(h.client.refresh(), h.client.refresh());

        assert_eq!(first.unwrap(), RefreshOutcome::Refreshed);
        assert_eq!(second.unwrap(), RefreshOutcome::Refreshed);
        assert_eq!(h.transport.count("POST", REFRESH).await, 1);

        // Once settled, a later refresh goes out again
        h.client.refresh().await.unwrap();
        assert_eq!(h.transport.count("POST", REFRESH).await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_unauthorized_requests_share_refresh() {
        let transport = MockTransport::new()
            .with_status("GET", STATS, 401)
            .await
            .with_status("GET", STATS, 401)
            .await
            .with_status("GET", STATS, 200)
            .await
            .with_json("POST", REFRESH, 200, &refreshed_body("fresh-token"))
            .await
            .with_delay(Duration::from_millis(20))
            .await;
        let h = harness(stored("stale-token", "refresh"), transport, "/dashboard");

        let (a, b) = tokio::join!(
            h.client.authorized_request(HttpRequest::get(STATS)),
            h.client.authorized_request(HttpRequest::get(STATS))
        );

        assert_eq!(a.unwrap().status, StatusCode::OK);
        assert_eq!(b.unwrap().status, StatusCode::OK);
        assert_eq!(h.transport.count("POST", REFRESH).await, 1);
        assert_eq!(h.transport.count("GET", STATS).await, 4);
    }

    #[tokio::test]
    async fn test_snapshot_reports_status() {
        let h = harness(
            stored(&token_in(2), "refresh"),
            MockTransport::new(),
            "/dashboard",
        );

        let snapshot = h.client.snapshot().unwrap();
        assert!(snapshot.has_refresh_token);
        let (_, status) = snapshot.access.unwrap().unwrap();
        assert_eq!(status, TokenStatus::NearExpiry);
    }

    #[tokio::test]
    async fn test_establish_and_clear() {
        let h = harness(MemoryStore::new(), MockTransport::new(), "/dashboard");
        let tokens: LoginResponse =
            serde_json::from_str(r#"{"accessToken":"a","refreshToken":"r"}"#).unwrap();

        h.client.establish(&tokens).unwrap();
        assert_eq!(h.store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("a"));
        assert_eq!(h.store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("r"));

        h.client.clear().unwrap();
        assert!(h.client.snapshot().unwrap().access.is_none());
    }
}
