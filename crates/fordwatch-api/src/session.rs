// Session lifecycle against the FordPass backend.
//
// Authentication is a two-leg exchange: credentials buy a short-lived
// FordPass token, which is then exchanged at the Autonomic OIDC endpoint
// for the bearer token telemetry requests actually use. Refresh is lazy:
// we only re-authenticate on first use, after expiry, or after an
// explicit invalidation -- never proactively on a timer, since the auth
// endpoints are rate-limited.

use std::sync::Mutex;

use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::token::{Token, TokenStore};

/// The FordPass token is only needed long enough to run the exchange,
/// and the auth response carries no expiry of its own.
const FORD_TOKEN_TTL_SECS: i64 = 300;

/// Shave this off the reported `expires_in` so we never present a token
/// that expires mid-request.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Login credentials. Supplied once at construction, never persisted.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Endpoint set for the two auth legs and the telemetry API.
///
/// Production values come from the FordPass mobile app; tests point all
/// three at a local mock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub auth: Url,
    pub token_exchange: Url,
    pub telemetry_base: Url,
}

impl Endpoints {
    /// The production FordPass / Autonomic endpoints.
    pub fn production() -> Self {
        Self {
            auth: Url::parse("https://us-central1-ford-connected-car.cloudfunctions.net/api/auth")
                .expect("static URL"),
            token_exchange: Url::parse("https://accounts.autonomic.ai/v1/auth/oidc/token")
                .expect("static URL"),
            telemetry_base: Url::parse(
                "https://api.autonomic.ai/v1/telemetry/sources/fordpass/vehicles/",
            )
            .expect("static URL"),
        }
    }

    /// Point every endpoint at a single base URL (for mock servers).
    pub fn with_base(base: &Url) -> Result<Self, Error> {
        Ok(Self {
            auth: base.join("/api/auth")?,
            token_exchange: base.join("/v1/auth/oidc/token")?,
            telemetry_base: base.join("/v1/telemetry/sources/fordpass/vehicles/")?,
        })
    }
}

// ── Wire types ───────────────────────────────────────────────────────

/// Leg 1 response. The backend wraps errors in HTTP 200 with an inner
/// `status` field, so both must be checked.
#[derive(Deserialize)]
struct FordAuthResponse {
    status: Option<u16>,
    access_token: Option<String>,
    message: Option<String>,
}

/// Leg 2 response (standard OIDC token-exchange shape).
#[derive(Deserialize)]
struct ExchangeResponse {
    access_token: String,
    expires_in: Option<i64>,
}

// ── SessionManager ───────────────────────────────────────────────────

/// Owns login and token refresh. The only component that ever sees the
/// credentials or holds tokens; callers get an opaque bearer value.
pub struct SessionManager {
    http: reqwest::Client,
    credentials: Credentials,
    endpoints: Endpoints,
    /// Intermediate FordPass token, reused across exchanges while fresh.
    ford: Mutex<TokenStore>,
    /// The Autonomic bearer token used on telemetry requests.
    bearer: Mutex<TokenStore>,
}

impl SessionManager {
    pub fn new(http: reqwest::Client, credentials: Credentials, endpoints: Endpoints) -> Self {
        Self {
            http,
            credentials,
            endpoints,
            ford: Mutex::new(TokenStore::default()),
            bearer: Mutex::new(TokenStore::default()),
        }
    }

    /// The endpoint set this session talks to.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// The underlying HTTP client (shared with the telemetry client).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Get a valid bearer token, authenticating if the held one is
    /// absent, expired, or was invalidated.
    pub async fn get_token(&self) -> Result<SecretString, Error> {
        let now = Utc::now();
        {
            let store = self.bearer.lock().expect("token store lock poisoned");
            if let Some(token) = store.valid(now) {
                return Ok(token.value.clone());
            }
        }

        debug!("no valid bearer token -- authenticating");
        let token = self.authenticate().await?;
        let value = token.value.clone();
        self.bearer
            .lock()
            .expect("token store lock poisoned")
            .set(token);
        Ok(value)
    }

    /// Force the next `get_token()` to re-authenticate.
    ///
    /// Called by the telemetry client when a request comes back 401/403.
    pub fn invalidate(&self) {
        debug!("bearer token invalidated");
        self.bearer
            .lock()
            .expect("token store lock poisoned")
            .clear();
    }

    /// Run the full two-leg authentication.
    async fn authenticate(&self) -> Result<Token, Error> {
        let ford_token = self.ford_token().await?;
        self.exchange_token(&ford_token).await
    }

    /// Leg 1: exchange credentials for a FordPass token, reusing a
    /// cached one while it is still fresh.
    async fn ford_token(&self) -> Result<SecretString, Error> {
        let now = Utc::now();
        {
            let store = self.ford.lock().expect("token store lock poisoned");
            if let Some(token) = store.valid(now) {
                return Ok(token.value.clone());
            }
        }

        debug!("logging in at {}", self.endpoints.auth);

        let body = json!({
            "username": self.credentials.username,
            "password": self.credentials.password.expose_secret(),
        });

        let resp = self
            .http
            .post(self.endpoints.auth.clone())
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {body}"),
            });
        }

        let auth: FordAuthResponse = resp.json().await.map_err(|e| Error::Deserialization {
            message: format!("auth response: {e}"),
        })?;

        // The backend reports failures inside an HTTP 200 envelope.
        if auth.status != Some(200) {
            return Err(Error::Authentication {
                message: auth
                    .message
                    .unwrap_or_else(|| "login rejected by FordPass".into()),
            });
        }

        let value = auth.access_token.ok_or_else(|| Error::Authentication {
            message: "login response carried no access token".into(),
        })?;

        let now = Utc::now();
        let token = Token {
            value: SecretString::from(value),
            issued_at: now,
            expires_at: Some(now + Duration::seconds(FORD_TOKEN_TTL_SECS)),
        };
        let secret = token.value.clone();
        self.ford
            .lock()
            .expect("token store lock poisoned")
            .set(token);

        debug!("FordPass login successful");
        Ok(secret)
    }

    /// Leg 2: exchange the FordPass token for the Autonomic bearer.
    async fn exchange_token(&self, ford_token: &SecretString) -> Result<Token, Error> {
        debug!("exchanging token at {}", self.endpoints.token_exchange);

        let form = [
            ("subject_token", ford_token.expose_secret()),
            ("subject_issuer", "fordpass"),
            ("client_id", "fordpass-prod"),
            (
                "grant_type",
                "urn:ietf:params:oauth:grant-type:token-exchange",
            ),
            (
                "subject_token_type",
                "urn:ietf:params:oauth:token-type:jwt",
            ),
        ];

        let resp = self
            .http
            .post(self.endpoints.token_exchange.clone())
            .form(&form)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("token exchange failed (HTTP {status}): {body}"),
            });
        }

        let exchange: ExchangeResponse =
            resp.json().await.map_err(|e| Error::Deserialization {
                message: format!("token exchange response: {e}"),
            })?;

        let now = Utc::now();
        let expires_at = exchange
            .expires_in
            .map(|secs| now + Duration::seconds((secs - EXPIRY_MARGIN_SECS).max(0)));

        debug!("bearer token obtained");
        Ok(Token {
            value: SecretString::from(exchange.access_token),
            issued_at: now,
            expires_at,
        })
    }
}
