//! Delegated access tokens: the two-hop exchange against the identity
//! service, the static offline substitute and the per-subject cache.

use crate::cache::TtlCache;
use crate::config::{CoreConfig, ReceiverCredential};
use crate::http::{CallFamily, Transport};
use console_access_spec::{DomainError, ErrorKind, ErrorTier, RequestContext, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{Instrument, debug, info, info_span};

const TOKEN_PATH: &str = "/identity/token";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const DELEGATED_GRANT: &str = "urn:ibm:params:oauth:grant-type:delegated-refresh-token";
const EXPIRY_MARGIN_SECS: u64 = 60;
const MIN_LIFETIME_SECS: u64 = 60;
const STATIC_LIFETIME_SECS: u64 = 3600;

/// Backend family a delegated token is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Receiver {
    CodeEngine,
    ResourceController,
    ContainerRegistry,
}

impl Receiver {
    pub const ALL: [Receiver; 3] = [
        Receiver::CodeEngine,
        Receiver::ResourceController,
        Receiver::ContainerRegistry,
    ];

    /// Infix of the `CONSOLE_<RECEIVER>_CLIENT_*` variables.
    pub const fn env_prefix(self) -> &'static str {
        match self {
            Receiver::CodeEngine => "CODE_ENGINE",
            Receiver::ResourceController => "RESOURCE_CONTROLLER",
            Receiver::ContainerRegistry => "CONTAINER_REGISTRY",
        }
    }
}

impl fmt::Display for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Receiver::CodeEngine => "code-engine",
            Receiver::ResourceController => "resource-controller",
            Receiver::ContainerRegistry => "container-registry",
        };
        f.write_str(name)
    }
}

/// Access token usable against one receiver.
#[derive(Clone, PartialEq, Eq)]
pub struct DelegatedToken {
    value: String,
    refresh_token: Option<String>,
    expires_at_epoch_ms: i64,
}

impl DelegatedToken {
    pub fn new(
        value: impl Into<String>,
        refresh_token: Option<String>,
        expires_at_epoch_ms: i64,
    ) -> Self {
        Self {
            value: value.into(),
            refresh_token,
            expires_at_epoch_ms,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expires_at_epoch_ms(&self) -> i64 {
        self.expires_at_epoch_ms
    }

    /// Remaining validity, zero once expired.
    pub fn remaining(&self) -> Duration {
        let remaining = self.expires_at_epoch_ms - now_epoch_ms();
        Duration::from_millis(u64::try_from(remaining).unwrap_or(0))
    }
}

impl fmt::Debug for DelegatedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatedToken")
            .field("value", &"<redacted>")
            .field("expires_at_epoch_ms", &self.expires_at_epoch_ms)
            .finish()
    }
}

/// Statically configured token pair for offline development.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    access_token: String,
    refresh_token: Option<String>,
}

impl StaticCredentials {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    fn token(&self) -> DelegatedToken {
        DelegatedToken::new(
            self.access_token.clone(),
            self.refresh_token.clone(),
            now_epoch_ms() + (STATIC_LIFETIME_SECS * 1000) as i64,
        )
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error)]
enum ExchangeError {
    #[error("identity service rejected the exchange ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("identity service answered without {0}")]
    MissingField(&'static str),
    #[error("identity service response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct DelegatedRefreshResponse {
    #[serde(default)]
    delegated_refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    /// Absolute expiry, epoch seconds.
    #[serde(default)]
    expiration: Option<i64>,
}

/// Performs the two-hop delegated exchange against the identity service.
#[derive(Clone)]
pub struct TokenExchanger {
    transport: Arc<Transport>,
    token_url: String,
    receivers: BTreeMap<Receiver, ReceiverCredential>,
}

impl TokenExchanger {
    pub fn new(
        transport: Arc<Transport>,
        iam_url: &str,
        receivers: BTreeMap<Receiver, ReceiverCredential>,
    ) -> Self {
        Self {
            transport,
            token_url: format!("{}{TOKEN_PATH}", iam_url.trim_end_matches('/')),
            receivers,
        }
    }

    /// Client id of a receiver, the first half of the token cache key.
    pub fn receiver_client_id(&self, receiver: Receiver) -> Result<&str> {
        self.credential(receiver).map(ReceiverCredential::client_id)
    }

    /// Exchange the caller's refresh token for a token scoped to `receiver`.
    pub async fn exchange(
        &self,
        receiver: Receiver,
        refresh_token: &str,
    ) -> Result<DelegatedToken> {
        let credential = self.credential(receiver)?;
        let delegated = self
            .delegated_refresh_token(credential, refresh_token)
            .await
            .map_err(|err| {
                DomainError::wrap(
                    ErrorKind::FailedToGetDelegatedRefreshToken,
                    exchange_tier(&err),
                    err,
                )
            })?;
        self.iam_tokens(credential, &delegated)
            .await
            .map_err(|err| {
                DomainError::wrap(ErrorKind::FailedToGetIamTokens, exchange_tier(&err), err)
            })
    }

    fn credential(&self, receiver: Receiver) -> Result<&ReceiverCredential> {
        self.receivers.get(&receiver).ok_or_else(|| {
            DomainError::new(
                ErrorKind::InvalidConfiguration,
                ErrorTier::Precondition,
                format!("no client credential configured for receiver {receiver}"),
            )
        })
    }

    async fn delegated_refresh_token(
        &self,
        credential: &ReceiverCredential,
        refresh_token: &str,
    ) -> std::result::Result<String, ExchangeError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("receiver_client_ids", credential.client_id()),
            ("response_type", "delegated_refresh_token"),
        ];
        let body = self
            .post("get_delegated_refresh_token", credential, &params)
            .await?;
        let parsed: DelegatedRefreshResponse = serde_json::from_str(&body)?;
        parsed
            .delegated_refresh_token
            .filter(|token| !token.is_empty())
            .ok_or(ExchangeError::MissingField("delegated_refresh_token"))
    }

    async fn iam_tokens(
        &self,
        credential: &ReceiverCredential,
        delegated: &str,
    ) -> std::result::Result<DelegatedToken, ExchangeError> {
        let params = [
            ("grant_type", DELEGATED_GRANT),
            ("refresh_token", delegated),
            ("response_type", "cloud_iam"),
        ];
        let body = self.post("get_iam_tokens", credential, &params).await?;
        let parsed: IamTokenResponse = serde_json::from_str(&body)?;
        let access_token = parsed
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or(ExchangeError::MissingField("access_token"))?;

        let now = now_epoch_ms();
        let lifetime = token_lifetime(parsed.expiration, parsed.expires_in, now / 1000);
        Ok(DelegatedToken::new(
            access_token,
            parsed.refresh_token,
            now + lifetime.as_millis() as i64,
        ))
    }

    async fn post(
        &self,
        operation: &str,
        credential: &ReceiverCredential,
        params: &[(&str, &str)],
    ) -> std::result::Result<String, ExchangeError> {
        let authorization = credential.basic_header();
        let response = self
            .transport
            .execute(operation, CallFamily::Token, |client| {
                client
                    .post(&self.token_url)
                    .query(params)
                    .header(AUTHORIZATION, authorization.as_str())
                    .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                    .header(ACCEPT, "application/json")
            })
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ExchangeError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

fn exchange_tier(err: &ExchangeError) -> ErrorTier {
    match err {
        ExchangeError::Rejected { .. } => ErrorTier::Protocol,
        ExchangeError::MissingField(_) | ExchangeError::Decode(_) => ErrorTier::Translation,
        ExchangeError::Http(_) => ErrorTier::Transport,
    }
}

/// Cache lifetime of an exchanged token: the reported validity minus a
/// safety margin, never below one minute.
pub fn token_lifetime(expiration: Option<i64>, expires_in: Option<u64>, now_secs: i64) -> Duration {
    let reported = expiration
        .map(|at| u64::try_from(at - now_secs).unwrap_or(0))
        .or(expires_in)
        .unwrap_or(0);
    Duration::from_secs(
        reported
            .saturating_sub(EXPIRY_MARGIN_SECS)
            .max(MIN_LIFETIME_SECS),
    )
}

/// Where delegated tokens come from, selected once at startup.
#[derive(Clone)]
pub enum CredentialSource {
    Exchange(TokenExchanger),
    Static(StaticCredentials),
}

impl CredentialSource {
    /// Static credentials win when configured.
    pub fn from_config(config: &CoreConfig, transport: Arc<Transport>) -> Self {
        match config.static_credential() {
            Some(credentials) => {
                info!("console credential: static token pair");
                CredentialSource::Static(credentials.clone())
            }
            None => {
                info!(
                    iam = %config.iam_url(),
                    receivers = config.receivers().len(),
                    "console credential: delegated token exchange"
                );
                CredentialSource::Exchange(TokenExchanger::new(
                    transport,
                    config.iam_url(),
                    config.receivers().clone(),
                ))
            }
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, CredentialSource::Static(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TokenKey {
    receiver_client_id: String,
    subject: String,
}

/// Resolves delegated tokens per `(receiver client id, subject)` and keeps
/// them until shortly before they expire. Failed exchanges are not cached.
pub struct DelegatedTokenCache {
    source: CredentialSource,
    cache: Mutex<TtlCache<TokenKey, DelegatedToken>>,
}

impl DelegatedTokenCache {
    pub fn new(source: CredentialSource, capacity: usize) -> Self {
        Self {
            source,
            cache: Mutex::new(TtlCache::new(capacity)),
        }
    }

    pub fn source(&self) -> &CredentialSource {
        &self.source
    }

    pub async fn token(&self, ctx: &RequestContext, receiver: Receiver) -> Result<DelegatedToken> {
        let exchanger = match &self.source {
            CredentialSource::Static(credentials) => return Ok(credentials.token()),
            CredentialSource::Exchange(exchanger) => exchanger,
        };

        let principal = ctx.principal().ok_or_else(|| {
            DomainError::precondition("an authenticated principal is required for token exchange")
        })?;
        let key = TokenKey {
            receiver_client_id: exchanger.receiver_client_id(receiver)?.to_string(),
            subject: principal.subject().to_string(),
        };

        if let Some(token) = self.lock().get(&key) {
            debug!(%receiver, "delegated token cache hit");
            return Ok(token);
        }

        debug!(%receiver, "delegated token cache miss");
        let span = info_span!(
            "console.token_exchange",
            receiver = %receiver,
            transaction_id = %ctx.transaction_id()
        );
        let token = exchanger
            .exchange(receiver, principal.refresh_token())
            .instrument(span)
            .await?;

        let ttl = token.remaining();
        self.lock().insert(key, token.clone(), ttl);
        Ok(token)
    }

    pub fn invalidate(&self, ctx: &RequestContext, receiver: Receiver) {
        let (CredentialSource::Exchange(exchanger), Some(principal)) =
            (&self.source, ctx.principal())
        else {
            return;
        };
        if let Ok(client_id) = exchanger.receiver_client_id(receiver) {
            self.lock().remove(&TokenKey {
                receiver_client_id: client_id.to_string(),
                subject: principal.subject().to_string(),
            });
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TtlCache<TokenKey, DelegatedToken>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn now_epoch_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
