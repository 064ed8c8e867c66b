use std::{sync::Arc, time::Duration};

use arc_swap::ArcSwapOption;
use reqwest::{
    header::{self, HeaderValue},
    Client, StatusCode,
};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use url::Url;
use warden_jose::{jwa, jwk, Jwk, Jwks};

use crate::{
    error::{self, NoKeysAvailable, ProviderError, RefreshError},
    KeyProviderConfig,
};

const DEFAULT_USER_AGENT: &str = concat!("warden_jwks/", env!("CARGO_PKG_VERSION"));

/// An immutable snapshot of the key set
///
/// Every key in a snapshot loaded from a remote document declares an
/// algorithm.
#[derive(Debug)]
pub struct KeySet {
    jwks: Jwks,
    etag: Option<HeaderValue>,
    last_modified: Option<HeaderValue>,
}

impl KeySet {
    fn new(jwks: Jwks) -> Self {
        Self {
            jwks,
            etag: None,
            last_modified: None,
        }
    }

    /// The keys in this snapshot
    #[must_use]
    pub fn jwks(&self) -> &Jwks {
        &self.jwks
    }

    /// The number of keys in this snapshot
    #[must_use]
    pub fn len(&self) -> usize {
        self.jwks.len()
    }

    /// Whether this snapshot holds no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jwks.is_empty()
    }

    /// Selects the key to verify a token signed with `alg`, preferring the key named by `kid`
    #[must_use]
    pub fn get_key(&self, kid: Option<&jwk::KeyIdRef>, alg: jwa::Algorithm) -> Option<&Jwk> {
        self.jwks.get_key_by_opt(kid, alg)
    }
}

/// The result of a successful refresh attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot was stored
    Updated {
        /// The number of keys in the new snapshot
        keys: usize,
    },

    /// The current snapshot is still current
    NotModified,
}

#[derive(Debug)]
struct Remote {
    url: Url,
    client: Client,
}

#[derive(Debug)]
struct Inner {
    data: ArcSwapOption<KeySet>,
    remote: Option<Remote>,
    refresh_interval: Duration,
    auto_infer_algorithm: bool,
}

/// Owner of the key set used to verify tokens
///
/// Cloning is cheap; clones share the same snapshot.
#[derive(Debug, Clone)]
#[must_use]
pub struct KeyProvider {
    inner: Arc<Inner>,
}

impl KeyProvider {
    /// Constructs a provider that fetches from the configured URL
    ///
    /// No request is made until [`refresh()`][Self::refresh] is called or the
    /// refresh loop is started.
    ///
    /// # Errors
    ///
    /// The URL is not an `http` or `https` URL, the refresh interval is zero,
    /// or the HTTP client cannot be built.
    pub fn new(config: KeyProviderConfig) -> Result<Self, ProviderError> {
        let url = Url::parse(&config.url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProviderError::UnsupportedScheme {
                scheme: url.scheme().to_owned(),
            });
        }

        if config.refresh_interval.is_zero() {
            return Err(ProviderError::ZeroRefreshInterval);
        }

        let http = &config.http_client;
        let client = Client::builder()
            .user_agent(http.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT))
            .timeout(http.timeout)
            .connect_timeout(http.connect_timeout)
            .build()
            .map_err(ProviderError::Client)?;

        Ok(Self {
            inner: Arc::new(Inner {
                data: ArcSwapOption::empty(),
                remote: Some(Remote { url, client }),
                refresh_interval: config.refresh_interval,
                auto_infer_algorithm: config.auto_infer_algorithm,
            }),
        })
    }

    /// Constructs a provider that serves a fixed key set
    ///
    /// Algorithms are inferred for keys that do not declare one. Refreshing
    /// such a provider never changes its keys.
    pub fn from_jwks(jwks: Jwks) -> Self {
        let this = Self {
            inner: Arc::new(Inner {
                data: ArcSwapOption::empty(),
                remote: None,
                refresh_interval: Duration::from_secs(60 * 60),
                auto_infer_algorithm: true,
            }),
        };

        this.set_jwks(jwks);
        this
    }

    /// The latest successfully loaded snapshot
    ///
    /// # Errors
    ///
    /// No key set has been loaded yet.
    pub fn current_key_set(&self) -> Result<Arc<KeySet>, NoKeysAvailable> {
        self.inner
            .data
            .load_full()
            .ok_or_else(error::no_keys_available)
    }

    /// Replaces the current snapshot with the given key set
    ///
    /// Keys without an algorithm are expanded or discarded, following the
    /// same rules as a remote refresh.
    pub fn set_jwks(&self, jwks: Jwks) {
        let jwks = self.prepare(jwks);
        self.inner.data.store(Some(Arc::new(KeySet::new(jwks))));
    }

    fn prepare(&self, jwks: Jwks) -> Jwks {
        if self.inner.auto_infer_algorithm {
            jwks.with_inferred_algorithms()
        } else {
            jwks.without_undeclared_algorithms()
        }
    }

    /// Makes a single attempt to refresh the key set from the remote URL
    ///
    /// No retries are attempted. If the attempt fails, no change is made to
    /// the current snapshot.
    ///
    /// # Errors
    ///
    /// The request failed, the authority answered with a non-success status,
    /// the body is not a JWKS document, or the document holds no usable keys.
    #[tracing::instrument(skip(self), fields(jwks.url = tracing::field::Empty))]
    pub async fn refresh(&self) -> Result<RefreshOutcome, RefreshError> {
        let Some(remote) = &self.inner.remote else {
            tracing::debug!("key set is fixed; nothing to refresh");
            return Ok(RefreshOutcome::NotModified);
        };

        tracing::Span::current().record("jwks.url", remote.url.as_str());
        tracing::debug!("refreshing JWKS");

        let mut request = remote.client.get(remote.url.clone());
        if let Some(current) = self.inner.data.load().as_deref() {
            if let Some(etag) = &current.etag {
                request = request.header(header::IF_NONE_MATCH, etag);
            } else if let Some(last_modified) = &current.last_modified {
                request = request.header(header::IF_MODIFIED_SINCE, last_modified);
            }
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                let error: &dyn std::error::Error = &err;
                tracing::warn!(error, "JWKS refresh failed; request error");
                return Err(RefreshError::Transport(err));
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            tracing::debug!("JWKS not modified");
            return Ok(RefreshOutcome::NotModified);
        }

        if !status.is_success() {
            tracing::warn!(
                http.status_code = status.as_u16(),
                "JWKS refresh failed; unexpected response status",
            );
            return Err(RefreshError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let etag = response.headers().get(header::ETAG).cloned();
        let last_modified = response.headers().get(header::LAST_MODIFIED).cloned();

        let jwks = match response.json::<Jwks>().await {
            Ok(jwks) => jwks,
            Err(err) => {
                let error: &dyn std::error::Error = &err;
                if err.is_decode() {
                    tracing::warn!(error, "JWKS refresh failed; invalid document");
                    return Err(RefreshError::InvalidDocument(err));
                }

                tracing::warn!(error, "JWKS refresh failed; error reading body");
                return Err(RefreshError::Transport(err));
            }
        };

        let jwks = self.prepare(jwks);
        if jwks.is_empty() {
            tracing::warn!("JWKS refresh failed; no usable keys");
            return Err(RefreshError::NoUsableKeys);
        }

        let keys = jwks.len();
        self.inner.data.store(Some(Arc::new(KeySet {
            jwks,
            etag,
            last_modified,
        })));

        tracing::info!(jwks.keys = keys, "JWKS refreshed");
        Ok(RefreshOutcome::Updated { keys })
    }

    /// Starts a background task that refreshes the key set
    ///
    /// The first attempt happens immediately, then once per configured
    /// interval. Failures are logged and retried on the next tick. The task
    /// runs until the returned handle is shut down or dropped.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_refresh(&self) -> RefreshHandle {
        let this = self.clone();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let period = self.inner.refresh_interval;

        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    () = cancelled.cancelled() => {
                        tracing::debug!("JWKS refresh loop stopped");
                        break;
                    }
                    _ = async {
                        timer.tick().await;
                        this.refresh().await
                    } => {}
                }
            }
        });

        RefreshHandle {
            token,
            task: Some(task),
        }
    }
}

/// Controls a running refresh loop
///
/// Dropping the handle stops the loop without waiting for it.
#[derive(Debug)]
#[must_use = "dropping the handle stops the refresh loop"]
pub struct RefreshHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// The token that stops the loop when cancelled
    ///
    /// Useful to tie the loop to a wider shutdown signal.
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Stops the loop and waits for the task to finish
    ///
    /// A fetch in flight is abandoned.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                let error: &dyn std::error::Error = &err;
                tracing::warn!(error, "JWKS refresh task ended abnormally");
            }
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
