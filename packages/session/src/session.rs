//! Drives [`DatasetSelector`] transitions through an [`IncidentService`].

use incident_map_incident_models::DatasetKind;
use tokio::sync::Mutex;

use crate::{
    DatasetSelector, FetchError, FetchTicket, IncidentService, LatestSnapshot, SelectorConfig,
    SessionError,
};

/// How a fetch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The result was applied; carries the number of records kept.
    Loaded(usize),
    /// A newer fetch superseded this one and the result was dropped.
    Discarded,
}

/// A selector paired with the service that feeds it.
///
/// The selector lock is only held while applying a transition, never
/// across a fetch, so a transition made while a fetch is pending (leaving
/// the near feed, signing out, starting a newer load) supersedes it.
pub struct Session<S> {
    service: S,
    selector: Mutex<DatasetSelector>,
}

impl<S: IncidentService> Session<S> {
    /// Creates a signed-out session showing the latest feed.
    pub fn new(service: S, config: SelectorConfig) -> Self {
        Self {
            service,
            selector: Mutex::new(DatasetSelector::new(config)),
        }
    }

    /// The underlying service.
    pub const fn service(&self) -> &S {
        &self.service
    }

    /// Runs `f` against the current selector state.
    pub async fn read<R>(&self, f: impl FnOnce(&DatasetSelector) -> R) -> R {
        f(&*self.selector.lock().await)
    }

    /// Records a sign-in or sign-out. See
    /// [`DatasetSelector::set_authenticated`].
    pub async fn set_authenticated(&self, authenticated: bool) {
        self.selector.lock().await.set_authenticated(authenticated);
    }

    /// Switches to the latest feed, superseding any pending near fetch.
    pub async fn select_latest(&self) {
        self.selector.lock().await.select_latest();
    }

    /// Loads the latest incidents and police stations.
    ///
    /// A police station failure is logged and leaves the station layer
    /// empty; it does not fail the load.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Fetch`] if the incident fetch fails.
    pub async fn refresh_latest(&self) -> Result<LoadOutcome, SessionError> {
        let (ticket, limit) = {
            let mut selector = self.selector.lock().await;
            (selector.begin_latest_load(), selector.config().latest_limit)
        };

        let incidents = match self.service.fetch_latest(limit).await {
            Ok(incidents) => incidents,
            Err(e) => {
                log::warn!("Failed to fetch latest incidents: {e}");
                let failed = self.selector.lock().await.fail_latest(ticket, &e);
                return match settle(failed)? {
                    Some(()) => Err(e.into()),
                    None => Ok(LoadOutcome::Discarded),
                };
            }
        };

        let police_stations = self
            .service
            .fetch_police_stations()
            .await
            .unwrap_or_else(|e| {
                log::warn!("Failed to fetch police stations: {e}");
                Vec::new()
            });

        let committed = self.selector.lock().await.commit_latest(
            ticket,
            LatestSnapshot {
                incidents,
                police_stations,
            },
        );

        Ok(settle(committed)?.map_or(LoadOutcome::Discarded, LoadOutcome::Loaded))
    }

    /// Switches to the near feed: looks up the home profile, then fetches
    /// the incidents around it.
    ///
    /// # Errors
    ///
    /// * [`SessionError::NotAuthenticated`] if nobody is signed in, or the
    ///   service rejected the session (which also signs it out).
    /// * [`SessionError::NoHomeProfile`] if the user has no usable home
    ///   location. The near feed is left empty.
    /// * [`SessionError::Fetch`] if a lookup fails.
    pub async fn select_near(&self) -> Result<LoadOutcome, SessionError> {
        let ticket = self.selector.lock().await.select_near()?;

        let profile = match self.service.fetch_home_profile().await {
            Ok(profile) => profile,
            Err(e) => return self.near_failed(ticket, e).await,
        };

        let committed = self.selector.lock().await.commit_profile(ticket, profile);
        let Some(query) = settle(committed)? else {
            return Ok(LoadOutcome::Discarded);
        };

        let incidents = match self.service.fetch_near(&query).await {
            Ok(incidents) => incidents,
            Err(e) => return self.near_failed(ticket, e).await,
        };

        let committed = self.selector.lock().await.commit_near(ticket, incidents);
        Ok(settle(committed)?.map_or(LoadOutcome::Discarded, LoadOutcome::Loaded))
    }

    /// Reloads whichever feed the user has selected.
    ///
    /// # Errors
    ///
    /// See [`Self::refresh_latest`] and [`Self::select_near`].
    pub async fn refresh(&self) -> Result<LoadOutcome, SessionError> {
        let selected = self.read(DatasetSelector::selected).await;
        match selected {
            DatasetKind::Latest => self.refresh_latest().await,
            DatasetKind::Near => self.select_near().await,
        }
    }

    async fn near_failed(
        &self,
        ticket: FetchTicket,
        error: FetchError,
    ) -> Result<LoadOutcome, SessionError> {
        let mut selector = self.selector.lock().await;

        if matches!(error, FetchError::Unauthenticated) && selector.is_current(ticket) {
            log::info!("Service rejected the session; signing out");
            selector.set_authenticated(false);
            return Err(SessionError::NotAuthenticated);
        }

        log::warn!("Near lookup failed: {error}");
        let failed = selector.fail_near(ticket, &error);
        drop(selector);

        match settle(failed)? {
            Some(()) => Err(error.into()),
            None => Ok(LoadOutcome::Discarded),
        }
    }
}

/// Turns a stale-result error into `None`; other errors pass through.
fn settle<T>(result: Result<T, SessionError>) -> Result<Option<T>, SessionError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(SessionError::StaleResult {
            channel,
            ticket,
            current,
        }) => {
            log::debug!("Discarding stale {channel} result (ticket {ticket}, current {current})");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
