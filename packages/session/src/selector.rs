//! Which collection feeds the map, and the state of each pending fetch.

use std::fmt;

use incident_map_filter::FilterVocabulary;
use incident_map_incident_models::{
    DatasetKind, HomeLocation, HomeProfile, IncidentPoint, PoliceStationPoint, sanitize_incidents,
    sanitize_police_stations,
};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use crate::{Channel, FetchError, NearQuery, SessionError};

/// Default cap on the number of incidents in the latest feed.
pub const LATEST_FETCH_LIMIT: usize = 30_000;

/// Default cap on the number of incidents in the near feed.
pub const NEAR_FETCH_LIMIT: usize = 1_000;

/// Result-count caps for each feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorConfig {
    /// Maximum incidents requested for the latest feed.
    pub latest_limit: usize,
    /// Maximum incidents requested for the near feed.
    pub near_limit: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            latest_limit: LATEST_FETCH_LIMIT,
            near_limit: NEAR_FETCH_LIMIT,
        }
    }
}

/// What is known about the signed-in user's home location.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HomeStatus {
    /// Not looked up yet, or the lookup failed.
    #[default]
    Unknown,
    /// The profile has no usable coordinates.
    Unset,
    /// The profile has usable coordinates.
    Set,
}

/// A user-actionable explanation of why the near feed is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NearCondition {
    /// The user has not saved a home location.
    NoHomeProfile,
    /// The profile or incident lookup failed.
    FetchFailed(String),
}

impl fmt::Display for NearCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoHomeProfile => {
                f.write_str("Home location not set. Save one from the dashboard first.")
            }
            Self::FetchFailed(message) => write!(f, "Could not load nearby incidents: {message}"),
        }
    }
}

/// Identifies one in-flight fetch.
///
/// Only the ticket matching its channel's current generation may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    channel: Channel,
    generation: u64,
}

impl FetchTicket {
    /// Pipeline this ticket belongs to.
    #[must_use]
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// Generation the fetch was started under.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// A completed latest-feed fetch.
#[derive(Debug, Clone, Default)]
pub struct LatestSnapshot {
    /// Incidents as received.
    pub incidents: Vec<IncidentPoint>,
    /// Police stations as received.
    pub police_stations: Vec<PoliceStationPoint>,
}

/// Chooses between the latest and near collections and tracks their
/// loading state.
///
/// Every transition is a plain method on `&mut self`; no I/O happens here.
/// See [`crate::Session`] for the driver that performs the fetches.
#[derive(Debug, Clone)]
pub struct DatasetSelector {
    config: SelectorConfig,
    authenticated: bool,
    selected: DatasetKind,

    latest: Vec<IncidentPoint>,
    police_stations: Vec<PoliceStationPoint>,
    vocabulary: FilterVocabulary,
    latest_loading: bool,
    latest_error: Option<String>,
    latest_generation: u64,

    home_status: HomeStatus,
    home: Option<HomeLocation>,
    near: Vec<IncidentPoint>,
    near_loading: bool,
    near_condition: Option<NearCondition>,
    near_generation: u64,
}

impl Default for DatasetSelector {
    fn default() -> Self {
        Self::new(SelectorConfig::default())
    }
}

impl DatasetSelector {
    /// Creates an unauthenticated selector showing the latest feed.
    #[must_use]
    pub fn new(config: SelectorConfig) -> Self {
        Self {
            config,
            authenticated: false,
            selected: DatasetKind::Latest,
            latest: Vec::new(),
            police_stations: Vec::new(),
            vocabulary: FilterVocabulary::default(),
            latest_loading: false,
            latest_error: None,
            latest_generation: 0,
            home_status: HomeStatus::Unknown,
            home: None,
            near: Vec::new(),
            near_loading: false,
            near_condition: None,
            near_generation: 0,
        }
    }

    /// Feed size caps.
    #[must_use]
    pub const fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// The dataset the user asked for.
    #[must_use]
    pub const fn selected(&self) -> DatasetKind {
        self.selected
    }

    /// The dataset actually shown.
    ///
    /// Near only once the user is signed in and the home profile resolved
    /// to a usable location; the latest feed is shown otherwise.
    #[must_use]
    pub fn effective(&self) -> DatasetKind {
        if self.selected == DatasetKind::Near
            && self.authenticated
            && self.home_status == HomeStatus::Set
        {
            DatasetKind::Near
        } else {
            DatasetKind::Latest
        }
    }

    /// Incidents of the [effective](Self::effective) dataset.
    #[must_use]
    pub fn active_incidents(&self) -> &[IncidentPoint] {
        match self.effective() {
            DatasetKind::Latest => &self.latest,
            DatasetKind::Near => &self.near,
        }
    }

    /// Incidents of the latest feed.
    #[must_use]
    pub fn latest_incidents(&self) -> &[IncidentPoint] {
        &self.latest
    }

    /// Incidents of the near feed.
    #[must_use]
    pub fn near_incidents(&self) -> &[IncidentPoint] {
        &self.near
    }

    /// Police stations from the last latest-feed load.
    #[must_use]
    pub fn police_stations(&self) -> &[PoliceStationPoint] {
        &self.police_stations
    }

    /// Filter options, derived from the latest feed only.
    #[must_use]
    pub const fn vocabulary(&self) -> &FilterVocabulary {
        &self.vocabulary
    }

    /// Home profile status.
    #[must_use]
    pub const fn home_status(&self) -> HomeStatus {
        self.home_status
    }

    /// The resolved home location, once the status is [`HomeStatus::Set`].
    #[must_use]
    pub const fn home(&self) -> Option<&HomeLocation> {
        self.home.as_ref()
    }

    /// Why the near feed is empty, if there is something to tell the user.
    #[must_use]
    pub const fn near_condition(&self) -> Option<&NearCondition> {
        self.near_condition.as_ref()
    }

    /// Last latest-feed failure, cleared by the next successful load.
    #[must_use]
    pub fn latest_error(&self) -> Option<&str> {
        self.latest_error.as_deref()
    }

    /// Whether a fetch is pending for the given dataset.
    #[must_use]
    pub const fn is_loading(&self, kind: DatasetKind) -> bool {
        match kind {
            DatasetKind::Latest => self.latest_loading,
            DatasetKind::Near => self.near_loading,
        }
    }

    /// Whether `ticket` may still commit.
    #[must_use]
    pub const fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.generation == self.generation(ticket.channel)
    }

    /// Records a sign-in or sign-out.
    ///
    /// Signing out forces the latest feed, discards any near state and
    /// invalidates pending near fetches.
    pub fn set_authenticated(&mut self, authenticated: bool) {
        if self.authenticated == authenticated {
            return;
        }
        self.authenticated = authenticated;

        if !authenticated {
            if self.selected == DatasetKind::Near {
                log::info!("Signed out while viewing near incidents; switching to latest");
            }
            self.selected = DatasetKind::Latest;
            self.reset_near();
        }
    }

    /// Switches to the latest feed and invalidates any pending near fetch.
    pub fn select_latest(&mut self) {
        if self.selected == DatasetKind::Near {
            log::debug!("Leaving near dataset");
            self.near_generation += 1;
            self.near_loading = false;
        }
        self.selected = DatasetKind::Latest;
    }

    /// Switches to the near feed and starts a home profile lookup.
    ///
    /// Re-entering the near feed always starts over from
    /// [`HomeStatus::Unknown`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotAuthenticated`] if nobody is signed in;
    /// the selection is left unchanged.
    pub fn select_near(&mut self) -> Result<FetchTicket, SessionError> {
        if !self.authenticated {
            return Err(SessionError::NotAuthenticated);
        }

        self.reset_near();
        self.selected = DatasetKind::Near;
        self.near_loading = true;

        Ok(self.ticket(Channel::Near))
    }

    /// Starts a latest-feed load, superseding any load in flight.
    pub fn begin_latest_load(&mut self) -> FetchTicket {
        self.latest_generation += 1;
        self.latest_loading = true;
        self.ticket(Channel::Latest)
    }

    /// Applies a completed latest-feed load and rebuilds the filter
    /// vocabulary from it. Returns the number of incidents kept.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::StaleResult`] if a newer load was started;
    /// nothing is applied in that case.
    pub fn commit_latest(
        &mut self,
        ticket: FetchTicket,
        snapshot: LatestSnapshot,
    ) -> Result<usize, SessionError> {
        self.check(ticket)?;

        self.latest = sanitize_incidents(snapshot.incidents, DatasetKind::Latest);
        self.police_stations = sanitize_police_stations(snapshot.police_stations);
        self.vocabulary = FilterVocabulary::from_incidents(&self.latest);
        self.latest_loading = false;
        self.latest_error = None;

        log::debug!(
            "Loaded {} latest incidents and {} police stations",
            self.latest.len(),
            self.police_stations.len()
        );

        Ok(self.latest.len())
    }

    /// Records a failed latest-feed load. Previously loaded data is kept.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::StaleResult`] if a newer load was started.
    pub fn fail_latest(&mut self, ticket: FetchTicket, error: &FetchError) -> Result<(), SessionError> {
        self.check(ticket)?;
        self.latest_loading = false;
        self.latest_error = Some(error.to_string());
        Ok(())
    }

    /// Applies the home profile lookup.
    ///
    /// With a usable location the status becomes [`HomeStatus::Set`] and
    /// the query for the scoped fetch is returned; the same ticket is used
    /// to commit that fetch.
    ///
    /// # Errors
    ///
    /// * [`SessionError::StaleResult`] if the near feed was left or
    ///   re-entered since the ticket was issued.
    /// * [`SessionError::NoHomeProfile`] if the profile is missing or has
    ///   no usable coordinates. The status becomes [`HomeStatus::Unset`]
    ///   and the near feed is emptied.
    pub fn commit_profile(
        &mut self,
        ticket: FetchTicket,
        profile: Option<HomeProfile>,
    ) -> Result<NearQuery, SessionError> {
        self.check(ticket)?;

        let Some(home) = profile.as_ref().and_then(HomeProfile::location) else {
            log::debug!("Home profile has no usable coordinates");
            self.home_status = HomeStatus::Unset;
            self.home = None;
            self.near.clear();
            self.near_loading = false;
            self.near_condition = Some(NearCondition::NoHomeProfile);
            return Err(SessionError::NoHomeProfile);
        };

        log::debug!(
            "Home set at ({}, {}) with radius {} m",
            home.latitude,
            home.longitude,
            home.radius_m
        );
        self.home_status = HomeStatus::Set;
        self.home = Some(home);
        self.near_condition = None;

        Ok(NearQuery {
            latitude: home.latitude,
            longitude: home.longitude,
            radius_m: home.radius_m,
            limit: self.config.near_limit,
        })
    }

    /// Applies the scoped incident fetch. Returns the number of incidents
    /// kept.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::StaleResult`] if the near feed was left or
    /// re-entered since the ticket was issued.
    pub fn commit_near(
        &mut self,
        ticket: FetchTicket,
        incidents: Vec<IncidentPoint>,
    ) -> Result<usize, SessionError> {
        self.check(ticket)?;

        self.near = sanitize_incidents(incidents, DatasetKind::Near);
        self.near_loading = false;

        log::debug!("Loaded {} near incidents", self.near.len());

        Ok(self.near.len())
    }

    /// Records a failed profile or scoped-incident lookup.
    ///
    /// The status returns to [`HomeStatus::Unknown`]: a failed lookup says
    /// nothing about whether a home location exists.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::StaleResult`] if the near feed was left or
    /// re-entered since the ticket was issued.
    pub fn fail_near(&mut self, ticket: FetchTicket, error: &FetchError) -> Result<(), SessionError> {
        self.check(ticket)?;

        self.home_status = HomeStatus::Unknown;
        self.home = None;
        self.near.clear();
        self.near_loading = false;
        self.near_condition = Some(NearCondition::FetchFailed(error.to_string()));
        Ok(())
    }

    const fn generation(&self, channel: Channel) -> u64 {
        match channel {
            Channel::Latest => self.latest_generation,
            Channel::Near => self.near_generation,
        }
    }

    const fn ticket(&self, channel: Channel) -> FetchTicket {
        FetchTicket {
            channel,
            generation: self.generation(channel),
        }
    }

    fn check(&self, ticket: FetchTicket) -> Result<(), SessionError> {
        let current = self.generation(ticket.channel);
        if ticket.generation == current {
            Ok(())
        } else {
            Err(SessionError::StaleResult {
                channel: ticket.channel,
                ticket: ticket.generation,
                current,
            })
        }
    }

    fn reset_near(&mut self) {
        self.near_generation += 1;
        self.home_status = HomeStatus::Unknown;
        self.home = None;
        self.near.clear();
        self.near_loading = false;
        self.near_condition = None;
    }
}
