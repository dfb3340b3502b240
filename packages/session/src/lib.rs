#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Session state for the incident map.
//!
//! [`DatasetSelector`] decides which upstream collection feeds the map and
//! tracks loading state per source. Fetches go through the
//! [`IncidentService`] collaborator and are tagged with a [`FetchTicket`];
//! a result whose ticket no longer matches the selector's current
//! generation is discarded instead of applied. [`Session`] drives those
//! fetches, [`hover::HoverLink`] carries the list/map highlight, and
//! [`frame::build_frame`] assembles everything into one render frame.

pub mod frame;
pub mod hover;
mod selector;
mod service;
mod session;

use strum_macros::{AsRefStr, Display};

pub use selector::{
    DatasetSelector, FetchTicket, HomeStatus, LATEST_FETCH_LIMIT, LatestSnapshot,
    NEAR_FETCH_LIMIT, NearCondition, SelectorConfig,
};
pub use service::{FetchError, IncidentService, NearQuery};
pub use session::{LoadOutcome, Session};

/// Independent fetch pipelines, each with its own generation counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Channel {
    /// Global incidents and police stations.
    Latest,
    /// Home profile lookup followed by the scoped incident fetch.
    Near,
}

/// Errors raised by session transitions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The near dataset requires a signed-in user.
    #[error("the near dataset requires a signed-in user")]
    NotAuthenticated,

    /// The signed-in user has no usable home location.
    #[error("{}", NearCondition::NoHomeProfile)]
    NoHomeProfile,

    /// A fetch finished after a newer one was started.
    #[error("stale {channel} result (ticket {ticket}, current {current})")]
    StaleResult {
        /// Pipeline the result belongs to.
        channel: Channel,
        /// Generation the fetch was started under.
        ticket: u64,
        /// Generation the selector is at now.
        current: u64,
    },

    /// The collaborator failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
