#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Small, total geometric helpers used by the declusterer.
//!
//! - [`key`]: canonical grouping keys from rounded coordinates.
//! - [`hash`]: a 32-bit FNV-1a fold turning record ids into stable unit
//!   values.
//! - [`distance`]: meter/degree conversion at a given latitude.
//!
//! Every function here is pure and defined for all finite inputs.

pub mod distance;
pub mod hash;
pub mod key;

pub use distance::{DegreeDelta, great_circle_meters, meters_to_degrees};
pub use hash::hash_to_unit;
pub use key::{DEFAULT_KEY_PRECISION, GeoKey};
