//! Monte-Carlo binned 3D reddening/extinction maps.
//!
//! Dustmap turns a catalog of individually measured stellar reddening and
//! extinction values (each carrying positional and measurement errors)
//! into a discretized map over galactic latitude, longitude, and
//! distance, and answers queries against the saved map. Per-voxel means
//! and standard deviations are estimated by resampling every star's
//! measured values within their errors, so measurement uncertainty
//! propagates into the map itself.

pub mod aggregate;
pub mod builder;
pub mod catalog;
pub mod grid;
pub mod map;
pub mod resample;
