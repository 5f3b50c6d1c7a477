//! Shared model and viewport-synchronization core for the Asphalt Alert
//! clients and hazard feed.
pub mod bounds;
pub mod cluster;
pub mod debounce;
pub mod fetch;
pub mod locate;
pub mod models;
pub mod normalize;
pub mod registry;
pub mod submission;
pub mod sync;
