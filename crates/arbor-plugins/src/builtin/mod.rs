//! Plugins shipped with arbor

pub mod e2e;

pub use e2e::{E2E_APP_LINK, E2eAppLinkProcessor};
