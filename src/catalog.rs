//! Client side of the storefront: the local session, the catalog API client
//! and the Live TV page model built on top of them.

pub mod browser;
pub mod client;
pub mod session;
