//! HTTP adapters for the remote score service.
//!
//! [`ScoreServiceClient`] speaks the service's JSON API and implements the
//! core `RemoteScoreService` port; [`TokenIdentityProvider`] and
//! [`HttpReachabilityProbe`] cover the identity and reachability ports.

mod client;
pub mod error;
mod identity;
mod probe;
pub mod types;

#[cfg(test)]
mod test_server;

pub use client::ScoreServiceClient;
pub use error::{RemoteClientError, Result};
pub use identity::TokenIdentityProvider;
pub use probe::HttpReachabilityProbe;
