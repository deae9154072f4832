//! Client configuration.

use std::num::NonZeroUsize;

use courier_core::ConnectionConfig;
use courier_proto::{EndpointError, RoomId};
use url::Url;

/// Messages per page the server sends on reset and on older-page requests.
pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(5) {
    Some(size) => size,
    None => unreachable!(),
};

/// Configuration for [`crate::Client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Socket endpoint and reconnect policy.
    pub connection: ConnectionConfig,
    /// Page size used to decide whether older history may exist.
    pub page_size: NonZeroUsize,
    /// Room to select on the first connection, before any explicit switch.
    pub initial_room: Option<RoomId>,
}

impl ClientConfig {
    /// Default config for an already derived socket endpoint.
    pub fn new(endpoint: Url) -> Self {
        Self {
            connection: ConnectionConfig::new(endpoint),
            page_size: DEFAULT_PAGE_SIZE,
            initial_room: None,
        }
    }

    /// Default config whose endpoint is derived from the HTTP API base URL.
    pub fn from_base_url(base: &Url) -> Result<Self, EndpointError> {
        Ok(Self {
            connection: ConnectionConfig::from_base_url(base)?,
            page_size: DEFAULT_PAGE_SIZE,
            initial_room: None,
        })
    }
}
