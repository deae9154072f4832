//! Socket endpoint derivation.
//!
//! The client is configured with the HTTP base URL of the API. The chat socket
//! lives under that base with the scheme swapped for its socket counterpart:
//!
//! ```text
//! http://host/api   ->  ws://host/api/chat/websocket
//! https://host      ->  wss://host/chat/websocket
//! ```

use url::Url;

use crate::errors::EndpointError;

/// Path of the chat endpoint, relative to the API base.
pub const SOCKET_PATH: &str = "chat/websocket";

/// Derive the chat socket URL from the API base URL.
///
/// `http` maps to `ws` and `https` to `wss`. Socket schemes pass through
/// unchanged. Query and fragment of the base are dropped.
pub fn socket_url(base: &Url) -> Result<Url, EndpointError> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(EndpointError::UnsupportedScheme { scheme: other.to_string() }),
    };

    let mut url = base.clone();
    url.set_scheme(scheme)
        .map_err(|()| EndpointError::UnsupportedScheme { scheme: base.scheme().to_string() })?;
    url.set_query(None);
    url.set_fragment(None);

    url.path_segments_mut()
        .map_err(|()| EndpointError::CannotBeABase(base.to_string()))?
        .pop_if_empty()
        .extend(SOCKET_PATH.split('/'));

    Ok(url)
}
