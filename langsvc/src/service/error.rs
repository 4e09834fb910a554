//! Client-side failure modes for the service channel.

use thiserror::Error;

/// Error when submitting a request or awaiting its reply.
///
/// These cover the transport only. Engine-level failures (parse errors, run
/// errors, handles that do not resolve) never appear here; they arrive as
/// typed absences or error handles inside a well-formed reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Request channel is full (backpressure). The caller may retry.
    #[error("service request channel is full")]
    ChannelFull,

    /// Request channel is closed: the daemon has shut down.
    #[error("service has shut down")]
    ChannelClosed,

    /// The daemon dropped the reply sender without answering, which happens
    /// when the channel is severed while the request is in flight.
    #[error("reply abandoned before completion")]
    ReplyAbandoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ClientError::ChannelFull.to_string(),
            "service request channel is full"
        );
        assert_eq!(ClientError::ChannelClosed.to_string(), "service has shut down");
        assert_eq!(
            ClientError::ReplyAbandoned.to_string(),
            "reply abandoned before completion"
        );
    }
}
