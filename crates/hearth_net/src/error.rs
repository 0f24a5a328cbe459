//! Network-layer error types.

use hearth_component::EcsError;

/// Errors that can occur while building or reading wire messages.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Failed to encode a message to MessagePack.
    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a message from MessagePack.
    #[error("failed to decode message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// A frame held more than one value.
    #[error("{0} unexpected bytes after the message")]
    TrailingBytes(usize),

    /// An RPC name that cannot form a channel.
    #[error("invalid rpc name `{0}`")]
    InvalidRpcName(String),

    /// An envelope arrived on a channel this side does not understand.
    #[error("unexpected channel `{0}`")]
    UnexpectedChannel(String),
}

impl From<NetError> for EcsError {
    fn from(err: NetError) -> Self {
        match err {
            NetError::Encode(e) => EcsError::Encode(e),
            NetError::Decode(e) => EcsError::Decode(e),
            NetError::TrailingBytes(extra) => {
                EcsError::failed(format!("{extra} unexpected bytes after the message"))
            }
            other => EcsError::InvalidArgument(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use hearth_component::ErrorCode;

    use super::*;

    #[test]
    fn test_channel_errors_are_invalid_arguments() {
        let err: EcsError = NetError::InvalidRpcName(String::new()).into();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_codec_errors_are_operation_failures() {
        let decode = rmp_serde::from_slice::<u32>(&[0xc1]).unwrap_err();
        let err: EcsError = NetError::Decode(decode).into();
        assert_eq!(err.code(), ErrorCode::OperationFailed);

        let err: EcsError = NetError::TrailingBytes(3).into();
        assert_eq!(err.code(), ErrorCode::OperationFailed);
    }
}
