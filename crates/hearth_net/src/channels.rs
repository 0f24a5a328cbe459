//! Channel names carried on every [`Envelope`](crate::messages::Envelope).
//!
//! State deltas travel on [`REPLICATION`]; each RPC travels on its own
//! `hearth.rpc.<name>` channel.

use crate::error::NetError;

/// Root prefix for every channel.
pub const PREFIX: &str = "hearth";

/// Replication deltas. World → transport.
pub const REPLICATION: &str = "hearth.replication";

const RPC_PREFIX: &str = "hearth.rpc.";

/// Build the channel for RPC `name`.
///
/// `hearth.rpc.<name>`
///
/// # Errors
///
/// [`NetError::InvalidRpcName`] unless `name` is non-empty and made of ASCII
/// letters, digits, `_` or `-`.
pub fn rpc(name: &str) -> Result<String, NetError> {
    validate_rpc_name(name)?;
    Ok(format!("{RPC_PREFIX}{name}"))
}

/// The RPC name carried by `channel`, if it is an RPC channel.
#[must_use]
pub fn rpc_name(channel: &str) -> Option<&str> {
    channel
        .strip_prefix(RPC_PREFIX)
        .filter(|name| validate_rpc_name(name).is_ok())
}

/// Check an RPC name.
///
/// # Errors
///
/// See [`rpc`].
pub fn validate_rpc_name(name: &str) -> Result<(), NetError> {
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(NetError::InvalidRpcName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_channel() {
        assert_eq!(rpc("fire").unwrap(), "hearth.rpc.fire");
        assert_eq!(rpc_name("hearth.rpc.fire"), Some("fire"));
    }

    #[test]
    fn test_rpc_name_rejects_bad_names() {
        assert!(rpc("").is_err());
        assert!(rpc("has space").is_err());
        assert!(rpc("a.b").is_err());
        assert_eq!(rpc_name(REPLICATION), None);
    }
}
