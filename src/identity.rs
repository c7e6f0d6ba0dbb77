//! Identity provider boundary types.
//!
//! The identity provider is external; this crate only consumes a stable
//! participant id plus a display string.

use derive_getters::Getters;
use derive_new::new;

/// Fallback label when no usable display name is available.
pub const UNKNOWN_PLAYER: &str = "Unknown player";

/// A participant as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct Identity {
    /// Stable participant id.
    id: String,
    /// Display name, possibly an e-mail fallback.
    display_name: String,
}

impl Identity {
    /// Display name suitable for showing to other players.
    ///
    /// An e-mail address is not used as a display string; the fixed
    /// unknown-player label stands in instead.
    pub fn public_name(&self) -> String {
        if self.display_name.is_empty() || self.display_name.contains('@') {
            UNKNOWN_PLAYER.to_string()
        } else {
            self.display_name.clone()
        }
    }
}
