//! Availability mapping between client codes and provider statuses

use serde::{Deserialize, Serialize};

/// Presence primitives understood by the protocol provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderStatus {
    Unset,
    Offline,
    Available,
    Unavailable,
    Invisible,
    Away,
    ExtendedAway,
    Mobile,
    Tune,
}

/// Availability as clients encode it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClientAvailability {
    #[default]
    Available,
    Mobile,
    Away,
    Invisible,
    Offline,
    /// Sentinel for "no status reported"
    Unset,
}

impl ClientAvailability {
    pub const fn code(self) -> i32 {
        match self {
            ClientAvailability::Available => 0,
            ClientAvailability::Mobile => 1,
            ClientAvailability::Away => 2,
            ClientAvailability::Invisible => 3,
            ClientAvailability::Offline => 4,
            ClientAvailability::Unset => 6,
        }
    }

    /// Decode a client code; unknown values read as offline
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => ClientAvailability::Available,
            1 => ClientAvailability::Mobile,
            2 => ClientAvailability::Away,
            3 => ClientAvailability::Invisible,
            6 => ClientAvailability::Unset,
            _ => ClientAvailability::Offline,
        }
    }

    /// Provider status to request for this availability
    pub const fn to_provider(self) -> ProviderStatus {
        match self {
            ClientAvailability::Available => ProviderStatus::Available,
            ClientAvailability::Mobile => ProviderStatus::Mobile,
            ClientAvailability::Away => ProviderStatus::Away,
            ClientAvailability::Invisible => ProviderStatus::Invisible,
            ClientAvailability::Offline | ClientAvailability::Unset => ProviderStatus::Offline,
        }
    }
}

impl From<ProviderStatus> for ClientAvailability {
    fn from(status: ProviderStatus) -> Self {
        match status {
            ProviderStatus::Unset => ClientAvailability::Unset,
            ProviderStatus::Offline => ClientAvailability::Offline,
            ProviderStatus::Available | ProviderStatus::Tune => ClientAvailability::Available,
            ProviderStatus::Unavailable | ProviderStatus::Away | ProviderStatus::ExtendedAway => {
                ClientAvailability::Away
            }
            ProviderStatus::Invisible => ClientAvailability::Invisible,
            ProviderStatus::Mobile => ClientAvailability::Mobile,
        }
    }
}

/// Map a client code to the provider status to set
pub fn to_provider_status(code: i32) -> ProviderStatus {
    ClientAvailability::from_code(code).to_provider()
}

/// Map a provider status to the client code to report
pub fn to_client_code(status: ProviderStatus) -> i32 {
    ClientAvailability::from(status).code()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_table() {
        assert_eq!(to_provider_status(0), ProviderStatus::Available);
        assert_eq!(to_provider_status(1), ProviderStatus::Mobile);
        assert_eq!(to_provider_status(2), ProviderStatus::Away);
        assert_eq!(to_provider_status(3), ProviderStatus::Invisible);
        assert_eq!(to_provider_status(4), ProviderStatus::Offline);
        assert_eq!(to_provider_status(6), ProviderStatus::Offline);
        assert_eq!(to_provider_status(42), ProviderStatus::Offline);
        assert_eq!(to_provider_status(-1), ProviderStatus::Offline);
    }

    #[test]
    fn test_inbound_table() {
        let expected = [
            (ProviderStatus::Unset, 6),
            (ProviderStatus::Offline, 4),
            (ProviderStatus::Available, 0),
            (ProviderStatus::Unavailable, 2),
            (ProviderStatus::Invisible, 3),
            (ProviderStatus::Away, 2),
            (ProviderStatus::ExtendedAway, 2),
            (ProviderStatus::Mobile, 1),
            (ProviderStatus::Tune, 0),
        ];
        for (status, code) in expected {
            assert_eq!(to_client_code(status), code, "{status:?}");
        }
    }
}
