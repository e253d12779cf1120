use serde::Serialize;
use strum::{Display, EnumString};

/// Coarse service lifecycle as seen by a view.
///
/// Derived each tick from the service's `ready` flag, forced to `Error` on a
/// poll failure that is not suppressed, or forced to `Restarting` locally
/// when the user triggers a restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadinessState {
    #[default]
    Initializing,
    Ready,
    Error,
    Restarting,
}

impl ReadinessState {
    pub fn from_ready(ready: bool) -> Self {
        if ready { Self::Ready } else { Self::Initializing }
    }

    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn renders_upper_case() {
        assert_eq!(ReadinessState::Initializing.to_string(), "INITIALIZING");
        assert_eq!(ReadinessState::from_ready(true).to_string(), "READY");
        assert_eq!("RESTARTING".parse::<ReadinessState>().unwrap(), ReadinessState::Restarting);
    }
}
