//! Per-connection stream session state.

use super::FeatureMask;
use crate::error::{HomeError, Result};

/// Lifecycle of one `ReadAtmosphere` stream.
///
/// `Unconfigured` until the first feature mask arrives, `Active` while
/// readings flow, `Closed` once the client leaves or an error ends the stream.
/// Later masks replace the active one. A mask selecting nothing is valid and
/// keeps the session alive with all-zero readings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Unconfigured,
    Active(FeatureMask),
    Closed,
}

/// Effect of a mask sent by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskUpdate {
    /// First mask; emission starts.
    Started,
    /// A different mask replaced the active one.
    Replaced,
    /// Same mask as the active one.
    Unchanged,
    /// The session is already closed.
    Ignored,
}

impl SessionState {
    /// Apply a mask sent by the client.
    pub fn configure(&mut self, mask: FeatureMask) -> MaskUpdate {
        match *self {
            SessionState::Unconfigured => {
                *self = SessionState::Active(mask);
                MaskUpdate::Started
            }
            SessionState::Active(current) if current == mask => MaskUpdate::Unchanged,
            SessionState::Active(_) => {
                *self = SessionState::Active(mask);
                MaskUpdate::Replaced
            }
            SessionState::Closed => MaskUpdate::Ignored,
        }
    }

    /// The client finished its inbound direction.
    ///
    /// Finishing before any mask was received is a configuration error.
    pub fn inbound_closed(&mut self) -> Result<()> {
        let was = std::mem::replace(self, SessionState::Closed);
        match was {
            SessionState::Unconfigured => Err(HomeError::Unconfigured),
            _ => Ok(()),
        }
    }

    pub fn close(&mut self) {
        *self = SessionState::Closed;
    }

    /// Mask readings should currently be taken with, if any.
    pub fn active_mask(&self) -> Option<FeatureMask> {
        match self {
            SessionState::Active(mask) => Some(*mask),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    const TEMPERATURE: FeatureMask = FeatureMask {
        temperature: true,
        pressure: false,
        humidity: false,
        altitude: false,
    };

    const HUMIDITY: FeatureMask = FeatureMask {
        temperature: false,
        pressure: false,
        humidity: true,
        altitude: false,
    };

    #[test]
    fn test_first_mask_activates() {
        let mut state = SessionState::default();
        assert_eq!(state.active_mask(), None);

        assert_eq!(state.configure(TEMPERATURE), MaskUpdate::Started);
        assert_eq!(state, SessionState::Active(TEMPERATURE));
    }

    #[test]
    fn test_later_mask_replaces() {
        let mut state = SessionState::default();
        state.configure(TEMPERATURE);

        assert_eq!(state.configure(HUMIDITY), MaskUpdate::Replaced);
        assert_eq!(state.active_mask(), Some(HUMIDITY));
        assert_eq!(state.configure(HUMIDITY), MaskUpdate::Unchanged);
    }

    #[test]
    fn test_empty_mask_keeps_session_active() {
        let mut state = SessionState::default();
        assert_eq!(state.configure(FeatureMask::default()), MaskUpdate::Started);
        assert_eq!(state.active_mask(), Some(FeatureMask::default()));

        assert_eq!(state.configure(TEMPERATURE), MaskUpdate::Replaced);
        assert_eq!(state.configure(FeatureMask::default()), MaskUpdate::Replaced);
        assert!(!state.is_closed());
        assert_eq!(state.active_mask(), Some(FeatureMask::default()));
    }

    #[test]
    fn test_inbound_close_before_configuration_is_error() {
        let mut state = SessionState::default();
        let err = assert_err!(state.inbound_closed());
        assert!(matches!(err, HomeError::Unconfigured));
        assert!(state.is_closed());
    }

    #[test]
    fn test_inbound_close_when_active_is_clean() {
        let mut state = SessionState::default();
        state.configure(TEMPERATURE);
        assert_ok!(state.inbound_closed());
        assert!(state.is_closed());
        assert_eq!(state.active_mask(), None);
    }

    #[test]
    fn test_closed_session_ignores_masks() {
        let mut state = SessionState::default();
        state.close();
        assert_eq!(state.configure(TEMPERATURE), MaskUpdate::Ignored);
        assert!(state.is_closed());
    }
}
