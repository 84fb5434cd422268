//! Tray interaction state machine
//!
//! Toolkit independent: the shell translates toolkit callbacks into
//! [`TrayEvent`]s and performs the returned [`TrayAction`]. Menu selections
//! are accepted in every state because on some desktops (AppIndicator) the
//! menu opens without a click event ever being delivered.
//!
//! The machine never touches a pin. A selection yields
//! [`TrayAction::ApplyFeature`]; the shell runs [`apply_feature`] outside any
//! lock and feeds the outcome back as [`TrayEvent::Applied`].
//!
//! Tray toolkits do not report a menu closing without a selection, so
//! `MenuOpen` lasts until the next click, selection or Quit.

use crate::features::{self, FeatureController, FeatureId};
use crate::gpio::PinAccessor;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrayState {
    #[default]
    Idle,
    MenuOpen,
    StatusWindowOpen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayEvent {
    LeftClick,
    RightClick,
    /// A feature's check item was toggled
    Select { feature: FeatureId, on: bool },
    /// A switch requested by `Select` finished
    Applied {
        feature: FeatureId,
        on: bool,
        error: Option<String>,
    },
    /// "Status" menu item
    ShowStatus,
    Quit,
    WindowClosed,
    /// Poll timer fired
    Tick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayAction {
    None,
    ShowMenu,
    OpenStatusWindow,
    FocusStatusWindow,
    /// Switch the feature, then report back with [`TrayEvent::Applied`]
    ApplyFeature { feature: FeatureId, on: bool },
    FeatureSet { feature: FeatureId, on: bool },
    FeatureFailed { feature: FeatureId, message: String },
    Quit,
}

#[derive(Debug, Default)]
pub struct TrayMachine {
    state: TrayState,
    status_text: Option<String>,
}

impl TrayMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TrayState {
        self.state
    }

    /// Last set failure, shown in the status window until the next success
    pub fn status_text(&self) -> Option<&str> {
        self.status_text.as_deref()
    }

    pub fn handle(&mut self, event: TrayEvent) -> TrayAction {
        use TrayState::*;

        let (next, action) = match (self.state, event.clone()) {
            (state, TrayEvent::Tick) => (state, TrayAction::None),
            (_, TrayEvent::Quit) => (Idle, TrayAction::Quit),

            // Switching from the status window leaves it open
            (StatusWindowOpen, TrayEvent::Select { feature, on }) => {
                (StatusWindowOpen, TrayAction::ApplyFeature { feature, on })
            }
            (Idle | MenuOpen, TrayEvent::Select { feature, on }) => {
                (Idle, TrayAction::ApplyFeature { feature, on })
            }
            (state, TrayEvent::Applied { feature, on, error }) => (state, self.applied(feature, on, error)),

            (Idle | MenuOpen, TrayEvent::LeftClick | TrayEvent::ShowStatus) => {
                (StatusWindowOpen, TrayAction::OpenStatusWindow)
            }
            (StatusWindowOpen, TrayEvent::LeftClick | TrayEvent::ShowStatus) => {
                (StatusWindowOpen, TrayAction::FocusStatusWindow)
            }
            (_, TrayEvent::RightClick) => (MenuOpen, TrayAction::ShowMenu),

            (_, TrayEvent::WindowClosed) => (Idle, TrayAction::None),
        };

        if next != self.state {
            log::debug!("Tray {:?} -> {:?} on {:?}", self.state, next, event);
        }
        self.state = next;
        action
    }

    fn applied(&mut self, feature: FeatureId, on: bool, error: Option<String>) -> TrayAction {
        match error {
            None => {
                self.status_text = None;
                TrayAction::FeatureSet { feature, on }
            }
            Some(message) => {
                self.status_text = Some(message.clone());
                TrayAction::FeatureFailed { feature, message }
            }
        }
    }
}

/// Switch a feature on the blocking pool and describe the outcome as an event
pub async fn apply_feature<P>(controller: Arc<FeatureController<P>>, feature: FeatureId, on: bool) -> TrayEvent
where
    P: PinAccessor + 'static,
{
    let outcome =
        tokio::task::spawn_blocking(move || controller.set_enabled(features::get(feature), on)).await;

    let error = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => {
            log::warn!("Failed to switch {} {}: {}", feature, if on { "on" } else { "off" }, e);
            Some(e.to_string())
        }
        Err(e) => Some(format!("switch task failed: {}", e)),
    };

    TrayEvent::Applied { feature, on, error }
}
