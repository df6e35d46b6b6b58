use serde::{Deserialize, Serialize};

/// Panels of the front end. Exactly one is current at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Home,
    Scan,
    History,
    Settings,
    Saved,
    Preferences,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavEvent {
    GoHome,
    StartScan,
    CaptureCancelled,
    OpenHistory,
    OpenSaved,
    OpenSettings,
    OpenPreferences,
    Back,
}

impl View {
    /// Next view for `event`, or `None` when the transition is not allowed.
    pub fn transition(self, event: NavEvent) -> Option<View> {
        use NavEvent::*;
        use View::*;

        match (self, event) {
            (_, GoHome) => Some(Home),
            // scan button is ignored while a scan is in progress
            (Scan, StartScan) => None,
            (_, StartScan) => Some(Scan),
            (Scan, CaptureCancelled) => Some(Home),
            (_, CaptureCancelled) => None,
            (_, OpenHistory) => Some(History),
            (_, OpenSaved) => Some(Saved),
            (_, OpenSettings) => Some(Settings),
            (Settings, OpenPreferences) => Some(Preferences),
            (_, OpenPreferences) => None,
            (Preferences, Back) => Some(Settings),
            (Scan | History | Saved | Settings, Back) => Some(Home),
            (Home, Back) => None,
        }
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            View::Home => "home",
            View::Scan => "scan",
            View::History => "history",
            View::Settings => "settings",
            View::Saved => "saved",
            View::Preferences => "preferences",
        };
        write!(f, "{}", s)
    }
}
