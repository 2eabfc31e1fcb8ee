//! Curated catalog selections shown on the home page picker.

use r4y_proto::params::FetchParameters;

use crate::intent::PlaybackIntent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub id: &'static str,
    pub title: &'static str,
    pub subtitle: &'static str,
    /// Free-text catalog search the preset stands for.
    pub search: &'static str,
}

impl Preset {
    pub fn params(&self) -> FetchParameters {
        FetchParameters::search(self.search)
    }

    /// Highlight state: does the intent currently point at this preset?
    pub fn is_selected(&self, intent: &PlaybackIntent) -> bool {
        intent.is_selected(&self.params())
    }

    /// The picker gesture: switch playlist and start playing.
    pub fn activate(&self, intent: &PlaybackIntent) {
        intent.select(self.params());
    }
}

pub const PRESETS: [Preset; 6] = [
    Preset {
        id: "fresh",
        title: "Fresh Pop",
        subtitle: "New releases",
        search: "pop",
    },
    Preset {
        id: "chill",
        title: "Chill & Lounge",
        subtitle: "Unwind",
        search: "chill",
    },
    Preset {
        id: "electro",
        title: "Electro Boost",
        subtitle: "Energy",
        search: "electro",
    },
    Preset {
        id: "rock",
        title: "Rock / Indie",
        subtitle: "Guitars",
        search: "rock",
    },
    Preset {
        id: "lofi",
        title: "Lo-fi Focus",
        subtitle: "Concentration",
        search: "lofi",
    },
    Preset {
        id: "hiphop",
        title: "Hip-Hop / R&B",
        subtitle: "Beats & Flow",
        search: "hip hop rnb",
    },
];

pub fn find(id: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.id == id)
}

/// Preset matching `params`, if any.
pub fn selected_preset(params: &FetchParameters) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.params().same_selection(params))
}
