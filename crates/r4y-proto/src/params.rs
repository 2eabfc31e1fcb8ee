//! Catalog fetch parameters and their comparison rules.
//!
//! Two parameter sets select the same playlist when their canonical, resolved
//! forms are equal: defaults filled in, search trimmed, tags sorted and
//! deduplicated.  Both re-fetch triggering and "is this preset selected" go
//! through [`FetchParameters::same_selection`].

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u32 = 30;
pub const DEFAULT_AUDIO_FORMAT: AudioFormat = AudioFormat::Mp32;

/// Audio encodings the catalog can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp31,
    Mp32,
    Ogg,
    Flac,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp31 => "mp31",
            AudioFormat::Mp32 => "mp32",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Flac => "flac",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FetchParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<AudioFormat>,
}

impl FetchParameters {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_audio_format(mut self, format: AudioFormat) -> Self {
        self.audio_format = Some(format);
        self
    }

    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    pub fn effective_audio_format(&self) -> AudioFormat {
        self.audio_format.unwrap_or(DEFAULT_AUDIO_FORMAT)
    }

    /// Trimmed search text, `None` when blank.
    pub fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Copy with every optional field filled with its default.
    pub fn resolved(&self) -> Self {
        Self {
            search: self.search.clone(),
            tags: self.tags.clone(),
            limit: Some(self.effective_limit()),
            audio_format: Some(self.effective_audio_format()),
        }
    }

    /// Order- and whitespace-insensitive form.
    pub fn canonical(&self) -> Self {
        let mut tags: Vec<String> = self
            .tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        tags.sort();
        tags.dedup();
        Self {
            search: self.search_text().map(str::to_string),
            tags,
            limit: self.limit,
            audio_format: self.audio_format,
        }
    }

    pub fn same_selection(&self, other: &Self) -> bool {
        self.resolved().canonical() == other.resolved().canonical()
    }
}
