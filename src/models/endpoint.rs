use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of remote resources the console knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Endpoint {
    Color,
    Cat,
    RandomPhoto,
    Time,
    Joke,
    Scare,
    Lookalike,
    Health,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown endpoint {0:?}")]
pub struct UnknownEndpoint(pub String);

impl Endpoint {
    /// Endpoints that own a value slot on the dashboard.
    pub const TRACKED: [Endpoint; 7] = [
        Endpoint::Color,
        Endpoint::Cat,
        Endpoint::RandomPhoto,
        Endpoint::Time,
        Endpoint::Joke,
        Endpoint::Scare,
        Endpoint::Lookalike,
    ];

    pub const PROBES: [Endpoint; 2] = [Endpoint::Health, Endpoint::Ready];

    pub fn id(self) -> &'static str {
        match self {
            Endpoint::Color => "color",
            Endpoint::Cat => "cat",
            Endpoint::RandomPhoto => "random-photo",
            Endpoint::Time => "time",
            Endpoint::Joke => "joke",
            Endpoint::Scare => "scare",
            Endpoint::Lookalike => "lookalike",
            Endpoint::Health => "health",
            Endpoint::Ready => "ready",
        }
    }

    /// JSON field holding the display value in this endpoint's response body.
    pub fn field(self) -> &'static str {
        match self {
            Endpoint::Color => "cor",
            Endpoint::Cat => "cat_image_url",
            Endpoint::RandomPhoto => "random_photo_url",
            Endpoint::Time => "current_time",
            Endpoint::Joke => "joke",
            Endpoint::Scare => "scare_image_url",
            Endpoint::Lookalike => "lookalike_image_url",
            Endpoint::Health | Endpoint::Ready => "status",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Endpoint::Color => "Background color",
            Endpoint::Cat => "Cat picture",
            Endpoint::RandomPhoto => "Random photo",
            Endpoint::Time => "Current time",
            Endpoint::Joke => "Joke",
            Endpoint::Scare => "Scare",
            Endpoint::Lookalike => "Lookalike",
            Endpoint::Health => "Health",
            Endpoint::Ready => "Readiness",
        }
    }

    pub fn is_image(self) -> bool {
        matches!(
            self,
            Endpoint::Cat | Endpoint::RandomPhoto | Endpoint::Scare | Endpoint::Lookalike
        )
    }

    pub fn is_tracked(self) -> bool {
        !Self::PROBES.contains(&self)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Endpoint {
    type Err = UnknownEndpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::TRACKED
            .iter()
            .chain(Self::PROBES.iter())
            .copied()
            .find(|e| e.id() == s)
            .ok_or_else(|| UnknownEndpoint(s.to_string()))
    }
}
