//! Content vocabulary shared by the generation, meme and analytics endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether generated text is a roast or a compliment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Roast,
    Compliment,
}

impl ContentType {
    pub const ALL: [ContentType; 2] = [ContentType::Roast, ContentType::Compliment];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Roast => "roast",
            Self::Compliment => "compliment",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reaction a viewer leaves on a generated roast or compliment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Love,
    Funny,
    Meh,
    Bad,
}

impl Reaction {
    pub const ALL: [Reaction; 4] = [Reaction::Love, Reaction::Funny, Reaction::Meh, Reaction::Bad];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Love => "love",
            Self::Funny => "funny",
            Self::Meh => "meh",
            Self::Bad => "bad",
        }
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a meme was shared to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharePlatform {
    Twitter,
    Facebook,
    Copy,
}

impl SharePlatform {
    pub const ALL: [SharePlatform; 3] = [
        SharePlatform::Twitter,
        SharePlatform::Facebook,
        SharePlatform::Copy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Facebook => "facebook",
            Self::Copy => "copy",
        }
    }
}

impl fmt::Display for SharePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_accepts_known_values() {
        for content_type in ContentType::ALL {
            let json = format!("\"{content_type}\"");
            assert_eq!(
                serde_json::from_str::<ContentType>(&json).unwrap(),
                content_type
            );
        }
    }

    #[test]
    fn content_type_rejects_unknown_and_miscased_values() {
        assert!(serde_json::from_str::<ContentType>("\"insult\"").is_err());
        assert!(serde_json::from_str::<ContentType>("\"Roast\"").is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&ContentType::Compliment).unwrap();
        assert_eq!(json, "\"compliment\"");
        let reaction: Reaction = serde_json::from_str("\"funny\"").unwrap();
        assert_eq!(reaction, Reaction::Funny);
        let platform: SharePlatform = serde_json::from_str("\"twitter\"").unwrap();
        assert_eq!(platform, SharePlatform::Twitter);
    }

    #[test]
    fn serde_rejects_unknown_reaction() {
        assert!(serde_json::from_str::<Reaction>("\"angry\"").is_err());
    }

    #[test]
    fn display_matches_wire_names() {
        for reaction in Reaction::ALL {
            let json = serde_json::to_string(&reaction).unwrap();
            assert_eq!(json, format!("\"{reaction}\""));
        }
        for platform in SharePlatform::ALL {
            let json = serde_json::to_string(&platform).unwrap();
            assert_eq!(json, format!("\"{platform}\""));
        }
    }
}
