use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("Niche/topic must not be empty")]
    EmptyNiche,

    #[error("Unknown post type: {0} (expected motivational, educational, story or tips)")]
    UnknownPostType(String),
}

/// Post category selected by the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    #[default]
    Motivational,
    Educational,
    Story,
    Tips,
}

impl PostType {
    pub const ALL: [PostType; 4] = [
        PostType::Motivational,
        PostType::Educational,
        PostType::Story,
        PostType::Tips,
    ];

    /// Value used in prompts and file names
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Motivational => "motivational",
            PostType::Educational => "educational",
            PostType::Story => "story",
            PostType::Tips => "tips",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            PostType::Motivational => "Motivational",
            PostType::Educational => "Educational",
            PostType::Story => "Personal Story",
            PostType::Tips => "Tips & Advice",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostType {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PostType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| PromptError::UnknownPostType(s.to_string()))
    }
}

/// Templated instruction sent upstream. Opaque to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn build(post_type: PostType, niche: &str) -> Result<Self, PromptError> {
        let niche = niche.trim();
        if niche.is_empty() {
            return Err(PromptError::EmptyNiche);
        }

        Ok(Self(format!(
            "Create a {post_type} LinkedIn post about {niche}. Make it engaging, professional, \
             and include relevant hashtags. Keep it concise but impactful."
        )))
    }

    /// Wrap free text that was composed elsewhere
    pub fn raw(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt() {
        let prompt = Prompt::build(PostType::Motivational, "gardening").unwrap();
        assert_eq!(
            prompt.as_str(),
            "Create a motivational LinkedIn post about gardening. Make it engaging, \
             professional, and include relevant hashtags. Keep it concise but impactful."
        );
        assert!(prompt
            .as_str()
            .starts_with("Create a motivational LinkedIn post about gardening"));
    }

    #[test]
    fn test_niche_is_trimmed() {
        let prompt = Prompt::build(PostType::Tips, "  Leadership \n").unwrap();
        assert!(prompt.as_str().contains("tips LinkedIn post about Leadership."));
    }

    #[test]
    fn test_blank_niche_rejected() {
        assert_eq!(
            Prompt::build(PostType::Story, "   "),
            Err(PromptError::EmptyNiche)
        );
    }

    #[test]
    fn test_post_type_parse() {
        assert_eq!("Educational".parse::<PostType>().unwrap(), PostType::Educational);
        assert_eq!(" story ".parse::<PostType>().unwrap(), PostType::Story);
        assert!(matches!(
            "rant".parse::<PostType>(),
            Err(PromptError::UnknownPostType(s)) if s == "rant"
        ));
    }

    #[test]
    fn test_post_type_labels() {
        assert_eq!(PostType::Story.label(), "Personal Story");
        assert_eq!(PostType::Tips.to_string(), "tips");
        assert_eq!(PostType::default(), PostType::Motivational);
    }
}
