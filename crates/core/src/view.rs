//! Navigable dashboard views and location parsing.

use serde::{Deserialize, Serialize};

/// One navigable screen of the dashboard.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Emoji catalogue. Default landing view.
    #[default]
    Emojis,
    /// User management.
    Users,
    /// Blocklist and moderation requests.
    Administration,
}

impl View {
    pub const ALL: [View; 3] = [View::Emojis, View::Users, View::Administration];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Emojis => "emojis",
            View::Users => "users",
            View::Administration => "administration",
        }
    }

    /// Parse an exact view token. Returns `None` for anything unrecognized.
    pub fn parse(token: &str) -> Option<View> {
        match token {
            "emojis" => Some(View::Emojis),
            "users" => Some(View::Users),
            "administration" => Some(View::Administration),
            _ => None,
        }
    }

    /// Resolve a fragment-style location (`#users`, `users`, ``) to a view.
    ///
    /// Empty and unrecognized locations resolve to the default view.
    pub fn from_location(location: &str) -> View {
        let token = location.trim().trim_start_matches('#');
        View::parse(token).unwrap_or_default()
    }

    /// Location token that addresses this view.
    pub fn location(&self) -> String {
        format!("#{}", self.as_str())
    }

    /// Identifier of the page container rendering this view.
    pub fn container_id(&self) -> String {
        format!("{}-page", self.as_str())
    }
}

impl core::fmt::Display for View {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_locations_resolve() {
        assert_eq!(View::from_location("#users"), View::Users);
        assert_eq!(View::from_location("administration"), View::Administration);
        assert_eq!(View::from_location("#emojis"), View::Emojis);
    }

    #[test]
    fn empty_location_defaults_to_emojis() {
        assert_eq!(View::from_location(""), View::Emojis);
        assert_eq!(View::from_location("#"), View::Emojis);
    }

    #[test]
    fn container_and_location_tokens() {
        assert_eq!(View::Users.container_id(), "users-page");
        assert_eq!(View::Administration.location(), "#administration");
        assert_eq!(View::parse("Users"), None);
    }

    proptest! {
        /// Property: any location that is not an exact view token falls back to emojis.
        #[test]
        fn unknown_locations_fall_back(token in "[a-z#-]{0,16}") {
            let view = View::from_location(&token);
            let stripped = token.trim_start_matches('#');
            match View::parse(stripped) {
                Some(known) => prop_assert_eq!(view, known),
                None => prop_assert_eq!(view, View::Emojis),
            }
        }
    }
}
