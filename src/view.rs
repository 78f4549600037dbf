//! The closed set of sketch views.

use std::fmt;
use std::str::FromStr;

use crate::error::StudioError;

/// One of the fixed camera views a shoe is sketched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewKey {
    Top,
    Left,
    Right,
    Back,
    Sole,
}

impl ViewKey {
    /// Every view, in the order they are offered to the user.
    pub const ALL: [ViewKey; 5] = [
        ViewKey::Top,
        ViewKey::Left,
        ViewKey::Right,
        ViewKey::Back,
        ViewKey::Sole,
    ];

    /// The canonical view generated first; its noise is shared with the rest.
    pub const ANCHOR: ViewKey = ViewKey::Right;

    /// Human readable label drawn on the composite.
    pub fn label(self) -> &'static str {
        match self {
            Self::Top => "Top",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Back => "Back",
            Self::Sole => "Sole",
        }
    }

    /// Lowercase identifier used on the command line.
    pub fn key(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Left => "left",
            Self::Right => "right",
            Self::Back => "back",
            Self::Sole => "sole",
        }
    }

    /// Descriptive phrase appended to every prompt for this view.
    pub fn phrase(self) -> &'static str {
        match self {
            Self::Top => {
                "top-down upper flat, footwear flat technical sketch, clean black line art on white"
            }
            Self::Left => {
                "left side profile, footwear flat technical sketch, clean black line art on white"
            }
            Self::Right => {
                "right side profile, footwear flat technical sketch, clean black line art on white"
            }
            Self::Back => {
                "back heel view, footwear flat technical sketch, clean black line art on white"
            }
            Self::Sole => {
                "outsole bottom view, tread pattern, footwear flat technical sketch, clean black line art on white"
            }
        }
    }

    pub fn is_anchor(self) -> bool {
        self == Self::ANCHOR
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ViewKey {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ViewKey::ALL
            .into_iter()
            .find(|view| view.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| StudioError::InvalidView(wanted.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKETCH_STYLE: &str = "footwear flat technical sketch, clean black line art on white";

    #[test]
    fn test_every_view_shares_the_sketch_style() {
        for view in ViewKey::ALL {
            assert!(view.phrase().ends_with(SKETCH_STYLE), "{view}");
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Right".parse::<ViewKey>().unwrap(), ViewKey::Right);
        assert_eq!(" SOLE ".parse::<ViewKey>().unwrap(), ViewKey::Sole);
        assert_eq!("top".parse::<ViewKey>().unwrap(), ViewKey::Top);
    }

    #[test]
    fn test_parse_rejects_unknown_views() {
        let err = "front".parse::<ViewKey>().unwrap_err();
        assert!(matches!(err, StudioError::InvalidView(ref v) if v == "front"));
    }

    #[test]
    fn test_anchor_is_right() {
        assert!(ViewKey::Right.is_anchor());
        assert_eq!(ViewKey::ALL.iter().filter(|v| v.is_anchor()).count(), 1);
    }
}
