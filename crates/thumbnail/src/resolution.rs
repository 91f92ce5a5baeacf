use crate::error::{Error, ErrorKind};
use derive_more::Display;
use std::str::FromStr;

/// Top-level "directory" every cover key lives under.
pub const KEY_ROOT: &str = "cw-cover";

/// The fixed set of sizes a cover is published at.
///
/// Ordered from the original upwards so that sorting a list of resolutions
/// gives the order they are processed and reported in.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resolution {
    /// The source cover, byte for byte.
    #[display("original")]
    Original,
    #[display("sm")]
    Small,
    #[display("md")]
    Medium,
    #[display("lg")]
    Large,
}
impl Resolution {
    pub const ALL: [Resolution; 4] = [Self::Original, Self::Small, Self::Medium, Self::Large];

    /// Target for the longer edge, in pixels. `None` means unscaled.
    pub const fn max_edge(&self) -> Option<u32> {
        match self {
            Self::Original => None,
            Self::Small => Some(200),
            Self::Medium => Some(400),
            Self::Large => Some(800),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Small => "sm",
            Self::Medium => "md",
            Self::Large => "lg",
        }
    }
}
impl FromStr for Resolution {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" | "og" => Ok(Self::Original),
            "sm" | "small" => Ok(Self::Small),
            "md" | "medium" => Ok(Self::Medium),
            "lg" | "large" => Ok(Self::Large),
            other => exn::bail!(ErrorKind::UnknownResolution(other.to_string())),
        }
    }
}

/// Object key a cover is uploaded to.
///
/// Derived purely from the book id and resolution, so it never has to be read
/// back from storage.
///
/// ```
/// use coverup_thumbnail::{Resolution, destination_key};
/// assert_eq!(destination_key(59, Resolution::Original), "cw-cover/59/cover.jpg");
/// assert_eq!(destination_key(59, Resolution::Small), "cw-cover/59/cover_sm.jpg");
/// ```
pub fn destination_key(book_id: u64, resolution: Resolution) -> String {
    match resolution {
        Resolution::Original => format!("{KEY_ROOT}/{book_id}/cover.jpg"),
        scaled => format!("{KEY_ROOT}/{book_id}/cover_{scaled}.jpg"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Resolution::Original, "cw-cover/59/cover.jpg")]
    #[case(Resolution::Small, "cw-cover/59/cover_sm.jpg")]
    #[case(Resolution::Medium, "cw-cover/59/cover_md.jpg")]
    #[case(Resolution::Large, "cw-cover/59/cover_lg.jpg")]
    fn test_destination_key(#[case] resolution: Resolution, #[case] expected: &str) {
        assert_eq!(destination_key(59, resolution), expected);
        // Deterministic across repeated calls.
        assert_eq!(destination_key(59, resolution), destination_key(59, resolution));
    }

    #[rstest]
    #[case("original", Resolution::Original)]
    #[case("og", Resolution::Original)]
    #[case("sm", Resolution::Small)]
    #[case("MD", Resolution::Medium)]
    #[case("large", Resolution::Large)]
    fn test_parse(#[case] input: &str, #[case] expected: Resolution) {
        assert_eq!(input.parse::<Resolution>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "xl".parse::<Resolution>().unwrap_err();
        assert_eq!(*err, ErrorKind::UnknownResolution("xl".to_string()));
    }

    #[test]
    fn test_display_matches_as_str() {
        for resolution in Resolution::ALL {
            assert_eq!(resolution.to_string(), resolution.as_str());
            assert_eq!(resolution.as_str().parse::<Resolution>().unwrap(), resolution);
        }
    }

    #[test]
    fn test_ordering() {
        let mut resolutions = vec![Resolution::Large, Resolution::Original, Resolution::Medium, Resolution::Small];
        resolutions.sort();
        assert_eq!(resolutions, Resolution::ALL);
    }
}
