use crate::api::StatusSink;
use crate::coord::Coord;
use crate::err::Error;

/// The pipeline transitions which are reported on the status surface.
#[derive(Clone, Debug, PartialEq)]
pub enum Status {
    RequestingLocation,
    /// The location was resolved to this coordinate.
    Located(Coord),
    Searching,
    /// The search succeeded and this many places were rendered.
    Found(usize),
    /// The search succeeded but there was nothing nearby.
    NoResults,
    Failed(Error),
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequestingLocation => write!(f, "Requesting your location…"),
            Self::Located(coord) => write!(f, "You’re at {:.4}", coord),
            Self::Searching => write!(f, "Searching for bars nearby…"),
            Self::Found(1) => write!(f, "Found 1 bar nearby."),
            Self::Found(count) => write!(f, "Found {} bars nearby.", count),
            Self::NoResults => write!(f, "No bars found nearby."),
            Self::Failed(err) => write!(f, "{}", err),
        }
    }
}

/// Keeps only the latest status.
impl StatusSink for String {
    fn set_status(&mut self, text: &str) {
        self.clear();
        self.push_str(text);
    }
}

/// Keeps every status, oldest first.
impl StatusSink for Vec<String> {
    fn set_status(&mut self, text: &str) {
        self.push(text.to_owned());
    }
}
