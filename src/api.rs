use crate::coord::Coord;
use crate::err::{LocationError, ProviderError};
use crate::places::{NearbyResponse, SearchRequest};
use crate::render::{Marker, PlaceDetail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A position reported by a `LocationProvider`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    coord: Coord,
    timestamp: DateTime<Utc>,
}

impl Position {
    /// Create a new `Position` acquired at the given time.
    pub fn new(coord: Coord, timestamp: DateTime<Utc>) -> Self {
        Self { coord, timestamp }
    }

    /// Create a new `Position` acquired now.
    pub fn now(coord: Coord) -> Self {
        Self::new(coord, Utc::now())
    }

    pub fn coord(&self) -> Coord {
        self.coord
    }

    /// Return the time at which this position was acquired.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns true if this position is no older than `maximum_age`.
    ///
    /// A zero `maximum_age` is never satisfied, and neither is a timestamp
    /// from the future.
    pub fn is_fresh(&self, maximum_age: Duration) -> bool {
        if maximum_age == Duration::from_secs(0) {
            return false;
        }
        let age = Utc::now().signed_duration_since(self.timestamp);
        if age < chrono::Duration::zero() {
            return false;
        }
        match chrono::Duration::from_std(maximum_age) {
            Ok(maximum_age) => age <= maximum_age,
            // Anything too large for chrono is effectively "any age".
            Err(_) => true,
        }
    }
}

/// Settings passed to a `LocationProvider` for a single request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PositionOptions {
    /// Ask the provider for its most accurate reading. Providers without
    /// an accuracy choice ignore this.
    pub enable_high_accuracy: bool,
    /// Give up on the request after this long.
    pub timeout: Option<Duration>,
    /// Accept a previously acquired position if it is no older than this.
    /// Zero forces a fresh reading.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Some(Duration::from_secs(10)),
            maximum_age: Duration::from_secs(0),
        }
    }
}

/// A platform service which can report the caller's current position.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Returns false if this platform has no location support at all.
    fn is_supported(&self) -> bool {
        true
    }

    /// Request the current position once.
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Position, LocationError>;
}

/// An external service which can search for places near a coordinate.
#[async_trait]
pub trait PlacesProvider: Send + Sync {
    /// Run a single nearby search. Provider status codes (including
    /// `ZERO_RESULTS`) are reported inside the `NearbyResponse`; an `Err`
    /// means no status was obtained at all.
    async fn nearby_search(
        &self,
        request: &SearchRequest,
    ) -> Result<NearbyResponse, ProviderError>;
}

#[async_trait]
impl<T> LocationProvider for Box<T>
where
    T: LocationProvider + ?Sized,
{
    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Position, LocationError> {
        (**self).current_position(options).await
    }
}

#[async_trait]
impl<T> PlacesProvider for Box<T>
where
    T: PlacesProvider + ?Sized,
{
    async fn nearby_search(
        &self,
        request: &SearchRequest,
    ) -> Result<NearbyResponse, ProviderError> {
        (**self).nearby_search(request).await
    }
}

/// The map which markers and popups are drawn on.
pub trait MapSurface: Send {
    /// Remove every marker and popup currently shown.
    fn clear_markers(&mut self);
    fn add_marker(&mut self, marker: &Marker);
    /// Center the view on `center` at the given zoom level.
    fn set_view(&mut self, center: Coord, zoom: u8);
    /// Reveal the detail popup for a place.
    fn show_detail(&mut self, detail: &PlaceDetail);
}

/// A single user-visible line of status text.
pub trait StatusSink: Send {
    /// Replace the current status text.
    fn set_status(&mut self, text: &str);
}
