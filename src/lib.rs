//! # Overview
//! This crate finds bars near the caller's current location. A run has
//! three stages, each depending on the one before it:
//!
//! 1. resolve the current coordinates from a `LocationProvider`,
//! 1. search for bars within 1000 meters using a `PlacesProvider`,
//! 1. render each result as a map marker and a list entry.
//!
//! A single line of status text is updated at every step. Any error ends
//! the run and replaces the status text with the error's message.
//!
//! HTTP implementations of both providers are included: `IpLocator`
//! estimates the position from the caller's IP address, and
//! `GooglePlacesClient` uses the Google Places Nearby Search API. Enable
//! the `blocking` feature for versions which do not need an async runtime,
//! and the `list_csv` feature to export the rendered list as CSV.
//!
//! # Usage
//! ```rust,no_run
//! use barfinder::{
//!     GooglePlacesClient, IpLocator, MemorySurface, Pipeline,
//!     PipelineContext, RenderOptions,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let places = GooglePlacesClient::from_env(Some(30))?;
//! let pipeline = Pipeline::new(IpLocator::new()?, places);
//! let ctx = PipelineContext::new(
//!     MemorySurface::new(),
//!     String::new(),
//!     RenderOptions::enriched(),
//! );
//!
//! pipeline.run_guarded(&ctx).await?;
//! for entry in ctx.render_state().await.entries() {
//!     println!("{}\n", entry);
//! }
//! # Ok(())
//! # }
//! ```

mod api;
#[cfg(feature = "blocking")]
pub mod blocking;
mod coord;
mod err;
pub mod location;
pub mod pipeline;
pub mod places;
pub mod render;
pub mod stars;
mod status;

pub use api::{
    LocationProvider, MapSurface, PlacesProvider, Position, PositionOptions,
    StatusSink,
};
pub use coord::Coord;
pub use err::{Error, LocationError, NewClientError, ProviderError};
pub use location::{resolve_location, FixedLocation, IpLocator, NoLocation};
pub use pipeline::{Pipeline, PipelineContext, PipelineOptions, RunOutcome};
pub use places::{
    nearby_query, CallbackPlaces, Completion, GooglePlacesClient,
    NearbyResponse, PlaceResult, PlacesStatus, SearchRequest,
};
pub use render::{
    ListEntry, Marker, MemorySurface, PlaceDetail, RenderOptions, RenderState,
    Renderer,
};
pub use status::Status;

#[cfg(test)]
mod test {
    use crate::{
        CallbackPlaces, Completion, FixedLocation, MemorySurface, Pipeline,
        PipelineContext, PlaceResult, PlacesStatus, RenderOptions,
        RunOutcome, SearchRequest,
    };
    use crate::Coord;

    #[tokio::test]
    async fn callback_provider_through_the_public_api() {
        let places = CallbackPlaces::new(|request: &SearchRequest, done: Completion| {
            let center = request.center();
            let near = Coord::new(center.lat() + 0.001, center.lng());
            done(
                vec![
                    PlaceResult::new("Corner Pub", near).with_rating(3.9),
                    PlaceResult::new("Rooftop", near)
                        .with_rating(4.7)
                        .with_address("5 Skyline Ave"),
                ],
                PlacesStatus::Ok,
            );
            Ok(())
        });
        let pipeline =
            Pipeline::new(FixedLocation::new(Coord::new(-37.8136, 144.9631)), places);
        let ctx = PipelineContext::new(
            MemorySurface::new(),
            String::new(),
            RenderOptions::enriched(),
        );

        let outcome = pipeline.run_guarded(&ctx).await.unwrap();
        assert_eq!(outcome, RunOutcome::Rendered { count: 2 });

        let state = ctx.render_state().await;
        assert_eq!(state.entries()[0].name(), "Rooftop");
        assert_eq!(state.entries()[0].stars(), Some("★★★★⯨"));
        assert_eq!(state.entries()[1].address(), "Address N/A");
        assert_eq!(ctx.with_status(|s| s.clone()).await, "Found 2 bars nearby.");
    }
}
