//! Blocking versions of the HTTP providers, and a way to drive a pipeline
//! run on the current thread.
//!
//! These use `reqwest::blocking`, so they must not be used from within an
//! async runtime such as tokio.

use crate::api::{
    LocationProvider, MapSurface, PlacesProvider, Position, PositionOptions,
    StatusSink,
};
use crate::err::{Error, LocationError, NewClientError, ProviderError};
use crate::location::{IpLocationResponse, DEFAULT_IP_LOCATION_URL};
use crate::places::{
    env_config, nearby_search_url, parse_nearby_response, NearbyResponse,
    SearchRequest, DEFAULT_PLACES_URL,
};
use crate::pipeline::{Pipeline, PipelineContext, RunOutcome};
use async_trait::async_trait;
use futures::lock::Mutex;
use reqwest::blocking::Client;
use url::Url;

/// Run `pipeline` once on the current thread, blocking until it finishes.
/// Panics inside the run are caught as in `Pipeline::run_guarded`.
pub fn run<L, P, M, S>(
    pipeline: &Pipeline<L, P>,
    ctx: &PipelineContext<M, S>,
) -> Result<RunOutcome, Error>
where
    L: LocationProvider,
    P: PlacesProvider,
    M: MapSurface,
    S: StatusSink,
{
    futures::executor::block_on(pipeline.run_guarded(ctx))
}

/// A blocking client for the Google Places Nearby Search API.
pub struct GooglePlacesClient {
    api_key: String,
    client: Client,
    url: Url,
}

impl GooglePlacesClient {
    /// Create a new `GooglePlacesClient` for the default endpoint.
    ///
    /// # Example
    /// ```rust,no_run
    /// # fn run() {
    /// use barfinder::blocking::GooglePlacesClient;
    /// let client = GooglePlacesClient::new("my-api-key", Some(30)).unwrap();
    /// # }
    /// ```
    pub fn new(
        api_key: &str,
        timeout_in_seconds: Option<u64>,
    ) -> Result<Self, reqwest::Error> {
        use std::time::Duration;

        let client = Client::builder()
            .timeout(timeout_in_seconds.map(Duration::from_secs))
            .build()?;
        let url = Url::parse(DEFAULT_PLACES_URL)
            .expect("the default places URL is valid");

        Ok(Self::new_with_client(url, api_key, client))
    }

    /// Create a new `GooglePlacesClient`, passing in the endpoint and an
    /// existing `reqwest::blocking::Client`.
    pub fn new_with_client(url: Url, api_key: &str, client: Client) -> Self {
        Self {
            api_key: api_key.to_owned(),
            client,
            url,
        }
    }

    /// Create a new `GooglePlacesClient` configured from the
    /// `BARFINDER_PLACES_API_KEY` and `BARFINDER_PLACES_URL` environment
    /// variables.
    pub fn from_env(
        timeout_in_seconds: Option<u64>,
    ) -> Result<Self, NewClientError> {
        let (url, api_key) = env_config()?;
        let mut client = Self::new(&api_key, timeout_in_seconds)?;
        client.url = url;
        Ok(client)
    }

    /// Return the endpoint being used by this client.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Run a single nearby search.
    pub fn search(
        &self,
        request: &SearchRequest,
    ) -> Result<NearbyResponse, ProviderError> {
        let url = nearby_search_url(&self.url, &self.api_key, request);
        let res = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()?
            .error_for_status()?;

        let body = res.text()?;
        parse_nearby_response(&body)
    }
}

impl std::fmt::Debug for GooglePlacesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GooglePlacesClient")
            .field("api_key", &"<redacted>")
            .field("url", &self.url.as_str())
            .finish()
    }
}

#[async_trait]
impl PlacesProvider for GooglePlacesClient {
    async fn nearby_search(
        &self,
        request: &SearchRequest,
    ) -> Result<NearbyResponse, ProviderError> {
        self.search(request)
    }
}

/// A blocking `LocationProvider` which estimates the position from the
/// caller's public IP address.
pub struct IpLocator {
    client: Client,
    url: Url,
    last_position: Mutex<Option<Position>>,
}

impl IpLocator {
    /// Create a new `IpLocator` which queries the default endpoint.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        let url = Url::parse(DEFAULT_IP_LOCATION_URL)
            .expect("the default IP location URL is valid");
        Ok(Self::new_with_client(url, client))
    }

    pub fn new_with_client(url: Url, client: Client) -> Self {
        Self {
            client,
            url,
            last_position: Mutex::new(None),
        }
    }

    /// Return the endpoint being used by this locator.
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn fetch(
        &self,
        options: &PositionOptions,
    ) -> Result<Position, LocationError> {
        let mut req = self
            .client
            .get(self.url.clone())
            .header("Accept", "application/json");
        if let Some(timeout) = options.timeout {
            req = req.timeout(timeout);
        }

        let res = req.send()?.error_for_status()?;
        let body: IpLocationResponse = res.json()?;
        let coord = body.into_coord()?;
        Ok(Position::now(coord))
    }
}

#[async_trait]
impl LocationProvider for IpLocator {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Position, LocationError> {
        let mut last_position = self.last_position.lock().await;

        if let Some(position) = *last_position {
            if position.is_fresh(options.maximum_age) {
                return Ok(position);
            }
        }

        let position = self.fetch(options)?;
        *last_position = Some(position);
        Ok(position)
    }
}

#[cfg(test)]
mod test {
    use super::{run, GooglePlacesClient};
    use crate::location::FixedLocation;
    use crate::pipeline::{Pipeline, PipelineContext, RunOutcome};
    use crate::places::{CallbackPlaces, Completion, PlaceResult, PlacesStatus, SearchRequest};
    use crate::render::{MemorySurface, RenderOptions};
    use crate::Coord;

    #[test]
    fn run_blocks_until_the_pipeline_finishes() {
        let places = CallbackPlaces::new(|request: &SearchRequest, done: Completion| {
            let place = PlaceResult::new("Blocking Bar", request.center());
            std::thread::spawn(move || done(vec![place], PlacesStatus::Ok));
            Ok(())
        });
        let pipeline =
            Pipeline::new(FixedLocation::new(Coord::new(48.8566, 2.3522)), places);
        let ctx =
            PipelineContext::new(MemorySurface::new(), String::new(), RenderOptions::default());

        let outcome = run(&pipeline, &ctx);
        assert_eq!(outcome, Ok(RunOutcome::Rendered { count: 1 }));

        let (_, status, _) = ctx.into_parts();
        assert_eq!(status, "Found 1 bar nearby.");
    }

    #[test]
    #[ignore]
    fn live_blocking_search() {
        let client = GooglePlacesClient::from_env(Some(30)).unwrap();
        let request = SearchRequest::new(Coord::new(48.8566, 2.3522));
        let res = client.search(&request).unwrap();
        assert!(res.status().is_success());
    }
}
