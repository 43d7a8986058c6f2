//! # Nearby Query
//! The second pipeline stage. Given a coordinate, a single nearby search is
//! sent to a `PlacesProvider` and its status is folded into one result:
//! `OK` and `ZERO_RESULTS` are successes, everything else is an error.

use crate::api::PlacesProvider;
use crate::coord::Coord;
use crate::err::{Error, NewClientError, ProviderError};
use async_trait::async_trait;
use futures::channel::oneshot;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use url::Url;

/// The search radius used for every nearby query, in meters.
pub const RADIUS_METERS: u32 = 1000;
/// The place category used for every nearby query.
pub const CATEGORY: &str = "bar";

/// The default Google Places Nearby Search endpoint.
pub const DEFAULT_PLACES_URL: &str =
    "https://maps.googleapis.com/maps/api/place/nearbysearch/json";
/// The environment variable holding the places API key.
pub const API_KEY_ENV_VAR: &str = "BARFINDER_PLACES_API_KEY";
/// The environment variable which can override `DEFAULT_PLACES_URL`.
pub const PLACES_URL_ENV_VAR: &str = "BARFINDER_PLACES_URL";

/// A single nearby search, built fresh for every query.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchRequest {
    center: Coord,
    radius_meters: u32,
    category: &'static str,
}

impl SearchRequest {
    /// Create a search around `center` using the fixed radius and category.
    pub fn new(center: Coord) -> Self {
        Self {
            center,
            radius_meters: RADIUS_METERS,
            category: CATEGORY,
        }
    }

    pub fn center(&self) -> Coord {
        self.center
    }

    pub fn radius_meters(&self) -> u32 {
        self.radius_meters
    }

    pub fn category(&self) -> &str {
        self.category
    }
}

/// A place returned by a `PlacesProvider`.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaceResult {
    name: String,
    position: Coord,
    address: Option<String>,
    rating: Option<f64>,
    review_count: Option<u32>,
    price_level: Option<u8>,
    open_now: Option<bool>,
}

impl PlaceResult {
    /// Create a new `PlaceResult` with no optional details.
    pub fn new<T: Into<String>>(name: T, position: Coord) -> Self {
        Self {
            name: name.into(),
            position,
            address: None,
            rating: None,
            review_count: None,
            price_level: None,
            open_now: None,
        }
    }

    pub fn with_address<T: Into<String>>(mut self, address: T) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Set the rating. Values are clamped to the range 0 to 5.
    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating.max(0.0).min(5.0));
        self
    }

    pub fn with_review_count(mut self, review_count: u32) -> Self {
        self.review_count = Some(review_count);
        self
    }

    pub fn with_price_level(mut self, price_level: u8) -> Self {
        self.price_level = Some(price_level);
        self
    }

    pub fn with_open_now(mut self, open_now: bool) -> Self {
        self.open_now = Some(open_now);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Coord {
        self.position
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Return the rating, between 0 and 5, if the place has one.
    pub fn rating(&self) -> Option<f64> {
        self.rating
    }

    pub fn review_count(&self) -> Option<u32> {
        self.review_count
    }

    pub fn price_level(&self) -> Option<u8> {
        self.price_level
    }

    pub fn open_now(&self) -> Option<bool> {
        self.open_now
    }
}

/// The status code reported by a places provider.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq)]
#[serde(from = "String")]
pub enum PlacesStatus {
    Ok,
    ZeroResults,
    OverQueryLimit,
    RequestDenied,
    InvalidRequest,
    UnknownError,
    NotFound,
    /// A status code this crate does not recognise, kept verbatim.
    Other(String),
}

impl PlacesStatus {
    /// Parse a provider status code. Unrecognised codes are kept as
    /// `PlacesStatus::Other`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "OK" => Self::Ok,
            "ZERO_RESULTS" => Self::ZeroResults,
            "OVER_QUERY_LIMIT" => Self::OverQueryLimit,
            "REQUEST_DENIED" => Self::RequestDenied,
            "INVALID_REQUEST" => Self::InvalidRequest,
            "UNKNOWN_ERROR" => Self::UnknownError,
            "NOT_FOUND" => Self::NotFound,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Return the wire representation of this status code.
    pub fn as_code(&self) -> &str {
        match self {
            Self::Ok => "OK",
            Self::ZeroResults => "ZERO_RESULTS",
            Self::OverQueryLimit => "OVER_QUERY_LIMIT",
            Self::RequestDenied => "REQUEST_DENIED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Other(code) => code,
        }
    }

    /// Returns true for the statuses which count as a successful search.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::ZeroResults)
    }
}

impl From<String> for PlacesStatus {
    fn from(code: String) -> Self {
        Self::from_code(&code)
    }
}

impl std::fmt::Display for PlacesStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

/// What a provider reports for a completed nearby search.
#[derive(Clone, Debug, PartialEq)]
pub struct NearbyResponse {
    status: PlacesStatus,
    results: Vec<PlaceResult>,
}

impl NearbyResponse {
    pub fn new(status: PlacesStatus, results: Vec<PlaceResult>) -> Self {
        Self { status, results }
    }

    pub fn status(&self) -> &PlacesStatus {
        &self.status
    }

    pub fn results(&self) -> &[PlaceResult] {
        &self.results
    }
}

/// Search for bars near `center`, calling `provider` exactly once.
///
/// A `ZERO_RESULTS` status is a success with no places. Any other non-OK
/// status becomes `Error::QueryFailed`, and a provider which fails without
/// a status becomes `Error::QueryThrew`.
pub async fn nearby_query<P>(
    provider: &P,
    center: Coord,
) -> Result<Vec<PlaceResult>, Error>
where
    P: PlacesProvider + ?Sized,
{
    let request = SearchRequest::new(center);
    log::debug!(
        "Nearby search for '{}' within {} m of {:.4}",
        request.category(),
        request.radius_meters(),
        center
    );

    let response = provider.nearby_search(&request).await.map_err(|err| {
        log::error!("Nearby search threw: {}", err);
        Error::from(err)
    })?;

    let NearbyResponse { status, results } = response;
    log::debug!("Places status: {}, results: {}", status, results.len());

    match status {
        PlacesStatus::Ok => Ok(results),
        PlacesStatus::ZeroResults => Ok(Vec::new()),
        status => {
            log::error!("Places API error: {}", status);
            Err(Error::QueryFailed(status))
        }
    }
}

/// The completion handed to a callback-style search function.
pub type Completion = Box<dyn FnOnce(Vec<PlaceResult>, PlacesStatus) + Send>;

/// Adapts a callback-style search function into a `PlacesProvider`.
///
/// The wrapped function receives the request and a `Completion`. It may
/// fail immediately by returning `Err`, or report its outcome later by
/// calling the completion. Both paths come out of `nearby_search` as one
/// result. A completion which is dropped without being called is reported
/// as a thrown error.
pub struct CallbackPlaces<F> {
    search: F,
}

impl<F> CallbackPlaces<F>
where
    F: Fn(&SearchRequest, Completion) -> Result<(), String> + Send + Sync,
{
    pub fn new(search: F) -> Self {
        Self { search }
    }
}

#[async_trait]
impl<F> PlacesProvider for CallbackPlaces<F>
where
    F: Fn(&SearchRequest, Completion) -> Result<(), String> + Send + Sync,
{
    async fn nearby_search(
        &self,
        request: &SearchRequest,
    ) -> Result<NearbyResponse, ProviderError> {
        let (sender, receiver) = oneshot::channel();
        let completion: Completion = Box::new(move |results, status| {
            // The receiver is only gone if the caller stopped waiting.
            let _ = sender.send(NearbyResponse::new(status, results));
        });

        (self.search)(request, completion).map_err(ProviderError::Thrown)?;

        receiver.await.map_err(|_| {
            ProviderError::thrown("nearby search finished without a response")
        })
    }
}

/// A client for the Google Places Nearby Search API.
pub struct GooglePlacesClient {
    api_key: String,
    client: ReqwestClient,
    url: Url,
}

impl GooglePlacesClient {
    /// Create a new `GooglePlacesClient` for the default endpoint.
    ///
    /// # Example
    /// ```rust,no_run
    /// use barfinder::GooglePlacesClient;
    /// let client = GooglePlacesClient::new("my-api-key", Some(30)).unwrap();
    /// ```
    pub fn new(
        api_key: &str,
        timeout_in_seconds: Option<u64>,
    ) -> Result<Self, reqwest::Error> {
        use std::time::Duration;

        let mut builder = ReqwestClient::builder();
        if let Some(secs) = timeout_in_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;
        let url = Url::parse(DEFAULT_PLACES_URL)
            .expect("the default places URL is valid");

        Ok(Self::new_with_client(url, api_key, client))
    }

    /// Create a new `GooglePlacesClient`, passing in the endpoint and an
    /// existing `reqwest::Client`.
    ///
    /// If creating multiple clients, the same `reqwest::Client` should be
    /// used for each.
    pub fn new_with_client(
        url: Url,
        api_key: &str,
        client: ReqwestClient,
    ) -> Self {
        Self {
            api_key: api_key.to_owned(),
            client,
            url,
        }
    }

    /// Create a new `GooglePlacesClient` using the API key in
    /// `BARFINDER_PLACES_API_KEY`, and the endpoint in
    /// `BARFINDER_PLACES_URL` if it is set.
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
        let url = nearby_search_url(&self.url, &self.api_key, request);
        let res = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?;

        let body = res.text().await?;
        parse_nearby_response(&body)
    }
}

/// Read the places endpoint and API key from the environment.
pub(crate) fn env_config() -> Result<(Url, String), NewClientError> {
    let api_key = std::env::var(API_KEY_ENV_VAR)
        .map_err(|_| NewClientError::MissingEnvVar(API_KEY_ENV_VAR))?;
    let url = match std::env::var(PLACES_URL_ENV_VAR) {
        Ok(url) => Url::parse(&url)?,
        Err(_) => Url::parse(DEFAULT_PLACES_URL)?,
    };
    Ok((url, api_key))
}

pub(crate) fn nearby_search_url(
    base_url: &Url,
    api_key: &str,
    request: &SearchRequest,
) -> Url {
    let mut url = base_url.clone();
    url.query_pairs_mut()
        .append_pair("location", &request.center().to_query_param())
        .append_pair("radius", &request.radius_meters().to_string())
        .append_pair("type", request.category())
        .append_pair("key", api_key);
    url
}

/// Parse the JSON body of a Nearby Search response.
pub(crate) fn parse_nearby_response(
    body: &str,
) -> Result<NearbyResponse, ProviderError> {
    let res: GoogleNearbyResponse = serde_json::from_str(body)?;

    if !res.status.is_success() {
        if let Some(msg) = &res.error_message {
            log::warn!("Places API returned {}: {}", res.status, msg);
        }
    }

    let results = res.results.into_iter().map(PlaceResult::from).collect();
    Ok(NearbyResponse::new(res.status, results))
}

#[derive(Debug, Deserialize)]
struct GoogleNearbyResponse {
    #[serde(default)]
    results: Vec<GooglePlace>,
    status: PlacesStatus,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GooglePlace {
    name: String,
    geometry: GoogleGeometry,
    vicinity: Option<String>,
    rating: Option<f64>,
    user_ratings_total: Option<u32>,
    price_level: Option<u8>,
    opening_hours: Option<GoogleOpeningHours>,
}

#[derive(Debug, Deserialize)]
struct GoogleGeometry {
    location: Coord,
}

#[derive(Debug, Deserialize)]
struct GoogleOpeningHours {
    open_now: Option<bool>,
}

impl From<GooglePlace> for PlaceResult {
    fn from(place: GooglePlace) -> Self {
        let mut result = PlaceResult::new(place.name, place.geometry.location);
        result.address = place.vicinity;
        result.rating = place.rating.map(|rating| rating.max(0.0).min(5.0));
        result.review_count = place.user_ratings_total;
        result.price_level = place.price_level;
        result.open_now = place.opening_hours.and_then(|hours| hours.open_now);
        result
    }
}
