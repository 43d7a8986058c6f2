//! # Location Resolver
//! The first pipeline stage, which obtains the caller's current
//! coordinates from a `LocationProvider`.

use crate::api::{LocationProvider, Position, PositionOptions};
use crate::coord::Coord;
use crate::err::{Error, LocationError};
use async_trait::async_trait;
use futures::lock::Mutex;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use url::Url;

/// The default endpoint used by `IpLocator`.
pub const DEFAULT_IP_LOCATION_URL: &str = "http://ip-api.com/json";

/// Request the current position from `provider` exactly once.
///
/// A provider which reports no location support fails with
/// `Error::LocationUnsupported` before any request is made.
pub async fn resolve_location<L>(
    provider: &L,
    options: &PositionOptions,
) -> Result<Coord, Error>
where
    L: LocationProvider + ?Sized,
{
    if !provider.is_supported() {
        log::warn!("Geolocation is not supported by this provider");
        return Err(Error::LocationUnsupported);
    }

    log::debug!("Requesting current position with {:?}", options);
    let position = provider.current_position(options).await.map_err(|err| {
        log::error!("Geolocation error: {}", err);
        Error::from(err)
    })?;

    let coord = position.coord();
    if !coord.is_valid() {
        log::error!("Location provider returned invalid coordinate {}", coord);
        return Err(Error::LocationUnavailable);
    }

    log::info!("Resolved location {:.4}", coord);
    Ok(coord)
}

/// A `LocationProvider` which always reports the same coordinate, for
/// callers who already know where they are.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedLocation {
    coord: Coord,
}

impl FixedLocation {
    pub fn new(coord: Coord) -> Self {
        Self { coord }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Position, LocationError> {
        Ok(Position::now(self.coord))
    }
}

/// A `LocationProvider` which never has location support.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    fn is_supported(&self) -> bool {
        false
    }

    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Position, LocationError> {
        Err(LocationError::Unsupported)
    }
}

/// A `LocationProvider` which estimates the position from the caller's
/// public IP address using a JSON geolocation endpoint.
///
/// `enable_high_accuracy` has no effect on an IP lookup. The last
/// position is cached and reused while it is younger than the request's
/// `maximum_age`.
pub struct IpLocator {
    client: ReqwestClient,
    url: Url,
    last_position: Mutex<Option<Position>>,
}

impl IpLocator {
    /// Create a new `IpLocator` which queries the default endpoint.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = ReqwestClient::builder().build()?;
        let url = Url::parse(DEFAULT_IP_LOCATION_URL)
            .expect("the default IP location URL is valid");
        Ok(Self::new_with_client(url, client))
    }

    /// Create a new `IpLocator`, passing in an existing `reqwest::Client`
    /// and the endpoint to query.
    pub fn new_with_client(url: Url, client: ReqwestClient) -> Self {
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

    async fn fetch(
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

        let res = req.send().await?.error_for_status()?;
        let body: IpLocationResponse = res.json().await?;
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
                log::debug!(
                    "Reusing cached position from {}",
                    position.timestamp()
                );
                return Ok(position);
            }
        }

        let position = self.fetch(options).await?;
        *last_position = Some(position);
        Ok(position)
    }
}

/// The body returned by the IP geolocation endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct IpLocationResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    message: Option<String>,
}

impl IpLocationResponse {
    pub(crate) fn into_coord(self) -> Result<Coord, LocationError> {
        if self.status != "success" {
            return Err(LocationError::PositionUnavailable(
                self.message.unwrap_or(self.status),
            ));
        }

        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok(Coord::new(lat, lon)),
            _ => Err(LocationError::Unknown(
                "response did not contain a latitude and longitude".to_owned(),
            )),
        }
    }
}
