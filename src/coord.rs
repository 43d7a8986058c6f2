use serde::Deserialize;

/// A geographical coordinate, in degrees.
///
/// The `Display` implementation honours a requested precision, so
/// `format!("{:.4}", coord)` prints both components to four decimal
/// places.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct Coord {
    lat: f64,
    lng: f64,
}

impl Coord {
    /// Create a new `Coord`.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Return the latitude component of this `Coord`.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Return the longitude component of this `Coord`.
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Returns true if both components are finite and lie within the
    /// ranges of a real position on Earth.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Return this `Coord` formatted as a `lat,lng` query parameter.
    pub(crate) fn to_query_param(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match f.precision() {
            Some(precision) => write!(
                f,
                "{:.*}, {:.*}",
                precision, self.lat, precision, self.lng
            ),
            None => write!(f, "{}, {}", self.lat, self.lng),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Coord;

    #[test]
    fn display_respects_precision() {
        let coord = Coord::new(51.507351, -0.127758);
        assert_eq!(format!("{:.4}", coord), "51.5074, -0.1278");
        assert_eq!(coord.to_string(), "51.507351, -0.127758");
    }

    #[test]
    fn query_param_has_no_space() {
        let coord = Coord::new(-33.8688, 151.2093);
        assert_eq!(coord.to_query_param(), "-33.8688,151.2093");
    }

    #[test]
    fn validity() {
        assert!(Coord::new(0.0, 0.0).is_valid());
        assert!(Coord::new(90.0, -180.0).is_valid());
        assert!(!Coord::new(91.0, 0.0).is_valid());
        assert!(!Coord::new(0.0, f64::NAN).is_valid());
    }

    #[test]
    fn deserializes_from_lat_lng_object() {
        let coord: Coord =
            serde_json::from_str(r#"{"lat": 1.5, "lng": 2.25}"#).unwrap();
        assert_eq!(coord, Coord::new(1.5, 2.25));
    }
}
