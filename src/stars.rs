//! Text formatting for the optional list entry enrichments: star glyphs,
//! price level and the "open now" indicator.

/// The number of symbols in every star rendering.
pub const TOTAL_STARS: u8 = 5;
pub const FULL_STAR: char = '★';
pub const HALF_STAR: char = '⯨';
pub const EMPTY_STAR: char = '☆';

const PRICE_SYMBOL: &str = "$";
const MAX_PRICE_LEVEL: u8 = 4;

/// A rating between 0 and 5 split into full, half and empty stars.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StarRating {
    full: u8,
    half: bool,
    empty: u8,
}

impl StarRating {
    /// Split a rating into stars. The whole part gives the full stars, a
    /// fractional part of at least 0.5 adds one half star, and the rest
    /// are empty.
    pub fn from_rating(rating: f64) -> Self {
        let rating = if rating.is_finite() {
            rating.max(0.0).min(f64::from(TOTAL_STARS))
        } else {
            0.0
        };
        let full = rating.floor() as u8;
        let half = full < TOTAL_STARS && rating - rating.floor() >= 0.5;
        let empty = TOTAL_STARS - full - half as u8;

        Self { full, half, empty }
    }

    pub fn full(&self) -> u8 {
        self.full
    }

    pub fn has_half(&self) -> bool {
        self.half
    }

    pub fn empty(&self) -> u8 {
        self.empty
    }

    /// Return the star glyphs, always `TOTAL_STARS` symbols long.
    pub fn glyphs(&self) -> String {
        let mut glyphs = String::new();
        glyphs.extend(std::iter::repeat(FULL_STAR).take(self.full as usize));
        if self.half {
            glyphs.push(HALF_STAR);
        }
        glyphs.extend(std::iter::repeat(EMPTY_STAR).take(self.empty as usize));
        glyphs
    }
}

impl std::fmt::Display for StarRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.glyphs())
    }
}

/// Return the star glyphs for a rating, or `None` if there is no rating.
pub fn star_glyphs(rating: Option<f64>) -> Option<String> {
    rating.map(|rating| StarRating::from_rating(rating).glyphs())
}

/// Return the label shown next to the star glyphs.
pub fn rating_label(rating: Option<f64>, review_count: Option<u32>) -> String {
    match (rating, review_count) {
        (None, _) => "No rating".to_owned(),
        (Some(rating), Some(count)) => format!("{:.1} ({} reviews)", rating, count),
        (Some(rating), None) => format!("{:.1}", rating),
    }
}

/// Return the price level as a repeated currency symbol.
pub fn price_text(price_level: Option<u8>) -> Option<String> {
    match price_level {
        Some(level) if level > 0 => {
            Some(PRICE_SYMBOL.repeat(level.min(MAX_PRICE_LEVEL) as usize))
        }
        _ => None,
    }
}

pub fn open_now_text(open_now: Option<bool>) -> Option<&'static str> {
    match open_now {
        Some(true) => Some("Open now"),
        Some(false) => Some("Closed"),
        None => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn three_and_a_half_stars() {
        let stars = StarRating::from_rating(3.5);
        assert_eq!(stars.full(), 3);
        assert!(stars.has_half());
        assert_eq!(stars.empty(), 1);
        assert_eq!(stars.glyphs(), "★★★⯨☆");
        assert_eq!(stars.glyphs().chars().count(), 5);
    }

    #[test]
    fn fraction_below_half_rounds_down() {
        let stars = StarRating::from_rating(4.2);
        assert_eq!((stars.full(), stars.has_half(), stars.empty()), (4, false, 1));
    }

    #[test]
    fn always_five_symbols() {
        for tenths in 0..=50 {
            let rating = f64::from(tenths) / 10.0;
            let glyphs = StarRating::from_rating(rating).glyphs();
            assert_eq!(glyphs.chars().count(), 5, "rating {}", rating);
        }
        assert_eq!(StarRating::from_rating(5.0).glyphs(), "★★★★★");
        assert_eq!(StarRating::from_rating(0.0).glyphs(), "☆☆☆☆☆");
    }

    #[test]
    fn missing_rating_has_no_glyphs() {
        assert_eq!(star_glyphs(None), None);
        assert_eq!(rating_label(None, Some(12)), "No rating");
    }

    #[test]
    fn rating_labels() {
        assert_eq!(rating_label(Some(4.5), Some(1320)), "4.5 (1320 reviews)");
        assert_eq!(rating_label(Some(4.0), None), "4.0");
    }

    #[test]
    fn price_levels() {
        assert_eq!(price_text(Some(2)), Some("$$".to_owned()));
        assert_eq!(price_text(Some(9)), Some("$$$$".to_owned()));
        assert_eq!(price_text(Some(0)), None);
        assert_eq!(price_text(None), None);
    }

    #[test]
    fn open_now() {
        assert_eq!(open_now_text(Some(true)), Some("Open now"));
        assert_eq!(open_now_text(Some(false)), Some("Closed"));
        assert_eq!(open_now_text(None), None);
    }
}
