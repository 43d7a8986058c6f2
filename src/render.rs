//! # Result Renderer
//! The last pipeline stage. Each place becomes one map marker and one list
//! entry, and every render replaces whatever the previous render produced.

use crate::api::MapSurface;
use crate::coord::Coord;
use crate::places::PlaceResult;
use crate::stars::{open_now_text, price_text, rating_label, star_glyphs};
use std::cmp::Ordering;

/// Shown in a list entry when a place has no address.
pub const ADDRESS_PLACEHOLDER: &str = "Address N/A";
/// Shown in a list entry when a place has no rating.
pub const RATING_PLACEHOLDER: &str = "N/A";

/// Controls the optional parts of a render.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RenderOptions {
    /// Order places by descending rating, with unrated places counted
    /// as 0. Places with equal ratings keep the provider's order.
    pub sort_by_rating: bool,
    pub show_stars: bool,
    pub show_price: bool,
    pub show_open_now: bool,
}

impl RenderOptions {
    /// Every enrichment turned on.
    pub fn enriched() -> Self {
        Self {
            sort_by_rating: true,
            show_stars: true,
            show_price: true,
            show_open_now: true,
        }
    }
}

/// A marker placed on the map for one place.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    position: Coord,
    title: String,
}

impl Marker {
    pub fn new<T: Into<String>>(position: Coord, title: T) -> Self {
        Self {
            position,
            title: title.into(),
        }
    }

    fn for_place(place: &PlaceResult) -> Self {
        Self::new(place.position(), place.name())
    }

    pub fn position(&self) -> Coord {
        self.position
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

/// The textual summary of one place in the results list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListEntry {
    name: String,
    address: String,
    rating: String,
    stars: Option<String>,
    rating_label: Option<String>,
    price: Option<String>,
    open_now: Option<String>,
}

impl ListEntry {
    fn for_place(place: &PlaceResult, options: &RenderOptions) -> Self {
        let (stars, label) = if options.show_stars {
            (
                star_glyphs(place.rating()),
                Some(rating_label(place.rating(), place.review_count())),
            )
        } else {
            (None, None)
        };

        Self {
            name: place.name().to_owned(),
            address: place
                .address()
                .unwrap_or(ADDRESS_PLACEHOLDER)
                .to_owned(),
            rating: rating_text(place.rating()),
            stars,
            rating_label: label,
            price: if options.show_price {
                price_text(place.price_level())
            } else {
                None
            },
            open_now: if options.show_open_now {
                open_now_text(place.open_now()).map(|text| text.to_owned())
            } else {
                None
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the address, or `"Address N/A"`.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Return the numeric rating as text, or `"N/A"`.
    pub fn rating(&self) -> &str {
        &self.rating
    }

    pub fn stars(&self) -> Option<&str> {
        self.stars.as_deref()
    }

    pub fn rating_label(&self) -> Option<&str> {
        self.rating_label.as_deref()
    }

    pub fn price(&self) -> Option<&str> {
        self.price.as_deref()
    }

    pub fn open_now(&self) -> Option<&str> {
        self.open_now.as_deref()
    }
}

impl std::fmt::Display for ListEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", self.address)?;
        match (&self.stars, &self.rating_label) {
            (Some(stars), Some(label)) => write!(f, "{} {}", stars, label)?,
            (None, Some(label)) => write!(f, "{}", label)?,
            _ => write!(f, "Rating: {}", self.rating)?,
        }
        if let Some(price) = &self.price {
            write!(f, "\n{}", price)?;
        }
        if let Some(open_now) = &self.open_now {
            write!(f, "\n{}", open_now)?;
        }
        Ok(())
    }
}

/// The popup revealed when a marker or list entry is selected.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaceDetail {
    name: String,
    position: Coord,
    address: String,
    rating_label: String,
    stars: Option<String>,
    price: Option<String>,
    open_now: Option<String>,
}

impl PlaceDetail {
    fn for_place(place: &PlaceResult) -> Self {
        Self {
            name: place.name().to_owned(),
            position: place.position(),
            address: place
                .address()
                .unwrap_or(ADDRESS_PLACEHOLDER)
                .to_owned(),
            rating_label: rating_label(place.rating(), place.review_count()),
            stars: star_glyphs(place.rating()),
            price: price_text(place.price_level()),
            open_now: open_now_text(place.open_now()).map(|text| text.to_owned()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Coord {
        self.position
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn rating_label(&self) -> &str {
        &self.rating_label
    }

    pub fn stars(&self) -> Option<&str> {
        self.stars.as_deref()
    }

    pub fn price(&self) -> Option<&str> {
        self.price.as_deref()
    }

    pub fn open_now(&self) -> Option<&str> {
        self.open_now.as_deref()
    }
}

/// The markers and list entries currently on screen.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderState {
    places: Vec<PlaceResult>,
    markers: Vec<Marker>,
    entries: Vec<ListEntry>,
}

impl RenderState {
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    /// Return the places in the order they were rendered.
    pub fn places(&self) -> &[PlaceResult] {
        &self.places
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn clear(&mut self) {
        self.places.clear();
        self.markers.clear();
        self.entries.clear();
    }

    /// Return a string containing a CSV representation of the list
    /// entries, with the columns name, address, rating, price and open now.
    #[cfg(feature = "list_csv")]
    pub fn to_csv_string(&self) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.write_record(&["name", "address", "rating", "price", "open_now"])?;

        for entry in &self.entries {
            writer.write_record(&[
                entry.name(),
                entry.address(),
                entry.rating(),
                entry.price().unwrap_or(""),
                entry.open_now().unwrap_or(""),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|err| csv::Error::from(err.into_error()))?;
        Ok(String::from_utf8(bytes)
            .expect("Bytes should be UTF8 since all input was UTF8"))
    }
}

/// Turns place results into markers and list entries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Renderer {
    options: RenderOptions,
    state: RenderState,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            state: RenderState::default(),
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Return what is currently rendered.
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Remove all previously rendered markers and entries.
    pub fn clear<S>(&mut self, surface: &mut S)
    where
        S: MapSurface + ?Sized,
    {
        surface.clear_markers();
        self.state.clear();
    }

    /// Replace the current output with one marker and one list entry per
    /// place. Returns the number of places rendered.
    ///
    /// The input is assumed to be valid; provider status codes are not
    /// this function's concern.
    pub fn render<S>(
        &mut self,
        mut places: Vec<PlaceResult>,
        surface: &mut S,
    ) -> usize
    where
        S: MapSurface + ?Sized,
    {
        self.clear(surface);

        if self.options.sort_by_rating {
            sort_by_rating(&mut places);
        }

        for place in &places {
            let marker = Marker::for_place(place);
            surface.add_marker(&marker);
            self.state.markers.push(marker);
            self.state
                .entries
                .push(ListEntry::for_place(place, &self.options));
        }
        self.state.places = places;

        log::debug!("Rendered {} places", self.state.len());
        self.state.len()
    }

    /// Select the place at `index`: recenter the view on it and reveal its
    /// detail popup. Returns `None` if nothing is rendered at `index`.
    pub fn select<S>(
        &self,
        index: usize,
        zoom: u8,
        surface: &mut S,
    ) -> Option<PlaceDetail>
    where
        S: MapSurface + ?Sized,
    {
        let place = self.state.places.get(index)?;
        let detail = PlaceDetail::for_place(place);
        surface.set_view(place.position(), zoom);
        surface.show_detail(&detail);
        Some(detail)
    }
}

/// Sort places by descending rating, counting a missing rating as 0.
/// The sort is stable, so equally rated places keep their order.
pub fn sort_by_rating(places: &mut [PlaceResult]) {
    places.sort_by(|a, b| {
        let a = a.rating().unwrap_or(0.0);
        let b = b.rating().unwrap_or(0.0);
        b.partial_cmp(&a).unwrap_or(Ordering::Equal)
    });
}

/// Zero and missing ratings both show the placeholder.
fn rating_text(rating: Option<f64>) -> String {
    match rating {
        Some(rating) if rating != 0.0 => rating.to_string(),
        _ => RATING_PLACEHOLDER.to_owned(),
    }
}

/// A `MapSurface` which keeps everything drawn on it in memory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemorySurface {
    markers: Vec<Marker>,
    view: Option<(Coord, u8)>,
    detail: Option<PlaceDetail>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Return the current view center and zoom, if a view was set.
    pub fn view(&self) -> Option<(Coord, u8)> {
        self.view
    }

    /// Return the detail popup which is currently open.
    pub fn detail(&self) -> Option<&PlaceDetail> {
        self.detail.as_ref()
    }
}

impl MapSurface for MemorySurface {
    fn clear_markers(&mut self) {
        self.markers.clear();
        self.detail = None;
    }

    fn add_marker(&mut self, marker: &Marker) {
        self.markers.push(marker.clone());
    }

    fn set_view(&mut self, center: Coord, zoom: u8) {
        self.view = Some((center, zoom));
    }

    fn show_detail(&mut self, detail: &PlaceDetail) {
        self.detail = Some(detail.clone());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn place(name: &str, rating: Option<f64>) -> PlaceResult {
        let place = PlaceResult::new(name, Coord::new(51.5, -0.1));
        match rating {
            Some(rating) => place.with_rating(rating),
            None => place,
        }
    }

    fn names(state: &RenderState) -> Vec<&str> {
        state.entries().iter().map(|entry| entry.name()).collect()
    }

    #[test]
    fn one_marker_and_entry_per_place() {
        let mut renderer = Renderer::new(RenderOptions::default());
        let mut surface = MemorySurface::new();
        let places = vec![
            place("A", Some(4.2)).with_address("1 High St"),
            place("B", None),
        ];

        let count = renderer.render(places, &mut surface);
        assert_eq!(count, 2);
        assert_eq!(surface.markers().len(), 2);
        assert_eq!(surface.markers()[0].title(), "A");

        let entries = renderer.state().entries();
        assert_eq!(entries[0].address(), "1 High St");
        assert_eq!(entries[0].rating(), "4.2");
        assert_eq!(entries[1].address(), "Address N/A");
        assert_eq!(entries[1].rating(), "N/A");
        assert_eq!(entries[1].stars(), None);
    }

    #[test]
    fn second_render_replaces_the_first() {
        let mut renderer = Renderer::new(RenderOptions::default());
        let mut surface = MemorySurface::new();

        renderer.render(vec![place("Old 1", None), place("Old 2", None)], &mut surface);
        renderer.render(vec![place("New", None)], &mut surface);

        assert_eq!(names(renderer.state()), vec!["New"]);
        assert_eq!(surface.markers().len(), 1);
        assert_eq!(surface.markers()[0].title(), "New");
    }

    #[test]
    fn empty_render_clears_everything() {
        let mut renderer = Renderer::new(RenderOptions::default());
        let mut surface = MemorySurface::new();

        renderer.render(vec![place("A", None)], &mut surface);
        renderer.render(Vec::new(), &mut surface);

        assert!(renderer.state().is_empty());
        assert!(surface.markers().is_empty());
    }

    #[test]
    fn sorted_by_rating_with_missing_as_zero() {
        let options = RenderOptions {
            sort_by_rating: true,
            ..RenderOptions::default()
        };
        let mut renderer = Renderer::new(options);
        let mut surface = MemorySurface::new();
        let places = vec![place("A", Some(4.2)), place("B", None), place("C", Some(4.8))];

        renderer.render(places, &mut surface);
        assert_eq!(names(renderer.state()), vec!["C", "A", "B"]);
        assert_eq!(surface.markers()[0].title(), "C");
    }

    #[test]
    fn sort_is_stable_for_ties() {
        let mut places = vec![
            place("first", Some(4.0)),
            place("unrated", None),
            place("second", Some(4.0)),
            place("zero", Some(0.0)),
        ];
        sort_by_rating(&mut places);
        let names: Vec<&str> = places.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["first", "second", "unrated", "zero"]);
    }

    #[test]
    fn unsorted_keeps_provider_order() {
        let mut renderer = Renderer::new(RenderOptions::default());
        let mut surface = MemorySurface::new();
        renderer.render(
            vec![place("A", Some(1.0)), place("B", Some(5.0))],
            &mut surface,
        );
        assert_eq!(names(renderer.state()), vec!["A", "B"]);
    }

    #[test]
    fn enriched_entries() {
        let mut renderer = Renderer::new(RenderOptions::enriched());
        let mut surface = MemorySurface::new();
        let places = vec![
            place("Rated", Some(3.5))
                .with_review_count(87)
                .with_price_level(2)
                .with_open_now(true),
            place("Unrated", None).with_open_now(false),
        ];

        renderer.render(places, &mut surface);
        let entries = renderer.state().entries();

        assert_eq!(entries[0].stars(), Some("★★★⯨☆"));
        assert_eq!(entries[0].rating_label(), Some("3.5 (87 reviews)"));
        assert_eq!(entries[0].price(), Some("$$"));
        assert_eq!(entries[0].open_now(), Some("Open now"));

        assert_eq!(entries[1].stars(), None);
        assert_eq!(entries[1].rating_label(), Some("No rating"));
        assert_eq!(entries[1].price(), None);
        assert_eq!(entries[1].open_now(), Some("Closed"));
    }

    #[test]
    fn entry_display() {
        let mut renderer = Renderer::new(RenderOptions::default());
        let mut surface = MemorySurface::new();
        renderer.render(vec![place("The Crown", Some(4.0))], &mut surface);

        let text = renderer.state().entries()[0].to_string();
        assert_eq!(text, "The Crown\nAddress N/A\nRating: 4");
    }

    #[test]
    fn select_recenters_and_shows_detail() {
        let mut renderer = Renderer::new(RenderOptions::default());
        let mut surface = MemorySurface::new();
        let target = PlaceResult::new("Target", Coord::new(1.0, 2.0))
            .with_rating(4.6)
            .with_address("2 Low Rd");
        renderer.render(vec![place("Other", None), target], &mut surface);

        let detail = renderer.select(1, 17, &mut surface).unwrap();
        assert_eq!(detail.name(), "Target");
        assert_eq!(detail.address(), "2 Low Rd");
        assert_eq!(detail.stars(), Some("★★★★⯨"));
        assert_eq!(surface.view(), Some((Coord::new(1.0, 2.0), 17)));
        assert_eq!(surface.detail(), Some(&detail));

        assert!(renderer.select(5, 17, &mut surface).is_none());
    }

    #[test]
    fn clearing_closes_detail_popup() {
        let mut renderer = Renderer::new(RenderOptions::default());
        let mut surface = MemorySurface::new();
        renderer.render(vec![place("A", None)], &mut surface);
        renderer.select(0, 15, &mut surface);
        assert!(surface.detail().is_some());

        renderer.render(vec![place("B", None)], &mut surface);
        assert!(surface.detail().is_none());
    }

    #[cfg(feature = "list_csv")]
    #[test]
    fn csv_export() {
        let mut renderer = Renderer::new(RenderOptions::enriched());
        let mut surface = MemorySurface::new();
        renderer.render(
            vec![place("A, the bar", Some(4.5)).with_price_level(1)],
            &mut surface,
        );
        let csv = renderer.state().to_csv_string().unwrap();
        assert_eq!(
            csv,
            "name,address,rating,price,open_now\n\"A, the bar\",Address N/A,4.5,$,\n"
        );
    }
}
