//! # Pipeline
//! Runs the three stages in order (resolve the location, query nearby
//! places, render the results) and reports each transition on the status
//! surface.
//!
//! Everything the stages write to lives in a caller-owned
//! `PipelineContext`. Every run takes a new run id from the context, and a
//! run only writes to the context while its id is still the latest one.
//! An older run which finishes after a newer one has started is discarded.

use crate::api::{
    LocationProvider, MapSurface, PlacesProvider, PositionOptions, StatusSink,
};
use crate::err::Error;
use crate::location::resolve_location;
use crate::places::nearby_query;
use crate::render::{PlaceDetail, RenderOptions, RenderState, Renderer};
use crate::status::Status;
use futures::lock::Mutex;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};

/// The map zoom used once the location is known.
pub const DEFAULT_ZOOM: u8 = 15;
/// The map zoom used when a single place is selected.
pub const DETAIL_ZOOM: u8 = 17;

/// Settings for the location and map stages of a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PipelineOptions {
    pub position: PositionOptions,
    /// The zoom level the map is centered at after the location resolves.
    pub zoom: u8,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            position: PositionOptions::default(),
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// How a run which did not fail ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunOutcome {
    /// This many places were rendered.
    Rendered { count: usize },
    /// The search succeeded but found nothing; the render state is empty.
    NoResults,
    /// A newer run started before this one finished, so its results were
    /// discarded.
    Superseded,
}

struct ContextState<M, S> {
    surface: M,
    status: S,
    renderer: Renderer,
}

/// The map surface, status surface and render state shared by pipeline
/// runs.
pub struct PipelineContext<M, S> {
    latest_run: AtomicU64,
    state: Mutex<ContextState<M, S>>,
}

impl<M, S> PipelineContext<M, S>
where
    M: MapSurface,
    S: StatusSink,
{
    pub fn new(surface: M, status: S, render_options: RenderOptions) -> Self {
        Self {
            latest_run: AtomicU64::new(0),
            state: Mutex::new(ContextState {
                surface,
                status,
                renderer: Renderer::new(render_options),
            }),
        }
    }

    /// Return the id of the most recently started run, or 0 if no run has
    /// started.
    pub fn latest_run(&self) -> u64 {
        self.latest_run.load(Ordering::SeqCst)
    }

    /// Return a copy of what is currently rendered.
    pub async fn render_state(&self) -> RenderState {
        self.state.lock().await.renderer.state().clone()
    }

    pub async fn with_surface<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut M) -> R,
    {
        f(&mut self.state.lock().await.surface)
    }

    pub async fn with_status<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut S) -> R,
    {
        f(&mut self.state.lock().await.status)
    }

    /// Select a rendered place: recenter the map on it and reveal its
    /// detail popup.
    pub async fn select(&self, index: usize) -> Option<PlaceDetail> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.renderer.select(index, DETAIL_ZOOM, &mut state.surface)
    }

    /// Consume the context, returning the map surface, status surface and
    /// renderer.
    pub fn into_parts(self) -> (M, S, Renderer) {
        let state = self.state.into_inner();
        (state.surface, state.status, state.renderer)
    }

    fn begin_run(&self) -> u64 {
        self.latest_run.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, run_id: u64) -> bool {
        self.latest_run() == run_id
    }
}

/// Finds bars near the caller's location.
///
/// # Example
/// ```rust,no_run
/// # async fn run() {
/// use barfinder::{
///     GooglePlacesClient, IpLocator, MemorySurface, Pipeline,
///     PipelineContext, RenderOptions,
/// };
/// let location = IpLocator::new().unwrap();
/// let places = GooglePlacesClient::new("my-api-key", Some(30)).unwrap();
/// let pipeline = Pipeline::new(location, places);
///
/// let ctx = PipelineContext::new(
///     MemorySurface::new(),
///     String::new(),
///     RenderOptions::enriched(),
/// );
/// let outcome = pipeline.run_guarded(&ctx).await;
/// # }
/// ```
pub struct Pipeline<L, P> {
    location: L,
    places: P,
    options: PipelineOptions,
}

impl<L, P> Pipeline<L, P>
where
    L: LocationProvider,
    P: PlacesProvider,
{
    pub fn new(location: L, places: P) -> Self {
        Self::with_options(location, places, PipelineOptions::default())
    }

    pub fn with_options(
        location: L,
        places: P,
        options: PipelineOptions,
    ) -> Self {
        Self {
            location,
            places,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run the pipeline once.
    ///
    /// Any error is terminal for the run: it is written to the status
    /// surface and returned, and later stages are skipped.
    pub async fn run<M, S>(
        &self,
        ctx: &PipelineContext<M, S>,
    ) -> Result<RunOutcome, Error>
    where
        M: MapSurface,
        S: StatusSink,
    {
        let run_id = ctx.begin_run();
        self.run_stages(ctx, run_id).await
    }

    /// Run the pipeline once, also catching any panic which escapes it.
    ///
    /// A caught panic is logged, written to the status surface as
    /// `"Error: {message}"`, and returned as `Error::Unhandled`. A panic
    /// from a run which has been superseded leaves the status untouched
    /// and returns `RunOutcome::Superseded`.
    pub async fn run_guarded<M, S>(
        &self,
        ctx: &PipelineContext<M, S>,
    ) -> Result<RunOutcome, Error>
    where
        M: MapSurface,
        S: StatusSink,
    {
        let run_id = ctx.begin_run();
        let stages = AssertUnwindSafe(self.run_stages(ctx, run_id));
        match stages.catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let msg = panic_message(&*panic);
                let err = Error::Unhandled(msg);
                if self.report(ctx, run_id, Status::Failed(err.clone())).await {
                    log::error!("Unhandled failure in run {}: {}", run_id, err);
                    Err(err)
                } else {
                    log::debug!(
                        "Ignoring panic from superseded run {}: {}",
                        run_id,
                        err
                    );
                    Ok(RunOutcome::Superseded)
                }
            }
        }
    }

    async fn run_stages<M, S>(
        &self,
        ctx: &PipelineContext<M, S>,
        run_id: u64,
    ) -> Result<RunOutcome, Error>
    where
        M: MapSurface,
        S: StatusSink,
    {
        log::info!("Starting pipeline run {}", run_id);

        if !self.report(ctx, run_id, Status::RequestingLocation).await {
            return Ok(RunOutcome::Superseded);
        }

        let position_options = &self.options.position;
        let resolved = resolve_location(&self.location, position_options).await;
        let coord = match resolved {
            Ok(coord) => coord,
            Err(err) => return self.fail(ctx, run_id, err).await,
        };

        {
            let mut guard = ctx.state.lock().await;
            if !ctx.is_latest(run_id) {
                log::debug!("Discarding location for superseded run {}", run_id);
                return Ok(RunOutcome::Superseded);
            }
            let state = &mut *guard;
            state.status.set_status(&Status::Located(coord).to_string());
            state.surface.set_view(coord, self.options.zoom);
            state.status.set_status(&Status::Searching.to_string());
        }

        let places = match nearby_query(&self.places, coord).await {
            Ok(places) => places,
            Err(err) => return self.fail(ctx, run_id, err).await,
        };

        let mut guard = ctx.state.lock().await;
        if !ctx.is_latest(run_id) {
            log::debug!("Discarding results for superseded run {}", run_id);
            return Ok(RunOutcome::Superseded);
        }
        let state = &mut *guard;

        if places.is_empty() {
            state.renderer.clear(&mut state.surface);
            state.status.set_status(&Status::NoResults.to_string());
            log::info!("Run {} found no bars near {:.4}", run_id, coord);
            return Ok(RunOutcome::NoResults);
        }

        let count = state.renderer.render(places, &mut state.surface);
        state.status.set_status(&Status::Found(count).to_string());
        log::info!("Run {} rendered {} bars near {:.4}", run_id, count, coord);
        Ok(RunOutcome::Rendered { count })
    }

    /// Write `status` if `run_id` is still the latest run. Returns false if
    /// the run has been superseded.
    async fn report<M, S>(
        &self,
        ctx: &PipelineContext<M, S>,
        run_id: u64,
        status: Status,
    ) -> bool
    where
        M: MapSurface,
        S: StatusSink,
    {
        let mut state = ctx.state.lock().await;
        if !ctx.is_latest(run_id) {
            return false;
        }
        state.status.set_status(&status.to_string());
        true
    }

    async fn fail<M, S>(
        &self,
        ctx: &PipelineContext<M, S>,
        run_id: u64,
        err: Error,
    ) -> Result<RunOutcome, Error>
    where
        M: MapSurface,
        S: StatusSink,
    {
        if self.report(ctx, run_id, Status::Failed(err.clone())).await {
            log::warn!("Run {} failed: {}", run_id, err);
            Err(err)
        } else {
            log::debug!("Ignoring error from superseded run {}: {}", run_id, err);
            Ok(RunOutcome::Superseded)
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_owned()
    }
}
