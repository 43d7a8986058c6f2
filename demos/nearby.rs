// Run with `BARFINDER_PLACES_API_KEY` set. Pass a latitude and longitude
// to skip the IP location lookup, e.g.
//     cargo run --example nearby -- 51.5074 -0.1278
// Set `RUST_LOG=debug` to see each pipeline step.

use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    use barfinder::{
        Coord, FixedLocation, GooglePlacesClient, IpLocator, LocationProvider,
        MemorySurface, Pipeline, PipelineContext, RenderOptions,
    };

    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let location: Box<dyn LocationProvider> = match args.as_slice() {
        [lat, lng] => {
            Box::new(FixedLocation::new(Coord::new(lat.parse()?, lng.parse()?)))
        }
        _ => Box::new(IpLocator::new()?),
    };

    let places = GooglePlacesClient::from_env(Some(30))?;
    let pipeline = Pipeline::new(location, places);
    let ctx = PipelineContext::new(
        MemorySurface::new(),
        String::new(),
        RenderOptions::enriched(),
    );

    let outcome = pipeline.run_guarded(&ctx).await;
    println!("{}", ctx.with_status(|status| status.clone()).await);

    if outcome.is_ok() {
        for entry in ctx.render_state().await.entries() {
            println!("\n{}", entry);
        }
    }

    Ok(())
}
