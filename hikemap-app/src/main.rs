//! hikemap-app - headless command-line driver
//!
//! Brings up a map session against the headless surface, applies the
//! requested view and layer changes, persists the result and prints the
//! state record.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use hikemap::{
    plugins::settings::SettingsControl, ControllerBuilder, HeadlessView, JsonFileStateStore,
    LatLng, LayerCategory, LayerRegistry, MapController, Point, Settings,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hikemap")]
#[command(about = "Drive a hiking map session without a display", long_about = None)]
struct Args {
    /// State file, created on first save
    #[arg(long, default_value = "hikemap-state.json")]
    state: PathBuf,

    /// JSON layer catalog (builtin catalog if omitted)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Pan to "lat,lng"
    #[arg(long, value_parser = parse_lat_lng)]
    center: Option<LatLng>,

    /// Zoom to this level
    #[arg(long)]
    zoom: Option<f64>,

    /// Switch category (hiking, satellite, map)
    #[arg(long)]
    category: Option<LayerCategory>,

    /// Select a base layer by id
    #[arg(long)]
    layer: Option<String>,

    /// Toggle an overlay by id
    #[arg(long)]
    overlay: Option<String>,

    /// Client user agent
    #[arg(long)]
    user_agent: Option<String>,

    /// Surface width and height in pixels
    #[arg(long, default_value = "1024x768", value_parser = parse_size)]
    size: Point,
}

fn parse_lat_lng(value: &str) -> std::result::Result<LatLng, String> {
    let (lat, lng) = value
        .split_once(',')
        .ok_or_else(|| format!("expected \"lat,lng\", got \"{}\"", value))?;
    let lat_lng = LatLng::new(
        lat.trim().parse().map_err(|e| format!("latitude: {}", e))?,
        lng.trim().parse().map_err(|e| format!("longitude: {}", e))?,
    );
    if !lat_lng.is_valid() {
        return Err(format!("{:?} is out of range", lat_lng));
    }
    Ok(lat_lng)
}

fn parse_size(value: &str) -> std::result::Result<Point, String> {
    let (width, height) = value
        .split_once('x')
        .ok_or_else(|| format!("expected \"WIDTHxHEIGHT\", got \"{}\"", value))?;
    Ok(Point::new(
        width.parse().map_err(|e| format!("width: {}", e))?,
        height.parse().map_err(|e| format!("height: {}", e))?,
    ))
}

fn select(controller: &mut MapController, control: SettingsControl, name: &str) -> Result<()> {
    let changed = controller
        .with_plugin::<Settings, _, _>(|settings, ctx| settings.click(control, name, ctx))
        .ok_or_else(|| anyhow!("settings plugin is not loaded"))?
        .map_err(|e| anyhow!("{:?} '{}': {}", control, name, e))?;
    if !changed {
        log::warn!("{:?} '{}' left the selection unchanged", control, name);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let store = JsonFileStateStore::open(&args.state)
        .map_err(|e| anyhow!("{}", e))
        .with_context(|| format!("opening {}", args.state.display()))?;

    let mut builder = ControllerBuilder::new()
        .with_headless_surface(args.size)
        .with_store(store)
        .with_default_plugins();
    if let Some(path) = &args.catalog {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        let registry = LayerRegistry::from_json(&json).map_err(|e| anyhow!("{}", e))?;
        builder = builder.with_registry(registry);
    }
    if let Some(user_agent) = &args.user_agent {
        builder = builder.with_user_agent(user_agent.as_str());
    }

    let mut controller = builder.start().await.map_err(|e| anyhow!("{}", e))?;

    if let Some(view) = controller.view_mut::<HeadlessView>() {
        if let Some(center) = args.center {
            view.pan_to(center);
        }
        if let Some(zoom) = args.zoom {
            view.zoom_to(zoom);
        }
    }
    if let Some(category) = args.category {
        select(&mut controller, SettingsControl::MapType, category.as_str())?;
    }
    if let Some(layer) = &args.layer {
        select(&mut controller, SettingsControl::Layer, layer)?;
    }
    if let Some(overlay) = &args.overlay {
        select(&mut controller, SettingsControl::Overlay, overlay)?;
    }

    let events = controller
        .process_events()
        .map_err(|e| anyhow!("{}", e))?;
    log::info!("handled {} events", events.len());
    controller.save_state();

    println!("{}", serde_json::to_string_pretty(controller.state())?);
    Ok(())
}
