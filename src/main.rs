use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use splat_host::cli::Cli;
use splat_host::frame::FrameIterator;
use splat_host::{Event, EventKind, Events, FileAssetLoader, HeadlessSurface, RenderSurface, Scene};

const FRAME_TIME: Duration = Duration::from_millis(16);

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.scene_config().context("failed to read configuration")?;

    let events = Events::new();
    let errors = Rc::new(Cell::new(0u32));
    let e = errors.clone();
    events.on(EventKind::Error, move |event| {
        if let Event::Error(Some(err)) = event {
            log::error!("{err}");
            e.set(e.get() + 1);
        }
    });
    events.on(EventKind::BoundUpdated, |_| log::debug!("scene bound updated"));

    let surface = HeadlessSurface::new(cli.width, cli.height, 1.0);
    let mut scene = Scene::new(events, config, surface, FileAssetLoader::new());

    pollster::block_on(scene.load()).context("startup load failed")?;
    if let Some(bound) = scene.bound() {
        log::info!("scene bound {:?} .. {:?}", bound.min, bound.max);
    }

    let mut rendered = 0u64;
    for frame in FrameIterator::with_fixed_delta(FRAME_TIME).take(cli.frames as usize) {
        let report = scene.step(frame.delta);
        if report.rendered {
            rendered += 1;
        }
    }
    scene.settle_loads();

    let (width, height) = scene.target_size();
    println!(
        "{} frames, {} rendered, {} elements, target {}x{} of {}x{}, {} errors",
        cli.frames,
        rendered,
        scene.len(),
        width,
        height,
        scene.surface().width(),
        scene.surface().height(),
        errors.get()
    );

    Ok(())
}
