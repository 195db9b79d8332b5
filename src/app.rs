use log::{error, info};
use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoopBuilder;

use crate::config::AppConfig;
use crate::render::{FrameDriver, LoopControl, Viewport};
use crate::utils::{AppError, FrameError};
use crate::window::{events, GlWindow};

/// Opens the window and renders until it is closed.
///
/// Window events are queued on the driver as they arrive and the queue is
/// drained once per loop iteration, right before the loop would sleep.
pub fn run(config: &AppConfig) -> crate::utils::error::Result<()> {
    let event_loop = EventLoopBuilder::new().build()?;
    let mut window = GlWindow::open(&event_loop, &config.window, &config.render)?;

    let viewport = match window.viewport() {
        Some(viewport) => viewport,
        None => Viewport::new(
            i32::try_from(config.window.width).unwrap_or(i32::MAX),
            i32::try_from(config.window.height).unwrap_or(i32::MAX),
        )?,
    };

    let mut driver = FrameDriver::new(window.load_gpu(), config.render.clone(), viewport);
    driver.initialize()?;

    let mut outcome: Result<(), FrameError> = Ok(());
    event_loop.run(|event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => {
            if let WindowEvent::Resized(size) = &event {
                info!("Window resized to {}x{}", size.width, size.height);
            }
            if let Some(event) = events::translate(&event) {
                driver.push_event(event);
            }
        }
        Event::AboutToWait => match driver.process_events(&mut window) {
            Ok(LoopControl::Continue) => window.request_redraw(),
            Ok(LoopControl::Exit) => elwt.exit(),
            Err(err) => {
                error!("Rendering stopped: {}", err);
                driver.shutdown();
                outcome = Err(err);
                elwt.exit();
            }
        },
        Event::LoopExiting => driver.shutdown(),
        _ => (),
    })?;

    info!("Rendered {} frames", driver.frames());
    outcome.map_err(AppError::from)
}
