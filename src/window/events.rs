use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;

use crate::render::DriverEvent;

/// Clamps a physical size into GL's signed size range.
pub fn physical_to_i32(size: PhysicalSize<u32>) -> (i32, i32) {
    (
        i32::try_from(size.width).unwrap_or(i32::MAX),
        i32::try_from(size.height).unwrap_or(i32::MAX),
    )
}

/// Maps the window events the driver cares about; everything else is `None`.
pub fn translate(event: &WindowEvent) -> Option<DriverEvent> {
    match event {
        WindowEvent::CloseRequested | WindowEvent::Destroyed => Some(DriverEvent::CloseRequested),
        WindowEvent::Resized(size) => {
            let (width, height) = physical_to_i32(*size);
            Some(DriverEvent::Resized { width, height })
        }
        WindowEvent::RedrawRequested => Some(DriverEvent::RedrawRequested),
        _ => None,
    }
}
