//! Window and OpenGL context provider built on winit + glutin.

pub mod events;

use std::ffi::CString;
use std::num::NonZeroU32;

use glutin::{
    config::{ColorBufferType, ConfigTemplateBuilder},
    context::{ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version},
    display::{GetGlDisplay, GlDisplay},
    prelude::*,
    surface::{Surface, SwapInterval, WindowSurface},
};
use glutin_winit::{DisplayBuilder, GlWindow as _};
use log::{info, warn};
use raw_window_handle::HasRawWindowHandle;
use winit::{
    dpi::LogicalSize,
    event_loop::EventLoop,
    window::{Fullscreen, Window, WindowBuilder, WindowId},
};

use crate::config::{DisplayMode, RenderConfig, WindowConfig};
use crate::gpu::GlowGpu;
use crate::render::{Presenter, Viewport};
use crate::utils::{AppError, FrameError};

/// An OS window with a current OpenGL context and its draw surface.
///
/// Dropping the value releases the surface, context and window in field
/// order.
pub struct GlWindow {
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    window: Window,
}

impl GlWindow {
    /// Opens the window and makes a fresh context current on it.
    pub fn open<T>(
        event_loop: &EventLoop<T>,
        window_config: &WindowConfig,
        render_config: &RenderConfig,
    ) -> crate::utils::error::Result<Self> {
        let mut window_builder = WindowBuilder::new()
            .with_title(window_config.title.as_str())
            .with_inner_size(LogicalSize::new(window_config.width, window_config.height))
            .with_resizable(window_config.resizable);
        if window_config.display_mode == DisplayMode::Fullscreen {
            window_builder = window_builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let channel_bits = window_config.color_bits / 3;
        let template = ConfigTemplateBuilder::new()
            .with_buffer_type(ColorBufferType::Rgb {
                r_size: channel_bits,
                g_size: channel_bits,
                b_size: channel_bits,
            })
            .with_depth_size(window_config.depth_bits);

        let display_builder = DisplayBuilder::new().with_window_builder(Some(window_builder));

        let (window, gl_config) = display_builder
            .build(event_loop, template, |configs| {
                configs
                    .reduce(|accum, config| {
                        if config.num_samples() > accum.num_samples() {
                            config
                        } else {
                            accum
                        }
                    })
                    // find_configs fails before the picker runs when nothing matches
                    .expect("display offered no GL configs")
            })
            .map_err(|e| AppError::WindowCreation(e.to_string()))?;

        let window = window
            .ok_or_else(|| AppError::WindowCreation("display builder returned no window".into()))?;
        let raw_window_handle = window.raw_window_handle();

        let [major, minor] = render_config.gl_version;
        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(major, minor))))
            .with_profile(GlProfile::Core)
            .with_debug(window_config.debug_context)
            .build(Some(raw_window_handle));

        let gl_display = gl_config.display();

        let not_current = unsafe {
            gl_display
                .create_context(&gl_config, &context_attributes)
                .map_err(|e| AppError::Init(format!("Failed to create OpenGL context: {e}")))?
        };

        let attrs = window.build_surface_attributes(Default::default());
        let surface = unsafe {
            gl_display
                .create_window_surface(&gl_config, &attrs)
                .map_err(|e| AppError::WindowCreation(format!("Failed to create GL surface: {e}")))?
        };

        let context = not_current
            .make_current(&surface)
            .map_err(|e| AppError::Init(format!("Failed to make context current: {e}")))?;

        let interval = match NonZeroU32::new(window_config.swap_interval) {
            Some(frames) => SwapInterval::Wait(frames),
            None => SwapInterval::DontWait,
        };
        if let Err(e) = surface.set_swap_interval(&context, interval) {
            warn!("Could not set swap interval: {}", e);
        }

        info!(
            "Opened \"{}\" window with {} depth bits",
            window_config.title,
            gl_config.depth_size()
        );

        Ok(Self {
            surface,
            context,
            window,
        })
    }

    /// Loads GL entry points for the context owned by this window.
    pub fn load_gpu(&self) -> GlowGpu {
        let display = self.context.display();
        // `open` made the context current and this thread keeps it that way.
        unsafe {
            GlowGpu::from_loader(|symbol| match CString::new(symbol) {
                Ok(symbol) => display.get_proc_address(symbol.as_c_str()),
                Err(_) => std::ptr::null(),
            })
        }
    }

    pub fn id(&self) -> WindowId {
        self.window.id()
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    /// Current drawable size, or `None` while minimized.
    pub fn viewport(&self) -> Option<Viewport> {
        let (width, height) = events::physical_to_i32(self.window.inner_size());
        Viewport::new(width, height).ok()
    }
}

impl Presenter for GlWindow {
    fn present(&mut self) -> Result<(), FrameError> {
        self.surface
            .swap_buffers(&self.context)
            .map_err(|e| FrameError::Present(e.to_string()))
    }

    fn resize(&mut self, width: NonZeroU32, height: NonZeroU32) {
        self.surface.resize(&self.context, width, height);
    }
}
