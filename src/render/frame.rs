//! Per-frame orchestration of the shader and geometry units.
//!
//! The driver moves through `Uninitialized → Ready → Rendering → Destroyed`.
//! Window notifications arrive as [`DriverEvent`]s queued by the shell and
//! drained once per loop iteration, so resize, redraw and close are handled
//! in the order the window system produced them.

use std::collections::VecDeque;
use std::fmt;
use std::num::NonZeroU32;

use log::{debug, info, warn};

use crate::config::RenderConfig;
use crate::gpu::{self, Gpu, PrimitiveKind};
use crate::render::geometry::{triangle_geometry, GeometryBuffer};
use crate::render::shaders::{triangle_shaders, ShaderProgram};
use crate::utils::FrameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Uninitialized,
    Ready,
    Rendering,
    Destroyed,
}

impl FrameState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Rendering => "rendering",
            Self::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    Resized { width: i32, height: i32 },
    RedrawRequested,
    CloseRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    width: i32,
    height: i32,
}

impl Viewport {
    /// Rejects zero and negative sizes.
    pub fn new(width: i32, height: i32) -> Result<Self, FrameError> {
        if width <= 0 || height <= 0 {
            return Err(FrameError::InvalidViewport { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }
}

/// Presentation half of the window/context provider.
pub trait Presenter {
    /// Swaps buffers, blocking for vsync when a swap interval is set.
    fn present(&mut self) -> Result<(), FrameError>;
    fn resize(&mut self, width: NonZeroU32, height: NonZeroU32);
}

struct RenderUnits<G: Gpu> {
    program: ShaderProgram<G>,
    geometry: GeometryBuffer<G>,
}

pub struct FrameDriver<G: Gpu> {
    gpu: G,
    config: RenderConfig,
    state: FrameState,
    units: Option<RenderUnits<G>>,
    viewport: Viewport,
    events: VecDeque<DriverEvent>,
    frames: u64,
}

impl<G: Gpu> FrameDriver<G> {
    pub fn new(gpu: G, config: RenderConfig, viewport: Viewport) -> Self {
        Self {
            gpu,
            config,
            state: FrameState::Uninitialized,
            units: None,
            viewport,
            events: VecDeque::new(),
            frames: 0,
        }
    }

    /// Sets up context state and creates the shader and geometry units.
    ///
    /// On failure nothing stays allocated and the driver remains
    /// `Uninitialized`.
    pub fn initialize(&mut self) -> Result<(), FrameError> {
        self.expect_state("initialize", &[FrameState::Uninitialized])?;

        info!("OpenGL version {}", self.gpu.version_string());
        if let Some(stale) = gpu::drain_errors(&self.gpu) {
            warn!("Discarding pending GL error before setup: {}", stale);
        }

        if self.config.depth_test {
            self.gpu.enable(glow::DEPTH_TEST);
        }
        let [red, green, blue, alpha] = self.config.clear_color;
        self.gpu.clear_color(red, green, blue, alpha);
        self.gpu
            .viewport(0, 0, self.viewport.width, self.viewport.height);
        gpu::check_error(&self.gpu, "setting up context state").map_err(|source| {
            FrameError::Gpu {
                operation: "setting up context state",
                source,
            }
        })?;

        let program = ShaderProgram::new(
            &self.gpu,
            triangle_shaders::VERTEX_SRC,
            triangle_shaders::FRAGMENT_SRC,
        )?;

        let geometry = match GeometryBuffer::create(
            &self.gpu,
            &triangle_geometry::POSITIONS,
            &triangle_geometry::COLORS,
            triangle_geometry::VERTEX_COUNT,
        ) {
            Ok(geometry) => geometry,
            Err(err) => {
                program.destroy(&self.gpu);
                return Err(err.into());
            }
        };

        let mismatched = program.layout_mismatches(&self.gpu, geometry.layout());
        if !mismatched.is_empty() {
            warn!(
                "Shader attribute locations disagree with the vertex layout for {:?}",
                mismatched
            );
        }

        self.units = Some(RenderUnits { program, geometry });
        self.state = FrameState::Ready;
        info!(
            "Renderer ready at {}x{}",
            self.viewport.width, self.viewport.height
        );
        Ok(())
    }

    pub fn push_event(&mut self, event: DriverEvent) {
        self.events.push_back(event);
    }

    /// Drains queued events in arrival order.
    ///
    /// A close tears everything down immediately and discards whatever was
    /// queued behind it.
    pub fn process_events<P: Presenter>(
        &mut self,
        presenter: &mut P,
    ) -> Result<LoopControl, FrameError> {
        while let Some(event) = self.events.pop_front() {
            match event {
                DriverEvent::Resized { width, height } => {
                    if let Err(err) = self.resize(presenter, width, height) {
                        warn!("Ignoring resize: {}", err);
                    }
                }
                DriverEvent::RedrawRequested => self.render_frame(presenter)?,
                DriverEvent::CloseRequested => {
                    self.events.clear();
                    self.shutdown();
                    return Ok(LoopControl::Exit);
                }
            }
        }
        Ok(LoopControl::Continue)
    }

    /// Matches the viewport and surface to a new window size.
    pub fn resize<P: Presenter>(
        &mut self,
        presenter: &mut P,
        width: i32,
        height: i32,
    ) -> Result<Viewport, FrameError> {
        self.expect_state(
            "resize",
            &[FrameState::Uninitialized, FrameState::Ready, FrameState::Rendering],
        )?;
        let viewport = Viewport::new(width, height)?;

        if let (Some(w), Some(h)) = (
            NonZeroU32::new(viewport.width.unsigned_abs()),
            NonZeroU32::new(viewport.height.unsigned_abs()),
        ) {
            presenter.resize(w, h);
        }
        if let Some(stale) = gpu::drain_errors(&self.gpu) {
            warn!("Discarding pending GL error before resize: {}", stale);
        }
        self.gpu.viewport(0, 0, viewport.width, viewport.height);
        if let Err(err) = gpu::check_error(&self.gpu, "resizing viewport") {
            warn!("Viewport {}x{} not applied cleanly: {}", width, height, err);
        }
        self.viewport = viewport;
        debug!("Viewport resized to {}x{}", width, height);
        Ok(viewport)
    }

    /// Clears, draws the triangle and presents.
    pub fn render_frame<P: Presenter>(&mut self, presenter: &mut P) -> Result<(), FrameError> {
        self.expect_state("render", &[FrameState::Ready, FrameState::Rendering])?;
        let Some(units) = &self.units else {
            return Err(FrameError::WrongState {
                operation: "render",
                state: self.state.name(),
            });
        };

        self.gpu
            .clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        units.program.activate(&self.gpu);
        units.geometry.bind(&self.gpu);
        units.geometry.draw(
            &self.gpu,
            PrimitiveKind::Triangles,
            units.geometry.vertex_count(),
        )?;

        // Rendering carries on in whatever state the driver left it.
        if let Err(err) = gpu::check_error(&self.gpu, "drawing frame") {
            warn!("Frame {} rendered with GL error: {}", self.frames, err);
        }

        presenter.present()?;
        self.frames += 1;
        self.state = FrameState::Rendering;
        debug!("Presented frame {}", self.frames);
        Ok(())
    }

    /// Destroys the geometry, then the shader program.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(RenderUnits { program, geometry }) = self.units.take() {
            geometry.destroy(&self.gpu);
            program.destroy(&self.gpu);
            info!("Released GPU resources after {} frames", self.frames);
        }
        self.state = FrameState::Destroyed;
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    /// Program and vertex array handles while resources are alive.
    pub fn handles(&self) -> Option<(G::Program, G::VertexArray)> {
        self.units
            .as_ref()
            .map(|units| (units.program.handle(), units.geometry.handles().0))
    }

    fn expect_state(
        &self,
        operation: &'static str,
        allowed: &[FrameState],
    ) -> Result<(), FrameError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(FrameError::WrongState {
                operation,
                state: self.state.name(),
            })
        }
    }
}
