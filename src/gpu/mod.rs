//! The slice of the OpenGL API the render units depend on.
//!
//! [`Gpu`] mirrors the naming of `glow::HasContext` but only covers the calls
//! issued by [`crate::render`]. [`GlowGpu`] forwards to a real context; tests
//! run against the software `recording` backend instead.

mod glow_backend;
#[cfg(test)]
pub(crate) mod recording;

pub use glow_backend::GlowGpu;

use std::fmt;

use crate::utils::GpuStateError;

/// Upper bound on queued error flags drained by [`drain_errors`].
const MAX_QUEUED_ERRORS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Vertex => glow::VERTEX_SHADER,
            Self::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveKind {
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Points => glow::POINTS,
            Self::Lines => glow::LINES,
            Self::LineStrip => glow::LINE_STRIP,
            Self::Triangles => glow::TRIANGLES,
            Self::TriangleStrip => glow::TRIANGLE_STRIP,
            Self::TriangleFan => glow::TRIANGLE_FAN,
        }
    }
}

/// GPU calls used by the shader, geometry and frame units.
///
/// Every method assumes the context the implementation wraps is current on
/// the calling thread. Object creation returns the driver message on failure,
/// like `glow` does.
pub trait Gpu {
    type Shader: Copy + fmt::Debug + PartialEq;
    type Program: Copy + fmt::Debug + PartialEq;
    type VertexArray: Copy + fmt::Debug + PartialEq;
    type Buffer: Copy + fmt::Debug + PartialEq;

    fn version_string(&self) -> String;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    fn use_program(&self, program: Option<Self::Program>);
    fn delete_program(&self, program: Self::Program);

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);

    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    fn bind_array_buffer(&self, buffer: Option<Self::Buffer>);
    /// Uploads `data` into the bound array buffer with `STATIC_DRAW` usage.
    fn upload_static(&self, data: &[u8]);
    fn delete_buffer(&self, buffer: Self::Buffer);

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn disable_vertex_attrib_array(&self, index: u32);

    fn draw_arrays(&self, mode: PrimitiveKind, first: i32, count: i32);

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn enable(&self, capability: u32);
    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32);
    fn clear(&self, mask: u32);

    /// Raw `glGetError` code; `glow::NO_ERROR` when clean.
    fn get_error(&self) -> u32;
}

/// Pops every pending error flag and returns the first one.
///
/// GL keeps one flag per error kind, so a single query can leave stale flags
/// behind for the next caller.
pub fn drain_errors<G: Gpu + ?Sized>(gpu: &G) -> Option<GpuStateError> {
    let mut first = None;
    for _ in 0..MAX_QUEUED_ERRORS {
        match GpuStateError::from_code(gpu.get_error()) {
            Some(err) => {
                first.get_or_insert(err);
            }
            None => break,
        }
    }
    first
}

/// Checks the error state after `operation`, logging anything found.
pub fn check_error<G: Gpu + ?Sized>(
    gpu: &G,
    operation: &'static str,
) -> Result<(), GpuStateError> {
    match drain_errors(gpu) {
        Some(err) => {
            log::error!("GL error while {}: {}", operation, err);
            Err(err)
        }
        None => Ok(()),
    }
}
