use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::gpu::ShaderStage;

/// Decoded result of a `glGetError` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GpuStateError {
    #[error("invalid enum")]
    InvalidEnum,

    #[error("invalid value")]
    InvalidValue,

    #[error("invalid operation")]
    InvalidOperation,

    #[error("invalid framebuffer operation")]
    InvalidFramebufferOperation,

    #[error("out of memory")]
    OutOfMemory,

    #[error("stack overflow")]
    StackOverflow,

    #[error("stack underflow")]
    StackUnderflow,

    #[error("unknown GL error 0x{0:04X}")]
    Unknown(u32),
}

impl GpuStateError {
    /// Maps a raw error code, `None` for `GL_NO_ERROR`.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            glow::NO_ERROR => None,
            glow::INVALID_ENUM => Some(Self::InvalidEnum),
            glow::INVALID_VALUE => Some(Self::InvalidValue),
            glow::INVALID_OPERATION => Some(Self::InvalidOperation),
            glow::INVALID_FRAMEBUFFER_OPERATION => Some(Self::InvalidFramebufferOperation),
            glow::OUT_OF_MEMORY => Some(Self::OutOfMemory),
            glow::STACK_OVERFLOW => Some(Self::StackOverflow),
            glow::STACK_UNDERFLOW => Some(Self::StackUnderflow),
            other => Some(Self::Unknown(other)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("{stage} shader compilation failed: {log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("Program linking failed: {log}")]
    Link { log: String },

    #[error("Could not create GPU object: {0}")]
    Create(String),

    #[error("GPU error while {operation}: {source}")]
    Gpu {
        operation: &'static str,
        source: GpuStateError,
    },
}

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("Geometry needs at least one vertex")]
    Empty,

    #[error("Expected {expected} {attribute} entries, got {actual}")]
    AttributeCount {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Draw range of {requested} vertices exceeds the {available} uploaded")]
    DrawRange { requested: usize, available: usize },

    #[error("Could not create GPU object: {0}")]
    Create(String),

    #[error("GPU error while {operation}: {source}")]
    Gpu {
        operation: &'static str,
        source: GpuStateError,
    },
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Viewport size {width}x{height} is not positive")]
    InvalidViewport { width: i32, height: i32 },

    #[error("Cannot {operation} while the driver is {state}")]
    WrongState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Failed to present frame: {0}")]
    Present(String),

    #[error("GL error while {operation}: {source}")]
    Gpu {
        operation: &'static str,
        source: GpuStateError,
    },

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Couldn't determine project directory")]
    NoProjectDir,

    #[error("IO error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize default config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Fatal startup failures surfaced by the application shell.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Initialization failed: {0}")]
    Init(String),

    #[error("Window creation failed: {0}")]
    WindowCreation(String),

    #[error("Event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

pub type Result<T> = std::result::Result<T, AppError>;
