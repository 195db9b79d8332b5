pub mod error;

pub use error::{
    AppError, ConfigError, FrameError, GeometryError, GpuStateError, ShaderError,
};
