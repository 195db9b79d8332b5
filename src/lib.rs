pub mod app;
pub mod config;
pub mod gpu;
pub mod render;
pub mod utils;
pub mod window;

// Re-export commonly used types
pub use config::{AppConfig, RenderConfig, WindowConfig};
pub use gpu::{Gpu, GlowGpu, PrimitiveKind, ShaderStage};
pub use render::{FrameDriver, FrameState, GeometryBuffer, ShaderProgram};
pub use utils::error::{AppError, FrameError, GeometryError, GpuStateError, ShaderError};
pub use window::GlWindow;
