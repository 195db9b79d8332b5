pub mod frame;
pub mod geometry;
pub mod shaders;

pub use frame::{DriverEvent, FrameDriver, FrameState, LoopControl, Presenter, Viewport};
pub use geometry::{ColoredVertex, GeometryBuffer, VertexLayout};
pub use shaders::ShaderProgram;
