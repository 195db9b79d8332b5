use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub clear_color: [f32; 4],
    pub depth_test: bool,
    /// Requested OpenGL core version as `[major, minor]`.
    pub gl_version: [u8; 2],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 0.0],
            depth_test: true,
            gl_version: [4, 0],
        }
    }
}
