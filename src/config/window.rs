use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "Spinning Gophers";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Windowed,
    Fullscreen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub color_bits: u8,
    pub depth_bits: u8,
    pub display_mode: DisplayMode,
    pub resizable: bool,
    /// Display refreshes to wait between presents; 0 disables vsync.
    pub swap_interval: u32,
    pub debug_context: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            width: 640,
            height: 480,
            color_bits: 24,
            depth_bits: 16,
            display_mode: DisplayMode::Windowed,
            resizable: false,
            swap_interval: 1,
            debug_context: true,
        }
    }
}
