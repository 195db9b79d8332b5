pub mod core;
pub mod rendering;
pub mod window;

pub use self::core::{load_or_create_config, load_or_create_config_at, AppConfig};
pub use rendering::RenderConfig;
pub use window::{DisplayMode, WindowConfig};
