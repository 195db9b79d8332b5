use anyhow::{Context, Result};
use log::info;
use simple_logger::SimpleLogger;

use spinning_gophers::{app, config};

fn main() -> Result<()> {
    let config = config::load_or_create_config().context("Failed to load configuration")?;

    SimpleLogger::new()
        .with_level(config.level_filter())
        .init()
        .context("Failed to install logger")?;
    info!("Starting {}", config.window.title);

    app::run(&config).context("Renderer failed")?;

    info!("Window closed, exiting");
    Ok(())
}
