pub mod app;
pub mod asset;
pub mod config;
pub mod demo;
pub mod engine;
pub mod input;
pub mod render;
pub mod scene;
pub mod settings;

use app::App;
use settings::EngineSettings;
use winit::event_loop::EventLoop;

fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

pub fn run() -> Result<(), winit::error::EventLoopError> {
    init_logging();

    let settings = EngineSettings::load();
    log::info!(
        "Starting voidstrike ({}x{}, swap interval {})",
        settings.resolution.width,
        settings.resolution.height,
        settings.swap_interval
    );

    let event_loop = EventLoop::new()?;
    let mut app = App::new(settings);

    let result = event_loop.run_app(&mut app);
    if let Err(ref err) = result {
        log::error!("Application error: {}", err);
    }

    log::info!("Shutdown complete");
    result
}
