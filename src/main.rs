mod window;

use std::process;

use winit::event_loop::{ControlFlow, EventLoop};

use fogfx::error::RunError;
use fogfx::DemoConfig;

fn run() -> Result<(), RunError> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("loading preset {path}");
            DemoConfig::load(path)?
        }
        None => DemoConfig::default(),
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = window::App::new(config)?;
    event_loop.run_app(&mut app)?;
    match app.take_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run() {
        log::error!("{err}");
        process::exit(1);
    }
}
