use std::process::ExitCode;

use animated_objects::{
    config::{Args, ViewerConfig},
    winit::App,
};
use clap::Parser;
use log::error;

fn main() -> ExitCode {
    env_logger::init();
    #[cfg(feature = "panics-log")]
    log_panics::init();

    let config = ViewerConfig::from(Args::parse());
    match App::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Failed to run the application: {}", err);
            ExitCode::FAILURE
        }
    }
}
