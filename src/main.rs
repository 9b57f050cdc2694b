use std::env;
use std::error::Error;

use ds4_lightbar::drivers::dualshock4::driver::{PID, VID};
use ds4_lightbar::input::manager::Manager;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let log_level = match env::var("LOG_LEVEL") {
        Ok(value) => value,
        Err(_) => "info".to_string(),
    };
    env::set_var("RUST_LOG", log_level);
    env_logger::init();
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    log::info!("Starting ds4-lightbar v{}", VERSION);

    // PS4 DualShock
    let mut manager = Manager::new(VID, PID)?;

    // Setup CTRL+C handler. It only asks the manager to stop; devices are
    // released by the manager once its loop has exited.
    let client = manager.client();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Unable to listen for CTRL+C: {e}");
            return;
        }
        log::info!("Shutting down");
        if let Err(e) = client.stop().await {
            log::error!("Unable to stop the manager: {e}");
        }
    });

    if let Err(e) = manager.run().await {
        log::error!("Error running the device manager: {e}");
        return Err(Box::new(e) as Box<dyn Error + Send + Sync>);
    }

    log::info!("ds4-lightbar stopped");

    Ok(())
}
