use log::{error, info};
use square_engine::app::App;
use square_engine::core::logging;

fn main() {
    logging::init();
    info!("Starting square engine");

    if let Err(e) = App::run() {
        error!("{e}");
        std::process::exit(1);
    }
}
