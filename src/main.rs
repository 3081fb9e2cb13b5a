#[allow(non_snake_case)]
pub mod Examples;
#[allow(non_snake_case)]
pub mod Kinetics;
#[allow(non_snake_case)]
pub mod NetworkIVP;
#[allow(non_snake_case)]
pub mod Utils;

use Examples::network_examples::network_examples;
use Utils::logging::init_logger;
use log::LevelFilter;

pub fn main() {
    //
    init_logger(LevelFilter::Info, None).unwrap();
    let task: usize = 1;
    network_examples(task);
}
