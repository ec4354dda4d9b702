//! WaterSmart CLI
//!
//! Fetch water usage from a WaterSmart portal and query the local history.

mod cli;


fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
