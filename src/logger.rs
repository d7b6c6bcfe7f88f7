//! Logging setup for the command-line driver.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the binary. Output is compact `LEVEL message` lines without timestamps.

use tracing_subscriber::{
  Layer, Registry, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Map a `-v` count onto a level: warn, info, debug, then trace.
pub fn level_for_verbosity(verbose: u8) -> LevelFilter {
  match verbose {
    0 => LevelFilter::WARN,
    1 => LevelFilter::INFO,
    2 => LevelFilter::DEBUG,
    _ => LevelFilter::TRACE,
  }
}

pub fn init(verbose: u8) {
  let layer = tracing_subscriber::fmt::layer()
    .without_time()
    .with_target(false)
    .with_level(true)
    .with_writer(std::io::stderr)
    .compact()
    .with_filter(level_for_verbosity(verbose));

  Registry::default().with(layer).init();
}
