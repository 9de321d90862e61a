/// Terminal (and optional file) logger setup for the binary and the examples.
pub mod logging;
