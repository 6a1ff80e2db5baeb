pub mod app;
pub mod logging;
pub mod scenario_file;
