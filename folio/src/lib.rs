pub mod app;
pub mod background;
pub mod commands;
pub mod logging;
pub mod output;
pub mod token_source;

pub use app::App;
