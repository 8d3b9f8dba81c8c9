// The engine lives in the library so benchmarks and integration tests can
// drive it; main.rs only parses arguments and runs the line-oriented loop.

rust_i18n::i18n!("locales", fallback = "en");

pub mod app;
pub mod assets;
pub mod audio;
pub mod config;
pub mod error;
pub mod event;
pub mod offline;
pub mod presets;
pub mod romanize;
pub mod session;
pub mod store;
