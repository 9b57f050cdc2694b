pub mod constants;
pub mod drivers;
pub mod input;
pub mod watcher;
