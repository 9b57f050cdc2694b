pub mod animation;
pub mod manager;
pub mod registry;
pub mod session;
pub mod source;
pub mod timer;
pub mod transport;

#[cfg(test)]
mod mock;
#[cfg(test)]
mod session_test;
