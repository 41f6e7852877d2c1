pub mod collector;
pub mod cpu;
pub mod error;
pub mod host;
pub mod loadavg;
pub mod memory;
pub mod platform;
pub mod process;
pub mod retry;
pub mod snapshot;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;
