pub mod action_executor;
pub mod coalescer;
pub mod config;
pub mod fetcher;
pub mod logging;
pub mod model;
pub mod page;
pub mod pipeline;
pub mod projector;
pub mod runtime;

// Lets the shared perf tests name the crate by its public path.
#[cfg(test)]
extern crate self as nugetfind_core;
