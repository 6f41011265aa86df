//! Foundation layer: math, time, collections, and logging utilities

pub mod collections;
pub mod logging;
pub mod math;
pub mod time;
