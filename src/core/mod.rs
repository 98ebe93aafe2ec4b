// Shared helpers

pub mod math;
