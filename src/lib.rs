//! unitnav library exports

pub mod api;
pub mod core;
pub mod navigator;

#[cfg(test)]
pub mod test_support;
