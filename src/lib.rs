pub mod api;
pub mod calibration;
pub mod classes;
pub mod config;
pub mod detection;
pub mod error;
pub mod navigation;
pub mod pipeline;
pub mod source;
pub mod state;
