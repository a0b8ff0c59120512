pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod image_ops;
pub mod pipeline;
pub mod review;
pub mod scanner;

pub use pantry_scan_common as common;
