pub mod association;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod model;
pub mod output;
pub mod parser;
pub mod pipeline;
