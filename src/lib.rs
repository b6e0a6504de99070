pub mod chart;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod detector;
pub mod pipeline;
pub mod producer;
pub mod report;
pub mod sample;
pub mod util;
