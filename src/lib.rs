pub mod cli;
pub mod commands;
pub mod scan;
pub mod utils;
pub mod writers;
