mod command;
pub mod runner;
