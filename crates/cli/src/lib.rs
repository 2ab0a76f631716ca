//! Command line front end for the session driver.

pub mod cli;
pub mod commands;
pub mod context;
pub mod logging;
