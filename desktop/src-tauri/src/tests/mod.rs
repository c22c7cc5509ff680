mod commands;
mod config;
mod health;
mod supervisor;

pub(crate) mod support;
