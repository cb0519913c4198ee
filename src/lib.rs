#![allow(non_snake_case)]

pub mod cli;
pub mod clients;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod runtime;
pub mod service;
