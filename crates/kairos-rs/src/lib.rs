//! Core of the kairos-rs API gateway: route table, target pools, circuit
//! breakers, session affinity, and the request dispatcher.
//!
//! The binary crate (`kairos-gateway`) wires these pieces into an
//! `actix-web` server; this crate contains everything that can be
//! exercised without a listening socket.

pub mod clock;
pub mod cluster;
pub mod config;
pub mod logs;
pub mod middleware;
pub mod models;
pub mod pool;
pub mod routes;
pub mod services;
pub mod utils;
