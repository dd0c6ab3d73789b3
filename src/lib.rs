//! mattori-home library.
//!
//! A small home service: streams masked atmosphere readings to any number of
//! clients and owns the status of one air conditioner, both exposed over the
//! `mattori_home.Home` gRPC service.

pub mod ac;
pub mod atmosphere;
pub mod config;
pub mod error;
pub mod instance_lock;
pub mod rpc;
