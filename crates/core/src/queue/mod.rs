//! Delay queue port

pub mod ports;
