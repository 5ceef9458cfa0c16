//! Identity service capability consumed by the reconciler

pub mod ports;
