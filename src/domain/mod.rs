// Domain layer: credential and record models plus the ports the core depends on.

pub mod model;
pub mod ports;
