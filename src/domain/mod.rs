// Domain layer: core models and ports (interfaces). No I/O beyond the port signatures.

pub mod model;
pub mod ports;
