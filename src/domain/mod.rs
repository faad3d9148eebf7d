// Domain layer: backend records and the ports the client talks through.

pub mod model;
pub mod ports;
