// Domain layer: canonical records and the ports carriers, transports and
// configuration plug into.

pub mod model;
pub mod ports;
