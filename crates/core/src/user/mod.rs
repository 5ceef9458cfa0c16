//! Profile persistence port and provisioning

pub mod ports;
pub mod provisioner;
