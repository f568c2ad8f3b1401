pub mod iwd_agent;
pub mod iwd_interface;
pub mod iwd_proxy;

pub use iwd_agent::{IwdAgent, PendingPassphrase};
pub use iwd_interface::IwdInterface;
