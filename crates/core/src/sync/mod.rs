//! Local score/achievement cache, retry queue and the manager reconciling
//! them with the remote service.

mod cache;
mod connectivity;
mod manager;
mod models;
mod ports;
mod retry_queue;
mod scheduler;

pub use cache::*;
pub use connectivity::*;
pub use manager::*;
pub use models::*;
pub use ports::*;
pub use retry_queue::*;
pub use scheduler::*;
