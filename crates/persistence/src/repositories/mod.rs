//! Repository implementations.
//!
//! Repositories own all SQL; callers work with entities and domain models.

pub mod command;
pub mod device;
pub mod owner;

pub use command::CommandRepository;
pub use device::DeviceRepository;
pub use owner::OwnerRepository;
