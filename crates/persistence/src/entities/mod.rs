//! Database entity definitions.
//!
//! Entities are direct mappings to database rows; conversion into domain
//! models happens at the repository boundary.

pub mod command;
pub mod device;
pub mod owner;

pub use command::CommandEntity;
pub use device::DeviceEntity;
pub use owner::OwnerEntity;
