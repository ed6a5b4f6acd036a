//! Database entities.

pub mod api_key;
pub mod instance;
pub mod instance_data;

pub use api_key::Entity as ApiKey;
pub use instance::{Entity as Instance, PlatformFamily};
pub use instance_data::Entity as InstanceData;
