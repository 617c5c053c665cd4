pub mod addresses;
pub mod aws;
pub mod orchestration;
pub mod platform_error;

pub use addresses::AddressManager;
pub use orchestration::TaskPlatform;
pub use platform_error::{ErrorKind, PlatformError, PlatformOperation};
