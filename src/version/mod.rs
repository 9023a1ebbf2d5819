pub mod gate;
pub mod semver;
pub mod source;

pub use self::gate::{GatePolicy, GateState, UpdateCheck, UpdateGate};
pub use self::semver::{is_version_critically_outdated, is_version_newer, Version};
pub use self::source::{HttpVersionSource, VersionSource};
