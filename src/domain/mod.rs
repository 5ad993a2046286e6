pub mod profile;
pub mod record;
pub mod target;

pub use profile::{Profile, ProfileEntry};
pub use record::{AvailabilityRecord, UNKNOWN_PRODUCT};
pub use target::TargetRef;
