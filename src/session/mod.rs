pub mod check;
pub mod drill;
pub mod phonetic;
pub mod stats;
pub mod timer;

pub use drill::{CheckOutcome, DrillState, ListeningDrill};
pub use phonetic::{PhoneticDrill, PhoneticOutcome};
pub use stats::{AttemptRecord, Stats};
