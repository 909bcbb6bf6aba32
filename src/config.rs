mod algorithm;
mod identifier;
mod schedule;

pub use algorithm::{Algorithm, EXACT_PARTITION_LIMIT};
pub use identifier::{width_mask, IdentifierSet, EXT_ID_WIDTH, MAX_ID_WIDTH, STD_ID_WIDTH};
pub use schedule::AnnealingSchedule;
