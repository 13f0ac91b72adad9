//! File organization: classify, resolve a collision-free name, move.

mod conflict;
mod move_file;
mod organizer;
mod report;

pub use conflict::resolve_destination;
pub use organizer::Organizer;
pub use report::{FileRecord, Outcome, OrganizeReport};

pub(crate) use move_file::STAGING_PREFIX;
