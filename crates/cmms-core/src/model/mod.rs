// ── Domain model ──
//
// Identity and attribute access shared by every controller and screen.

mod key;
mod record;

pub use key::PrimaryKey;
pub use record::{Entity, Record, lookup_path};
