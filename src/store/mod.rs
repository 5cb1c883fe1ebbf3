// Site stores — the Archive trait and the stores shipped with the crate.
//
// Replication and persistence live behind `traits::Archive`. The rest of the
// crate only ever talks to a store through a `handle::SourceHandle`, which
// adds the per-call timeout.

pub mod handle;
pub mod local;
pub mod memory;
pub mod traits;

pub use handle::SourceHandle;
pub use traits::{Archive, ArchiveOpener, EntryStat};
