pub mod checksum;
pub mod comparator;
pub mod engine;
pub mod path;
pub mod scanner;
pub mod transfer;

pub use checksum::{ChecksumResolver, HashAlgorithm, ResolvedDigests};
pub use comparator::{DiffReport, DifferentFile, FileComparator, IdenticalFile};
pub use engine::{LargestFile, SyncConfig, SyncEngine, SyncReport};
pub use scanner::{EntryMap, EntrySource, FileEntry, FileScanner};
pub use transfer::{DeleteSummary, PullRequest, PushRequest, TransferManager};
