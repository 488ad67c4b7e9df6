//! Database repositories for each table.

pub mod kv;
pub mod records;
pub mod tasks;
pub mod workers;

pub use kv::KvRepo;
pub use records::RecordsRepo;
pub use tasks::TasksRepo;
pub use workers::WorkersRepo;
