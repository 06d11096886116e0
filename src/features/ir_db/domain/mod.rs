pub mod irdb;

pub use irdb::Irdb;
