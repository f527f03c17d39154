//! `SeaORM` entities for `SqliteStore`.

pub mod scan_run;
pub mod subdomain;
pub mod target;
