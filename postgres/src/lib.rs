//! `PostgreSQL` attendance ledger for the presence admission pipeline.
//!
//! This crate provides [`PostgresAttendanceLedger`], the production
//! implementation of the capacity-checked transactional store. The
//! count-then-insert admission write runs inside a transaction at
//! SERIALIZABLE isolation, which makes the capacity invariant hold under
//! any interleaving of concurrent writers — with or without the
//! distributed lock in front of it.
//!
//! # Example
//!
//! ```no_run
//! use presence_postgres::PostgresAttendanceLedger;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = PostgresAttendanceLedger::connect("postgresql://localhost/presence").await?;
//! ledger.migrate().await?;
//! # Ok(())
//! # }
//! ```

pub mod ledger;

pub use ledger::PostgresAttendanceLedger;
