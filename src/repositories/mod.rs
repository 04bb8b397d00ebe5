//! Repositorios
//!
//! El contrato `DispatchStore` y sus dos implementaciones.

pub mod dispatch_store;
pub mod memory_store;
pub mod pg_store;

pub use dispatch_store::{DispatchStore, ExpirySweep, MatchAcceptance, RideTransition};
pub use memory_store::MemoryDispatchStore;
pub use pg_store::PgDispatchStore;
