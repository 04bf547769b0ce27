//! The evidence accumulation clustering (EAC) engine.
//! Runs the base partitioner many times over granularities and cluster
//! counts, reconciles every run onto the host level, and fuses the votes
//! into one consensus partition plus a ranked outlier score per host.
pub mod containers;
pub mod consensus;
pub mod core;
pub mod driver;
pub mod linkage;
pub mod reconcile;
