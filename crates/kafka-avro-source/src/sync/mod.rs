//! Kafka consumption driven by the `consume` command.

mod consume;

pub use consume::{consume, run_consume, Config, ConsumeOptions, ConsumeStats, StopReason};
