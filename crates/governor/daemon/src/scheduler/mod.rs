//! Background scheduling for the governor's time-driven work

mod sweeper;

pub use sweeper::Sweeper;
