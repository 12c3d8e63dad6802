//! Classification pipeline
//!
//! ```text
//! SightingSource --ingest--> SightingStore
//!                                 |
//!   Scheduler tick: sweep -> snapshot -> group -> evaluate -> EventSink
//! ```

pub mod cycle;
pub mod ingest;
pub mod scheduler;
pub mod sink;
pub mod source;

pub use cycle::{run_cycle, CycleError, CycleOutcome, CycleReport};
pub use ingest::{run_ingest, IngestEnd, IngestStats};
pub use scheduler::{
    system_clock, ClassificationScheduler, Clock, SchedulerError, StatsSnapshot, TrackingState,
};
pub use sink::{ChannelSink, EventSink, FanoutSink, JsonLinesSink, LogSink, RecordingSink};
pub use source::{ReplaySource, SightingEvent, SightingSource, StdinSource};
