//! Harvest pipeline
//!
//! A single discovery producer feeds a bounded work queue; a pool of
//! extraction workers drains it into the record store. Coordination state
//! (queue, cancellation flag, counters, the store/roster critical section)
//! lives in [`coordinator::PipelineContext`] and is shared by reference, so
//! the pipeline has no global state.

pub mod coordinator;
pub mod producer;
pub mod queue;
pub mod recovery;
pub mod retry;
pub mod worker;

pub use coordinator::{
    run_pipeline, CancelToken, ClientId, ClientRoster, CriticalSection, PipelineContext,
    PipelineCounters, PipelineSummary,
};
pub use producer::DiscoveryProducer;
pub use queue::{QueueEntry, WorkItem, WorkQueue};
pub use recovery::{classify, RecoveryAction};
pub use retry::with_retry;
pub use worker::ExtractionWorker;
