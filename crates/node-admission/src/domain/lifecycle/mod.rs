pub mod observer;
pub mod state;

pub use observer::EventOutcome;
pub use observer::LifecycleObserver;
pub use observer::WorkloadEvent;
pub use state::LifecycleError;
pub use state::WorkloadId;
pub use state::WorkloadRecord;
