pub mod tracker;

pub use tracker::AllocationError;
pub use tracker::AllocationTracker;
pub use tracker::Reservation;
