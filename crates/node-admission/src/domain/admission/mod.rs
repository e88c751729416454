pub mod controller;

pub use controller::AdmissionController;
pub use controller::AdmissionError;
pub use controller::AdmissionStats;
