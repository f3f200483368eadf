pub mod accrual;
pub mod service;

pub use service::{AppService, LeaveService, LeaveValidation, StatusChange, SubmitOutcome};
