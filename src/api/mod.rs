pub mod employee;
pub mod leave;
