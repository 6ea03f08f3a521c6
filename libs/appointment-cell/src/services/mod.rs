pub mod booking;
pub mod cancellation;
pub mod lifecycle;
pub mod retention;
