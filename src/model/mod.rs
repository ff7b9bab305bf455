pub mod attendance;
pub mod employee;
pub mod holiday;
pub mod leave_request;
pub mod remote_activity;
pub mod role;
pub mod user;
