pub mod attendance;
pub mod documents;
pub mod employee;
pub mod holiday;
pub mod leave_request;

#[cfg(test)]
pub(crate) mod test_support;
