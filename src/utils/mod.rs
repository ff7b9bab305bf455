pub mod employee_cache;
pub mod time_format;
