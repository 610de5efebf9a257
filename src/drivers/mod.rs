// Driver families the launcher knows how to acquire and run.
pub mod chromium;
