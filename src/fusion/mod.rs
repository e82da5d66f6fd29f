pub mod invocation;
pub mod multi_view;
pub mod view;
