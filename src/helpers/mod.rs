pub mod errors;
pub mod handler_404;
