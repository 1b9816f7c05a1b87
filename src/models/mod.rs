pub mod cafe;
pub mod favourite;
pub mod review;
