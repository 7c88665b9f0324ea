pub mod batch;
pub mod common;
pub mod pay;
pub mod select;
