pub mod catalog;
pub mod form;
pub mod gallery;
pub mod staging;
