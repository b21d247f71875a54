pub mod feedback;
pub mod repositories;
