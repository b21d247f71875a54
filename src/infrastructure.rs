pub mod http;
pub mod upload;
pub mod utils;
