pub mod http_repo;
pub mod image;
pub mod maquete;
