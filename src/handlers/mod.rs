pub mod facade;
pub mod routes;
