pub mod headers;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod refresh;
pub mod session;
