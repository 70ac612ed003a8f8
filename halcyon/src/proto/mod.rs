pub mod call;
pub mod h2;
pub mod tls;
