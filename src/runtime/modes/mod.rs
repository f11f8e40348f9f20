//! Mode routing
//!
//! - 无子命令：HTTP 服务
//! - 有子命令：CLI（见 `interfaces::cli`）

pub mod server;

pub use server::run_server;
