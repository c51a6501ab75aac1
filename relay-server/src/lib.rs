//! 消息中继服务端核心
//!
//! 包含:
//! - 单连接处理 (handler)
//! - 别名注册表 (registry)
//! - 消息路由 (router)
//! - accept 循环与生命周期 (server)

pub mod handler;
pub mod registry;
pub mod router;
pub mod server;

pub use server::RelayServer;
