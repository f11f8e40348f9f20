//! System-level modules
//!
//! - 进程内事件总线（通知、聊天推送）
//! - 日志初始化
//! - panic 处理

pub mod event;
pub mod logging;
pub mod panic_handler;
