//! 终端交互
pub mod debug_cli;
