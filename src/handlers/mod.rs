//! HTTP 处理器模块

pub mod account;
pub mod admin;
pub mod auth;
pub mod health;
