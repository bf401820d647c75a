//! Travel Search - AI 驱动的旅行目的地搜索服务
//!
//! 将自然语言查询交给大模型在固定库存中匹配，校验模型输出后返回结果；
//! 模型配额耗尽时降级为本地关键词匹配。

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod security;
pub mod services;
