//! 搜索 DTO
//!
//! 定义搜索相关的请求和响应数据结构。

use serde::{Deserialize, Serialize};

use crate::models::search_result::SearchResult;

/// 搜索请求
///
/// `query` 的类型由处理器校验，这里只用于文档和客户端。
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    /// 搜索查询
    pub query: String,
}

/// 搜索响应
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    /// 结果列表
    pub results: Vec<SearchResult>,
}
