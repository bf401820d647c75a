//! 核心数据模型模块
//!
//! 定义旅行库存 InventoryItem 与搜索结果 SearchResult。

pub mod inventory;
pub mod search_result;

pub use inventory::*;
pub use search_result::*;
