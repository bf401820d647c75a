use serde::{Deserialize, Serialize};

use crate::models::inventory::InventoryItem;

/// reason 字段最大字符数
pub const MAX_REASON_CHARS: usize = 200;

/// 单条搜索结果
///
/// 除 `reason` 外的字段全部来自库存条目，模型输出只能提供 id 和 reason。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub id: u32,
    pub title: String,
    pub location: String,
    pub price: u32,
    pub tags: Vec<String>,
    pub reason: String,
}

impl SearchResult {
    /// 从库存条目构建结果，reason 截断到 200 个字符
    pub fn from_item(item: &InventoryItem, reason: &str) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            location: item.location.clone(),
            price: item.price,
            tags: item.tags.clone(),
            reason: truncate_chars(reason, MAX_REASON_CHARS),
        }
    }
}

/// 按字符（而非字节）截断
pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => input[..idx].to_string(),
        None => input.to_string(),
    }
}
