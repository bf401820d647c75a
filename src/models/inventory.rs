use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 目的地条目
///
/// 库存是只读的，运行期间不会被修改。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryItem {
    /// 唯一标识
    pub id: u32,
    /// 标题
    pub title: String,
    /// 地点
    pub location: String,
    /// 预估人均费用（美元）
    pub price: u32,
    /// 匹配用的小写标签
    pub tags: Vec<String>,
}

impl InventoryItem {
    pub fn new(id: u32, title: &str, location: &str, price: u32, tags: &[&str]) -> Self {
        Self {
            id,
            title: title.to_string(),
            location: location.to_string(),
            price,
            tags: tags.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// 用于提示词的精简视图（不含价格）
    pub fn projection(&self) -> InventoryProjection {
        InventoryProjection {
            id: self.id,
            title: self.title.clone(),
            location: self.location.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// 提示词中使用的库存投影
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryProjection {
    pub id: u32,
    pub title: String,
    pub location: String,
    pub tags: Vec<String>,
}

/// 库存构建错误
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum InventoryError {
    #[error("duplicate inventory id: {0}")]
    DuplicateId(u32),

    #[error("inventory id must be positive")]
    ZeroId,
}

/// 不可变的目的地库存
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    items: Vec<InventoryItem>,
}

impl Inventory {
    /// 创建库存，id 必须唯一且为正数
    pub fn new(items: Vec<InventoryItem>) -> Result<Self, InventoryError> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if item.id == 0 {
                return Err(InventoryError::ZeroId);
            }
            if !seen.insert(item.id) {
                return Err(InventoryError::DuplicateId(item.id));
            }
        }
        Ok(Self { items })
    }

    /// 内置的五个目的地
    pub fn sample() -> Self {
        Self {
            items: vec![
                InventoryItem::new(
                    1,
                    "High-Altitude Tea Trails",
                    "Nuwara Eliya",
                    120,
                    &["cold", "nature", "hiking"],
                ),
                InventoryItem::new(
                    2,
                    "Coastal Heritage Wander",
                    "Galle Fort",
                    45,
                    &["history", "culture", "walking"],
                ),
                InventoryItem::new(
                    3,
                    "Wild Safari Expedition",
                    "Yala",
                    250,
                    &["animals", "adventure", "photography"],
                ),
                InventoryItem::new(
                    4,
                    "Surf & Chill Retreat",
                    "Arugam Bay",
                    80,
                    &["beach", "surfing", "young-vibe"],
                ),
                InventoryItem::new(
                    5,
                    "Ancient City Exploration",
                    "Sigiriya",
                    110,
                    &["history", "climbing", "view"],
                ),
            ],
        }
    }

    pub fn get(&self, id: u32) -> Option<&InventoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 全部条目的精简视图，保持库存顺序
    pub fn projection(&self) -> Vec<InventoryProjection> {
        self.items.iter().map(InventoryItem::projection).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_inventory_ids_are_unique() {
        let inventory = Inventory::sample();
        assert_eq!(inventory.len(), 5);
        assert!(Inventory::new(inventory.items().to_vec()).is_ok());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let item = InventoryItem::new(7, "A", "B", 1, &["x"]);
        let result = Inventory::new(vec![item.clone(), item]);
        assert_eq!(result, Err(InventoryError::DuplicateId(7)));
    }

    #[test]
    fn test_zero_id_rejected() {
        let item = InventoryItem::new(0, "A", "B", 1, &[]);
        assert_eq!(Inventory::new(vec![item]), Err(InventoryError::ZeroId));
    }

    #[test]
    fn test_projection_omits_price() {
        let inventory = Inventory::sample();
        let json = serde_json::to_value(inventory.projection()).unwrap();
        let first = &json[0];
        assert_eq!(first["id"], 1);
        assert_eq!(first["title"], "High-Altitude Tea Trails");
        assert!(first.get("price").is_none());
    }

    #[test]
    fn test_get_by_id() {
        let inventory = Inventory::sample();
        assert_eq!(inventory.get(4).unwrap().location, "Arugam Bay");
        assert!(inventory.get(99).is_none());
    }
}
