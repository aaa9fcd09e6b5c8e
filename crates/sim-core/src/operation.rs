//! 作業與物料流模型

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Result, SimError};

/// 物料流時點
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    /// 作業開始時，按訂單數量比例
    #[default]
    Start,
    /// 作業結束時，按訂單數量比例
    End,
    /// 作業開始時，固定數量
    FixedStart,
    /// 作業結束時，固定數量
    FixedEnd,
}

impl FlowType {
    /// 是否在作業開始時發生
    pub fn at_start(self) -> bool {
        matches!(self, FlowType::Start | FlowType::FixedStart)
    }

    /// 是否在作業結束時發生
    pub fn at_end(self) -> bool {
        !self.at_start()
    }

    /// 是否為固定數量（不隨訂單數量縮放）
    pub fn is_fixed(self) -> bool {
        matches!(self, FlowType::FixedStart | FlowType::FixedEnd)
    }
}

/// 作業物料流
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationMaterial {
    /// 物料ID
    pub item: String,

    /// 帶正負號的數量係數（負數為耗用，正數為產出）
    pub quantity: Decimal,

    /// 物料流時點
    #[serde(default, rename = "type")]
    pub flow_type: FlowType,
}

impl OperationMaterial {
    pub fn new(item: impl Into<String>, quantity: Decimal, flow_type: FlowType) -> Self {
        Self {
            item: item.into(),
            quantity,
            flow_type,
        }
    }

    /// 是否為耗用
    pub fn is_consuming(&self) -> bool {
        self.quantity < Decimal::ZERO
    }

    /// 對庫存的變動量
    pub fn delta(&self, order_quantity: Decimal) -> Decimal {
        if self.flow_type.is_fixed() {
            self.quantity
        } else {
            self.quantity * order_quantity
        }
    }
}

/// 子作業引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubOperation {
    /// 子作業名稱
    pub operation: String,

    /// 優先級（數字越小越優先）
    #[serde(default)]
    pub priority: i32,
}

impl SubOperation {
    pub fn new(operation: impl Into<String>, priority: i32) -> Self {
        Self {
            operation: operation.into(),
            priority,
        }
    }
}

/// 作業類型
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "suboperations", rename_all = "snake_case")]
pub enum OperationKind {
    /// 單一作業
    #[default]
    Normal,
    /// 途程：依序執行全部子作業
    Routing(Vec<SubOperation>),
    /// 替代：按優先級擇一子作業
    Alternate(Vec<SubOperation>),
}

impl OperationKind {
    /// 依優先級排序的子作業
    pub fn children(&self) -> Vec<&SubOperation> {
        let mut children: Vec<&SubOperation> = match self {
            OperationKind::Normal => Vec::new(),
            OperationKind::Routing(subs) | OperationKind::Alternate(subs) => subs.iter().collect(),
        };
        // 穩定排序：同優先級保留宣告順序
        children.sort_by_key(|s| s.priority);
        children
    }
}

/// 作業
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// 作業名稱
    pub name: String,

    /// 作業地點（物料流的庫存點地點）
    #[serde(default)]
    pub location: Option<String>,

    /// 作業類型
    #[serde(default)]
    pub kind: OperationKind,

    /// 物料流（依宣告順序）
    #[serde(default)]
    pub materials: Vec<OperationMaterial>,
}

impl Operation {
    /// 創建單一作業
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: Some(location.into()),
            kind: OperationKind::Normal,
            materials: Vec::new(),
        }
    }

    /// 創建途程作業
    pub fn routing(name: impl Into<String>, steps: Vec<SubOperation>) -> Self {
        Self {
            name: name.into(),
            location: None,
            kind: OperationKind::Routing(steps),
            materials: Vec::new(),
        }
    }

    /// 創建替代作業
    pub fn alternate(name: impl Into<String>, alternates: Vec<SubOperation>) -> Self {
        Self {
            name: name.into(),
            location: None,
            kind: OperationKind::Alternate(alternates),
            materials: Vec::new(),
        }
    }

    /// 建構器模式：設置地點
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// 建構器模式：添加物料流
    pub fn with_material(mut self, material: OperationMaterial) -> Self {
        self.materials.push(material);
        self
    }

    /// 開始時點的物料流
    pub fn start_materials(&self) -> impl Iterator<Item = &OperationMaterial> {
        self.materials.iter().filter(|m| m.flow_type.at_start())
    }

    /// 結束時點的物料流
    pub fn end_materials(&self) -> impl Iterator<Item = &OperationMaterial> {
        self.materials.iter().filter(|m| m.flow_type.at_end())
    }
}

/// 作業表（以名稱為鍵）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationTable(BTreeMap<String, Operation>);

impl OperationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, operation: Operation) {
        self.0.insert(operation.name.clone(), operation);
    }

    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.0.get(name)
    }

    /// 查找作業，找不到時回傳錯誤
    pub fn require(&self, name: &str) -> Result<&Operation> {
        self.0
            .get(name)
            .ok_or_else(|| SimError::OperationNotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Operation> for OperationTable {
    fn from_iter<T: IntoIterator<Item = Operation>>(iter: T) -> Self {
        let mut table = OperationTable::new();
        for operation in iter {
            table.insert(operation);
        }
        table
    }
}
