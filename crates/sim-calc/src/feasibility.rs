//! 物料可行性檢查
//!
//! 對以作業為根的物料網路遞迴檢查：途程（routing）要求全部子作業可行，
//! 替代（alternate）取優先級最高的第一個可行子作業。檢查（probe）在庫存副本上
//! 依序扣帳，同一棵作業樹內共用物料的子作業看得到先前的耗用；執行（commit）
//! 走同一條路徑，檢查可行的數量必定可執行。

use rust_decimal::Decimal;
use sim_core::{BufferTable, Operation, OperationKind, OperationTable, Result, SimError};

/// 作業結構的最大遞迴深度
const MAX_DEPTH: usize = 32;

/// 可行性檢查結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feasibility {
    /// 可執行的數量（介於最小數量與需求數量之間）
    Feasible { quantity: Decimal },
    /// 連最小數量都無法滿足
    Infeasible,
}

impl Feasibility {
    fn from_quantity(quantity: Decimal) -> Self {
        if quantity > Decimal::ZERO {
            Feasibility::Feasible { quantity }
        } else {
            Feasibility::Infeasible
        }
    }

    /// 可執行數量；不可行時為 0
    pub fn quantity(&self) -> Decimal {
        match self {
            Feasibility::Feasible { quantity } => *quantity,
            Feasibility::Infeasible => Decimal::ZERO,
        }
    }

    pub fn is_feasible(&self) -> bool {
        matches!(self, Feasibility::Feasible { .. })
    }
}

/// 物料可行性檢查器
pub struct FeasibilityChecker<'a> {
    operations: &'a OperationTable,
}

impl<'a> FeasibilityChecker<'a> {
    pub fn new(operations: &'a OperationTable) -> Self {
        Self { operations }
    }

    /// 檢查作業最多可執行多少數量（不修改庫存）
    pub fn probe(
        &self,
        buffers: &BufferTable,
        quantity: Decimal,
        min_quantity: Decimal,
        operation: &str,
    ) -> Result<Feasibility> {
        let oper = self.operations.require(operation)?;
        let min_quantity = min_quantity.max(Decimal::ZERO).min(quantity);
        let mut scratch = buffers.clone();
        let available = self.probe_operation(&mut scratch, quantity, min_quantity, oper, 0)?;
        Ok(Feasibility::from_quantity(available))
    }

    /// 執行作業的全部物料流
    ///
    /// 以最小數量等於需求數量檢查一次，全數可行才把檢查時的庫存寫回；
    /// 替代作業因此只會選用可滿足全部數量的子作業。
    pub fn commit(
        &self,
        buffers: &mut BufferTable,
        quantity: Decimal,
        operation: &str,
    ) -> Result<Decimal> {
        let oper = self.operations.require(operation)?;
        let mut scratch = buffers.clone();
        let supported = self.probe_operation(&mut scratch, quantity, quantity, oper, 0)?;
        if supported < quantity {
            return Err(SimError::Infeasible {
                operation: oper.name.clone(),
                quantity,
            });
        }
        *buffers = scratch;
        Ok(quantity)
    }

    /// 單一入口：`commit` 為 false 時只檢查，為 true 時執行
    pub fn check_available(
        &self,
        buffers: &mut BufferTable,
        quantity: Decimal,
        min_quantity: Decimal,
        operation: &str,
        commit: bool,
    ) -> Result<Decimal> {
        if commit {
            self.commit(buffers, quantity, operation)
        } else {
            self.probe(buffers, quantity, min_quantity, operation)
                .map(|f| f.quantity())
        }
    }

    /// 在暫存庫存上檢查並扣帳
    ///
    /// 回傳非零時 `buffers` 已套用該數量的全部物料流，後續檢查看到的是扣除後的庫存；
    /// 回傳零時 `buffers` 不變。下層縮減數量時以縮減後的數量重新檢查整個作業。
    fn probe_operation(
        &self,
        buffers: &mut BufferTable,
        quantity: Decimal,
        min_quantity: Decimal,
        oper: &Operation,
        depth: usize,
    ) -> Result<Decimal> {
        if depth > MAX_DEPTH {
            return Err(SimError::OperationCycle(oper.name.clone()));
        }

        let mut qty = quantity;
        for _ in 0..=MAX_DEPTH {
            if qty <= Decimal::ZERO {
                break;
            }
            let mut scratch = buffers.clone();
            let supported = self.probe_once(&mut scratch, qty, min_quantity, oper, depth)?;
            if supported.is_zero() {
                break;
            }
            if supported >= qty {
                *buffers = scratch;
                return Ok(qty);
            }
            qty = supported;
        }
        Ok(Decimal::ZERO)
    }

    fn probe_once(
        &self,
        buffers: &mut BufferTable,
        quantity: Decimal,
        min_quantity: Decimal,
        oper: &Operation,
        depth: usize,
    ) -> Result<Decimal> {
        let mut qty = Self::probe_materials(buffers, quantity, min_quantity, oper)?;
        if qty.is_zero() {
            return Ok(Decimal::ZERO);
        }
        if let Some(location) = oper.location.as_deref() {
            for flow in &oper.materials {
                buffers.adjust(&flow.item, location, flow.delta(qty))?;
            }
        }

        match &oper.kind {
            OperationKind::Normal => Ok(qty),
            OperationKind::Routing(_) => {
                // 全部子作業都必須可行；子作業縮減的數量傳遞給後續子作業
                for sub in oper.kind.children() {
                    let child = self.operations.require(&sub.operation)?;
                    let sub_qty = self.probe_operation(buffers, qty, min_quantity, child, depth + 1)?;
                    if sub_qty.is_zero() {
                        return Ok(Decimal::ZERO);
                    }
                    qty = sub_qty;
                }
                Ok(qty)
            }
            OperationKind::Alternate(_) => {
                // 第一個可行的替代即被選用
                for sub in oper.kind.children() {
                    let child = self.operations.require(&sub.operation)?;
                    let sub_qty = self.probe_operation(buffers, qty, min_quantity, child, depth + 1)?;
                    if !sub_qty.is_zero() {
                        tracing::trace!("替代作業 {} 選用 {}", oper.name, child.name);
                        return Ok(sub_qty);
                    }
                }
                Ok(Decimal::ZERO)
            }
        }
    }

    /// 檢查作業本身的耗用物料流
    ///
    /// 同一物料的多條物料流合併計算。
    fn probe_materials(
        buffers: &BufferTable,
        quantity: Decimal,
        min_quantity: Decimal,
        oper: &Operation,
    ) -> Result<Decimal> {
        let Some(location) = oper.location.as_deref() else {
            return Ok(quantity);
        };

        // (物料, 每單位耗用, 固定耗用)
        let mut usage: Vec<(&str, Decimal, Decimal)> = Vec::new();
        for flow in oper.materials.iter().filter(|m| m.is_consuming()) {
            let (per_unit, fixed) = if flow.flow_type.is_fixed() {
                (Decimal::ZERO, -flow.quantity)
            } else {
                (-flow.quantity, Decimal::ZERO)
            };
            match usage.iter_mut().find(|(item, _, _)| *item == flow.item) {
                Some(entry) => {
                    entry.1 += per_unit;
                    entry.2 += fixed;
                }
                None => usage.push((flow.item.as_str(), per_unit, fixed)),
            }
        }

        let mut qty = quantity;
        for (item, per_unit, fixed) in usage {
            // 固定耗用與數量無關：不夠就不可行
            let available = buffers.on_hand(item, location)? - fixed;
            if available < Decimal::ZERO {
                return Ok(Decimal::ZERO);
            }
            if per_unit.is_zero() {
                continue;
            }

            let supportable = available / per_unit;
            if supportable >= qty {
                continue;
            }
            if supportable < min_quantity || supportable.is_zero() {
                return Ok(Decimal::ZERO);
            }
            qty = supportable;
        }
        Ok(qty)
    }
}
