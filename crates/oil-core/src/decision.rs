//! 每月產品使用決策矩陣

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{OilError, Result, O_NUM};

/// 使用決策矩陣 `D[m][o]`：產品 o 在月份 m 是否被使用
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionGrid {
    rows: Vec<[bool; O_NUM]>,
}

impl DecisionGrid {
    /// 以逐月的列創建決策矩陣
    pub fn new(rows: Vec<[bool; O_NUM]>) -> Self {
        Self { rows }
    }

    /// 全部啟用的決策矩陣
    pub fn all_active(months: usize) -> Self {
        Self::new(vec![[true; O_NUM]; months])
    }

    /// 全部停用的決策矩陣
    pub fn all_inactive(months: usize) -> Self {
        Self::new(vec![[false; O_NUM]; months])
    }

    /// 將扁平基因序列（按月份優先）重組為 M × O 矩陣
    ///
    /// 非零基因視為啟用。
    pub fn from_genes(genes: &[u8]) -> Result<Self> {
        if genes.is_empty() || genes.len() % O_NUM != 0 {
            return Err(OilError::InvalidDecisionGrid(format!(
                "基因長度 {} 不是 {} 的正整數倍",
                genes.len(),
                O_NUM
            )));
        }

        let rows = genes
            .chunks_exact(O_NUM)
            .map(|chunk| {
                let mut row = [false; O_NUM];
                for (cell, gene) in row.iter_mut().zip(chunk) {
                    *cell = *gene != 0;
                }
                row
            })
            .collect();

        Ok(Self { rows })
    }

    /// 轉回扁平基因序列
    pub fn to_genes(&self) -> Vec<u8> {
        self.rows
            .iter()
            .flat_map(|row| row.iter().map(|&active| u8::from(active)))
            .collect()
    }

    /// 月數
    pub fn months(&self) -> usize {
        self.rows.len()
    }

    /// 各月份的使用決策列
    pub fn rows(&self) -> &[[bool; O_NUM]] {
        &self.rows
    }

    /// 可修改的決策列（結構修復使用）
    pub fn rows_mut(&mut self) -> &mut [[bool; O_NUM]] {
        &mut self.rows
    }

    /// 產品 o 在月份 m 是否啟用（越界視為未啟用）
    pub fn is_active(&self, month: usize, product: usize) -> bool {
        self.rows
            .get(month)
            .and_then(|row| row.get(product))
            .copied()
            .unwrap_or(false)
    }

    /// 設置單一決策
    pub fn set(&mut self, month: usize, product: usize, active: bool) {
        if let Some(cell) = self.rows.get_mut(month).and_then(|row| row.get_mut(product)) {
            *cell = active;
        }
    }

    /// 某月的啟用產品數
    pub fn active_count(&self, month: usize) -> usize {
        self.rows
            .get(month)
            .map(|row| row.iter().filter(|&&active| active).count())
            .unwrap_or(0)
    }

    /// 檢查月數是否與情境一致
    pub fn ensure_months(&self, months: usize) -> Result<()> {
        if self.rows.len() != months {
            return Err(OilError::InvalidDecisionGrid(format!(
                "決策矩陣有 {} 個月，情境為 {} 個月",
                self.rows.len(),
                months
            )));
        }
        Ok(())
    }
}

impl fmt::Display for DecisionGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (m, row) in self.rows.iter().enumerate() {
            if m > 0 {
                write!(f, " ")?;
            }
            let bits: Vec<&str> = row.iter().map(|&a| if a { "1" } else { "0" }).collect();
            write!(f, "[{}]", bits.join(" "))?;
        }
        write!(f, "]")
    }
}
