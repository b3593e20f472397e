use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 默认计量单位
pub const DEFAULT_UNIT: &str = "PCS";

/// 新增明细时的默认税率 (%)
pub fn default_gst_percent() -> BigDecimal {
    BigDecimal::from(18)
}

/// 采购单据明细行 (只保存输入, 金额由计算器派生)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub item_code: Option<String>,
    #[serde(default)]
    pub item_name: String,
    pub quantity: BigDecimal,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub unit_rate: BigDecimal,
    #[serde(default = "BigDecimal::zero")]
    pub discount_percent: BigDecimal,
    #[serde(default = "default_gst_percent")]
    pub gst_percent: BigDecimal,
    #[serde(default)]
    pub hsn_code: String,
    /// 规格字段 -> 值
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

impl Default for LineItem {
    fn default() -> Self {
        Self {
            item_code: None,
            item_name: String::new(),
            quantity: BigDecimal::from(1),
            unit: default_unit(),
            unit_rate: BigDecimal::zero(),
            discount_percent: BigDecimal::zero(),
            gst_percent: default_gst_percent(),
            hsn_code: String::new(),
            specifications: BTreeMap::new(),
        }
    }
}

impl LineItem {
    pub fn new(item_name: impl Into<String>, quantity: BigDecimal, unit_rate: BigDecimal) -> Self {
        Self {
            item_name: item_name.into(),
            quantity,
            unit_rate,
            ..Self::default()
        }
    }

    pub fn with_discount(mut self, discount_percent: BigDecimal) -> Self {
        self.discount_percent = discount_percent;
        self
    }

    pub fn with_gst(mut self, gst_percent: BigDecimal) -> Self {
        self.gst_percent = gst_percent;
        self
    }

    /// 选择物料后带出名称、HSN、税率、单位
    pub fn apply_item_master(&mut self, item: &ItemMaster) {
        self.item_code = Some(item.item_code.clone());
        self.item_name = item.item_name.clone();
        self.hsn_code = item.hsn_code.clone().unwrap_or_default();
        self.gst_percent = item.gst_rate.clone().unwrap_or_else(default_gst_percent);
        self.unit = item.uom.clone().unwrap_or_else(default_unit);
    }
}

/// 影响金额的输入字段, 任一变化都要重新计算
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineInputs {
    pub quantity: Option<BigDecimal>,
    pub unit_rate: Option<BigDecimal>,
    pub discount_percent: Option<BigDecimal>,
    pub gst_percent: Option<BigDecimal>,
}

impl LineInputs {
    pub fn apply_to(self, item: &mut LineItem) {
        if let Some(q) = self.quantity {
            item.quantity = q;
        }
        if let Some(r) = self.unit_rate {
            item.unit_rate = r;
        }
        if let Some(d) = self.discount_percent {
            item.discount_percent = d;
        }
        if let Some(g) = self.gst_percent {
            item.gst_percent = g;
        }
    }
}

/// 计算后的明细行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedLine {
    #[serde(flatten)]
    pub item: LineItem,
    pub line_amount: BigDecimal,
    pub discount_amount: BigDecimal,
    pub taxable_amount: BigDecimal,
    pub gst_amount: BigDecimal,
    pub net_amount: BigDecimal,
}

/// 单据汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub subtotal: BigDecimal,
    pub total_discount: BigDecimal,
    pub total_taxable: BigDecimal,
    pub total_gst: BigDecimal,
    /// 四舍五入到整数
    pub grand_total: BigDecimal,
}

impl Default for DocumentSummary {
    fn default() -> Self {
        Self {
            subtotal: BigDecimal::zero(),
            total_discount: BigDecimal::zero(),
            total_taxable: BigDecimal::zero(),
            total_gst: BigDecimal::zero(),
            grand_total: BigDecimal::zero(),
        }
    }
}

/// 物料主数据 (选择物料时使用的字段)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMaster {
    pub item_code: String,
    pub item_name: String,
    pub hsn_code: Option<String>,
    pub gst_rate: Option<BigDecimal>,
    pub uom: Option<String>,
}
