use bigdecimal::{BigDecimal, Zero};

use crate::error::ValidationError;
use crate::models::{CalculatedLine, DocumentSummary, LineItem};

fn percent_of(amount: &BigDecimal, percent: &BigDecimal) -> BigDecimal {
    (amount * percent) / BigDecimal::from(100)
}

/// 计算单行金额 (纯函数, 不做校验也不截断)
pub fn calculate_line(item: &LineItem) -> CalculatedLine {
    let line_amount = &item.quantity * &item.unit_rate;
    let discount_amount = percent_of(&line_amount, &item.discount_percent);
    let taxable_amount = &line_amount - &discount_amount;
    let gst_amount = percent_of(&taxable_amount, &item.gst_percent);
    let net_amount = &taxable_amount + &gst_amount;

    CalculatedLine {
        item: item.clone(),
        line_amount,
        discount_amount,
        taxable_amount,
        gst_amount,
        net_amount,
    }
}

pub fn calculate_lines<'a, I>(items: I) -> Vec<CalculatedLine>
where
    I: IntoIterator<Item = &'a LineItem>,
{
    items.into_iter().map(calculate_line).collect()
}

/// 汇总单据, 每次都从全部明细重新计算
pub fn summarize(lines: &[CalculatedLine]) -> DocumentSummary {
    let mut subtotal = BigDecimal::zero();
    let mut total_discount = BigDecimal::zero();
    let mut total_taxable = BigDecimal::zero();
    let mut total_gst = BigDecimal::zero();

    for line in lines {
        subtotal += &line.line_amount;
        total_discount += &line.discount_amount;
        total_taxable += &line.taxable_amount;
        total_gst += &line.gst_amount;
    }

    // round() 为四舍五入 (half-up)
    let grand_total = (&total_taxable + &total_gst).round(0);

    DocumentSummary {
        subtotal,
        total_discount,
        total_taxable,
        total_gst,
        grand_total,
    }
}

/// 提交前校验, 编辑过程中不调用
pub fn validate_document(items: &[LineItem]) -> Result<(), ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::EmptyDocument);
    }

    let hundred = BigDecimal::from(100);
    for (idx, item) in items.iter().enumerate() {
        let line = idx + 1;
        if item.item_name.trim().is_empty() {
            return Err(ValidationError::MissingName { line });
        }
        if item.quantity <= BigDecimal::zero() {
            return Err(ValidationError::NonPositiveQuantity { line });
        }
        if item.unit_rate < BigDecimal::zero() {
            return Err(ValidationError::NegativeRate { line });
        }
        if item.discount_percent < BigDecimal::zero() || item.discount_percent > hundred {
            return Err(ValidationError::DiscountOutOfRange { line });
        }
        if item.gst_percent < BigDecimal::zero() {
            return Err(ValidationError::NegativeGst { line });
        }
    }

    Ok(())
}
