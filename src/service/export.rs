use std::io::Write;

use crate::models::{CalculatedLine, DocumentSummary};

const HEADER: [&str; 12] = [
    "line_no",
    "item_code",
    "item_name",
    "quantity",
    "unit",
    "unit_rate",
    "discount_percent",
    "gst_percent",
    "hsn_code",
    "taxable_amount",
    "gst_amount",
    "net_amount",
];

/// 导出计算后的明细到 CSV, 末行为汇总
pub fn write_lines_csv<W: Write>(
    lines: &[CalculatedLine],
    summary: &DocumentSummary,
    out: W,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(HEADER)?;

    for (idx, line) in lines.iter().enumerate() {
        let item = &line.item;
        writer.write_record(&[
            (idx + 1).to_string(),
            item.item_code.clone().unwrap_or_default(),
            item.item_name.clone(),
            item.quantity.to_string(),
            item.unit.clone(),
            item.unit_rate.to_string(),
            item.discount_percent.to_string(),
            item.gst_percent.to_string(),
            item.hsn_code.clone(),
            line.taxable_amount.to_string(),
            line.gst_amount.to_string(),
            line.net_amount.to_string(),
        ])?;
    }

    writer.write_record(&[
        String::new(),
        String::new(),
        "TOTAL".to_string(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        summary.total_taxable.to_string(),
        summary.total_gst.to_string(),
        summary.grand_total.to_string(),
    ])?;

    writer.flush()?;
    Ok(())
}
