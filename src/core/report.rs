//! Report tables.
//!
//! Builds the three fixed report layouts (inventory, catalog, sales) as plain data plus a
//! text renderer. Page layout is left to whoever prints the table.

use crate::{
    entities::{product, sale},
    errors::{Error, Result},
};
use chrono::{Local, NaiveDate};
use std::fmt::Write as _;
use std::str::FromStr;

/// Report layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Stocked products with expiry and status
    Inventory,
    /// Catalog references
    Catalog,
    /// Sales history, newest first
    Sales,
}

impl ReportKind {
    /// Column headers, in order.
    #[must_use]
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Inventory => &["EAN", "Name", "Batch", "Qty", "Expiry", "Status"],
            Self::Catalog => &["EAN", "Name", "Batch", "Section", "Registration"],
            Self::Sales => &["Date", "Seller", "Name", "Batch", "Qty Sold"],
        }
    }

    /// Heading printed above the table.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Inventory => "INVENTORY REPORT",
            Self::Catalog => "PRODUCT CATALOG",
            Self::Sales => "SALES HISTORY",
        }
    }
}

impl FromStr for ReportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "inventory" => Ok(Self::Inventory),
            "catalog" => Ok(Self::Catalog),
            "sales" => Ok(Self::Sales),
            other => Err(Error::Validation {
                field: "report",
                message: format!("unknown report '{other}', expected inventory, catalog or sales"),
            }),
        }
    }
}

/// A report ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    /// Layout used
    pub kind: ReportKind,
    /// Date the report was produced
    pub generated_on: NaiveDate,
    /// One entry per row, aligned with [`ReportKind::columns`]
    pub rows: Vec<Vec<String>>,
}

fn or_placeholder(value: Option<&str>, placeholder: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(placeholder)
        .to_string()
}

fn require_rows(kind: ReportKind, count: usize) -> Result<()> {
    if count == 0 {
        return Err(Error::Validation {
            field: "report",
            message: format!("no data for {}", kind.title().to_lowercase()),
        });
    }
    Ok(())
}

/// Inventory report over an already filtered list.
///
/// # Errors
/// Returns a validation error when `products` is empty.
pub fn inventory_report(products: &[&product::Model], today: NaiveDate) -> Result<ReportTable> {
    require_rows(ReportKind::Inventory, products.len())?;
    let rows = products
        .iter()
        .map(|p| {
            vec![
                or_placeholder(p.ean.as_deref(), "N/A"),
                p.name.clone(),
                p.batch.clone(),
                p.quantity.to_string(),
                p.expiry_date
                    .map_or_else(|| "-".to_string(), |d| d.format("%d/%m/%Y").to_string()),
                p.status.label().to_string(),
            ]
        })
        .collect();
    Ok(ReportTable {
        kind: ReportKind::Inventory,
        generated_on: today,
        rows,
    })
}

/// Catalog report over an already filtered list.
///
/// # Errors
/// Returns a validation error when `products` is empty.
pub fn catalog_report(products: &[&product::Model], today: NaiveDate) -> Result<ReportTable> {
    require_rows(ReportKind::Catalog, products.len())?;
    let rows = products
        .iter()
        .map(|p| {
            vec![
                or_placeholder(p.ean.as_deref(), "N/A"),
                p.name.clone(),
                p.batch.clone(),
                or_placeholder(p.section.as_deref(), "-"),
                or_placeholder(p.registration.as_deref(), "-"),
            ]
        })
        .collect();
    Ok(ReportTable {
        kind: ReportKind::Catalog,
        generated_on: today,
        rows,
    })
}

/// Sales report, sorted newest first whatever the input order.
///
/// # Errors
/// Returns a validation error when `sales` is empty.
pub fn sales_report(sales: &[sale::Model], today: NaiveDate) -> Result<ReportTable> {
    require_rows(ReportKind::Sales, sales.len())?;
    let mut sorted: Vec<&sale::Model> = sales.iter().collect();
    sorted.sort_by(|a, b| b.sale_date.cmp(&a.sale_date));
    let rows = sorted
        .into_iter()
        .map(|s| {
            vec![
                s.sale_date
                    .with_timezone(&Local)
                    .format("%d/%m %H:%M")
                    .to_string(),
                s.seller_id.clone(),
                s.name.clone(),
                s.batch.clone(),
                s.quantity_sold.to_string(),
            ]
        })
        .collect();
    Ok(ReportTable {
        kind: ReportKind::Sales,
        generated_on: today,
        rows,
    })
}

impl ReportTable {
    /// Renders the table as aligned plain text with a heading and a row count.
    #[must_use]
    pub fn render_text(&self) -> String {
        let headers = self.kind.columns();
        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        let _ = writeln!(out, "PEX - {}", self.kind.title());
        let _ = writeln!(out, "Generated on {}", self.generated_on.format("%d/%m/%Y"));
        let _ = writeln!(out, "Total: {}", self.rows.len());
        out.push('\n');

        let header_cells: Vec<String> = headers.iter().map(ToString::to_string).collect();
        push_row(&mut out, &header_cells, &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        let _ = writeln!(out, "{}", rule.join("-+-"));
        for row in &self.rows {
            push_row(&mut out, row, &widths);
        }
        out
    }
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    let _ = writeln!(out, "{}", padded.join(" | ").trim_end());
}

/// Plain-text card for sharing one product (messaging apps, clipboard).
#[must_use]
pub fn format_product_details(product: &product::Model) -> String {
    let expiry = product
        .expiry_date
        .map_or_else(|| "N/A".to_string(), |d| d.format("%d/%m/%Y").to_string());
    [
        format!("PRODUCT: {}", product.name),
        format!("EAN: {}", or_placeholder(product.ean.as_deref(), "N/A")),
        format!("BATCH: {}", product.batch),
        format!("QUANTITY: {}", product.quantity),
        format!("EXPIRY: {expiry}"),
        format!("REGISTRATION: {}", or_placeholder(product.registration.as_deref(), "N/A")),
        format!("SECTION: {}", or_placeholder(product.section.as_deref(), "N/A")),
        format!("TRANSFER: {}", or_placeholder(product.transfer.as_deref(), "N/A")),
        format!("NOTES: {}", or_placeholder(product.notes.as_deref(), "N/A")),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::ExpiryStatus;
    use crate::test_utils::*;
    use chrono::{TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    fn sale_fixture(id: i64, seller: &str, day: u32) -> sale::Model {
        let product = product_fixture(id, "GAZE", ExpiryStatus::Safe);
        sale::Model {
            id,
            product_id: Some(product.id),
            name: product.name,
            batch: product.batch,
            quantity: product.quantity,
            expiry_date: product.expiry_date,
            days_remaining: product.days_remaining,
            status: product.status,
            ean: None,
            registration: None,
            section: None,
            transfer: None,
            notes: None,
            quantity_sold: 1,
            seller_id: seller.to_string(),
            sale_date: Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap(),
            old_id: None,
        }
    }

    #[test]
    fn test_inventory_rows_use_placeholders() {
        let mut expired = product_fixture(1, "AAS", ExpiryStatus::Expired);
        expired.expiry_date = NaiveDate::from_ymd_opt(2024, 4, 3);
        let mut tagged = product_fixture(2, "DIPIRONA", ExpiryStatus::Critical);
        tagged.ean = Some("7891".to_string());

        let table = inventory_report(&[&expired, &tagged], today()).unwrap();
        assert_eq!(table.rows[0][0], "N/A");
        assert_eq!(table.rows[0][4], "03/04/2024");
        assert_eq!(table.rows[0][5], "EXPIRED");
        assert_eq!(table.rows[1][0], "7891");
        assert_eq!(table.rows[1][5], "CRITICAL");
        assert_eq!(table.rows[0].len(), ReportKind::Inventory.columns().len());
    }

    #[test]
    fn test_catalog_rows() {
        let mut entry = product_fixture(1, "BEPANTOL", ExpiryStatus::Safe);
        entry.section = Some("A1".to_string());
        let table = catalog_report(&[&entry], today()).unwrap();
        assert_eq!(table.rows[0][3], "A1");
        assert_eq!(table.rows[0][4], "-");
    }

    #[test]
    fn test_sales_sorted_newest_first() {
        let sales = vec![
            sale_fixture(1, "OLDEST", 1),
            sale_fixture(2, "NEWEST", 9),
            sale_fixture(3, "MIDDLE", 5),
        ];
        let table = sales_report(&sales, today()).unwrap();
        let sellers: Vec<&str> = table.rows.iter().map(|r| r[1].as_str()).collect();
        assert_eq!(sellers, vec!["NEWEST", "MIDDLE", "OLDEST"]);
    }

    #[test]
    fn test_empty_reports_are_refused() {
        assert!(inventory_report(&[], today()).is_err());
        assert!(catalog_report(&[], today()).is_err());
        assert!(sales_report(&[], today()).is_err());
    }

    #[test]
    fn test_render_text_aligns_columns() {
        let mut product = product_fixture(1, "GAZE", ExpiryStatus::Safe);
        product.expiry_date = NaiveDate::from_ymd_opt(2025, 1, 31);
        let text = inventory_report(&[&product], today()).unwrap().render_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "PEX - INVENTORY REPORT");
        assert_eq!(lines[1], "Generated on 10/05/2024");
        assert_eq!(lines[2], "Total: 1");
        assert!(lines[4].starts_with("EAN | Name | Batch"));
        assert!(lines[6].starts_with("N/A | GAZE |"));
        assert!(lines[6].ends_with("| 31/01/2025 | SAFE"));
    }

    #[test]
    fn test_report_kind_parsing() {
        assert_eq!("Sales".parse::<ReportKind>().unwrap(), ReportKind::Sales);
        assert!("monthly".parse::<ReportKind>().is_err());
    }

    #[test]
    fn test_format_product_details() {
        let mut product = product_fixture(1, "GAZE", ExpiryStatus::Safe);
        product.expiry_date = NaiveDate::from_ymd_opt(2025, 1, 31);
        let text = format_product_details(&product);
        assert!(text.starts_with("PRODUCT: GAZE\nEAN: N/A"));
        assert!(text.contains("EXPIRY: 31/01/2025"));
    }
}
