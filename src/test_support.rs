//! Fixtures shared by unit tests.

use crate::models::columns::bronze;
use crate::models::{ExchangeRateTable, PartitionKey, with_partition_columns};
use crate::processor::{CurrencyNormalizer, Deduplicator, TemporalEnricher};
use chrono::NaiveDate;
use polars::prelude::*;

#[derive(Debug, Clone)]
pub(crate) struct SaleLine {
    pub date: NaiveDate,
    pub ticket: i64,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_value: f64,
    pub unit_cost: f64,
}

impl SaleLine {
    pub fn new(
        date: &str,
        ticket: i64,
        product_id: &str,
        quantity: i64,
        unit_value: f64,
        unit_cost: f64,
    ) -> Self {
        Self {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            ticket,
            product_id: product_id.to_string(),
            product_name: format!("Producto {}", product_id),
            quantity,
            unit_value,
            unit_cost,
        }
    }
}

/// A frame with every bronze column, one row per line.
pub(crate) fn bronze_frame(lines: &[SaleLine]) -> DataFrame {
    let n = lines.len();
    let text = |value: &str| vec![value.to_string(); n];

    df!(
        bronze::DATE => lines.iter().map(|l| l.date).collect::<Vec<_>>(),
        bronze::TICKET_NUMBER => lines.iter().map(|l| l.ticket).collect::<Vec<_>>(),
        bronze::TICKET_LINE_COUNT => vec![1i64; n],
        bronze::BRANCH_ID => vec![10i64; n],
        bronze::BRANCH_NAME => text("SUCURSAL CENTRO"),
        bronze::ZONE_ID => vec![1i64; n],
        bronze::ZONE_NAME => text("ZONA 1"),
        bronze::PRODUCT_ID => lines.iter().map(|l| l.product_id.clone()).collect::<Vec<_>>(),
        bronze::PRODUCT_NAME => lines.iter().map(|l| l.product_name.clone()).collect::<Vec<_>>(),
        bronze::FAMILY_ID => vec![1i64; n],
        bronze::FAMILY_NAME => text("ALMACEN"),
        bronze::DEPARTMENT_ID => vec![2i64; n],
        bronze::DEPARTMENT_NAME => text("SECOS"),
        bronze::CATEGORY_ID => vec![3i64; n],
        bronze::CATEGORY_NAME => text("GALLETITAS"),
        bronze::SUBCATEGORY_ID => vec![4i64; n],
        bronze::SUBCATEGORY_NAME => text("DULCES"),
        bronze::QUANTITY => lines.iter().map(|l| l.quantity).collect::<Vec<_>>(),
        bronze::UNIT_VALUE => lines.iter().map(|l| l.unit_value).collect::<Vec<_>>(),
        bronze::GROSS_SALE => lines.iter().map(|l| l.unit_value * l.quantity as f64).collect::<Vec<_>>(),
        bronze::INTERNAL_TAX => vec![0.0f64; n],
        bronze::VAT => vec![0.0f64; n],
        bronze::UNIT_COST => lines.iter().map(|l| l.unit_cost).collect::<Vec<_>>(),
    )
    .unwrap()
}

pub(crate) fn with_partition(df: DataFrame, key: &PartitionKey) -> DataFrame {
    with_partition_columns(df, key).unwrap()
}

/// Bronze lines run through normalization, enrichment and cleaning at a fixed rate.
pub(crate) fn enriched_frame(key: &PartitionKey, lines: &[SaleLine], rate: f64) -> DataFrame {
    let rates = ExchangeRateTable::from_entries([(key.year, key.month, rate)]).unwrap();
    let batch = CurrencyNormalizer::new(&rates)
        .normalize(with_partition(bronze_frame(lines), key))
        .unwrap();
    let mut frame = batch.frame;
    TemporalEnricher.enrich(&mut frame).unwrap();
    Deduplicator.apply(&frame).unwrap().frame
}

pub(crate) fn f64_column(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

pub(crate) fn str_column(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(str::to_owned))
        .collect()
}
