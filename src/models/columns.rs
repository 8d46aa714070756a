/// Column-name constants for every pipeline layer.

// ── Bronze columns (as delivered by ingestion) ──────────────────────────────
pub mod bronze {
    pub const DATE: &str = "FECHA";
    pub const TICKET_NUMBER: &str = "NUMERO_TICKET";
    pub const TICKET_LINE_COUNT: &str = "CANTIDAD_TICKET";
    pub const BRANCH_ID: &str = "ID_SUCURSAL";
    pub const BRANCH_NAME: &str = "DESCRIP_SUCURSAL";
    pub const ZONE_ID: &str = "ID_ZONA_SUPERVISION";
    pub const ZONE_NAME: &str = "DESC_ZONA_SUPERVICION";
    pub const PRODUCT_ID: &str = "ID_ARTICULO";
    pub const PRODUCT_NAME: &str = "DESC_ARTICULO";
    pub const FAMILY_ID: &str = "FAMILIA";
    pub const FAMILY_NAME: &str = "DESC_FAMILIA";
    pub const DEPARTMENT_ID: &str = "DEPARTAMENTO";
    pub const DEPARTMENT_NAME: &str = "DESC_DEPARTAMENTO";
    pub const CATEGORY_ID: &str = "RUBRO";
    pub const CATEGORY_NAME: &str = "DESC_RUBRO";
    pub const SUBCATEGORY_ID: &str = "SUBRUBRO";
    pub const SUBCATEGORY_NAME: &str = "DESC_SUBRUBRO";
    pub const QUANTITY: &str = "CANTIDAD_VENDIDA";
    pub const UNIT_VALUE: &str = "VALOR_ARTICULO";
    pub const GROSS_SALE: &str = "VENTA_BRUTA";
    pub const INTERNAL_TAX: &str = "MONTO_IMPUESTOS_INTERNOS";
    pub const VAT: &str = "MONTO_IVA";
    pub const UNIT_COST: &str = "COSTO_ARTICULO";

    pub const REQUIRED: [&str; 23] = [
        DATE,
        TICKET_NUMBER,
        TICKET_LINE_COUNT,
        BRANCH_ID,
        BRANCH_NAME,
        ZONE_ID,
        ZONE_NAME,
        PRODUCT_ID,
        PRODUCT_NAME,
        FAMILY_ID,
        FAMILY_NAME,
        DEPARTMENT_ID,
        DEPARTMENT_NAME,
        CATEGORY_ID,
        CATEGORY_NAME,
        SUBCATEGORY_ID,
        SUBCATEGORY_NAME,
        QUANTITY,
        UNIT_VALUE,
        GROSS_SALE,
        INTERNAL_TAX,
        VAT,
        UNIT_COST,
    ];
}

// ── Partition columns ───────────────────────────────────────────────────────
pub mod partition {
    pub const BRANCH: &str = "branch";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";

    pub const ALL: [&str; 3] = [BRANCH, YEAR, MONTH];
}

// ── Silver (enriched line) columns ──────────────────────────────────────────
pub mod silver {
    pub const REVENUE_LOCAL: &str = "revenue_local";
    pub const COST_LOCAL: &str = "cost_local";
    pub const MARGIN_LOCAL: &str = "margin_local";
    pub const EXCHANGE_RATE: &str = "exchange_rate";
    pub const REVENUE_REF: &str = "revenue_ref";
    pub const COST_REF: &str = "cost_ref";
    pub const MARGIN_REF: &str = "margin_ref";
    pub const DAY_OF_MONTH: &str = "day_of_month";
    pub const WEEKDAY: &str = "weekday";

    pub const DERIVED: [&str; 9] = [
        REVENUE_LOCAL,
        COST_LOCAL,
        MARGIN_LOCAL,
        EXCHANGE_RATE,
        REVENUE_REF,
        COST_REF,
        MARGIN_REF,
        DAY_OF_MONTH,
        WEEKDAY,
    ];
}

// ── Gold (aggregated) columns ───────────────────────────────────────────────
pub mod gold {
    pub const MARGIN_RATIO_LOCAL: &str = "margin_ratio_local";
    pub const MARGIN_RATIO_REF: &str = "margin_ratio_ref";
    pub const TOP_MARGIN_PRODUCT: &str = "top_margin_product";
    pub const TOP_SALES_DAY_OF_MONTH: &str = "top_sales_day_of_month";
    pub const TOP_SALES_WEEKDAY: &str = "top_sales_weekday";
    pub const OBJECTIVE_COMPLIANCE: &str = "objective_compliance";
    pub const WEEKLY_CORRELATION: &str = "weekly_correlation";
    pub const FOLLOWS_WEEKLY_TREND: &str = "follows_weekly_trend";
    pub const MONTHLY_CORRELATION: &str = "monthly_correlation";
    pub const FOLLOWS_MONTHLY_TREND: &str = "follows_monthly_trend";

    /// Columns broadcast from the partition summary onto every product row.
    pub const PARTITION_DERIVED: [&str; 7] = [
        TOP_MARGIN_PRODUCT,
        TOP_SALES_DAY_OF_MONTH,
        TOP_SALES_WEEKDAY,
        WEEKLY_CORRELATION,
        FOLLOWS_WEEKLY_TREND,
        MONTHLY_CORRELATION,
        FOLLOWS_MONTHLY_TREND,
    ];
}

// ── Exchange-rate reference table ───────────────────────────────────────────
pub mod rates {
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const DEFAULT_RATE: &str = "exchange_rate";
}
