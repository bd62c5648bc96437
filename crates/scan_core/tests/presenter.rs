use scan_core::presenter::{
    format_currency, format_mileage, format_number, item_badge, job_badge, progress_label,
    result_row, status_counts, BadgeTone,
};
use scan_core::{
    ItemDescriptor, ItemResult, ItemStatus, JobId, JobStatus, MarketAnalysis, PriceMetrics,
    ScanSummary,
};

#[test]
fn numbers_get_thousands_separators() {
    assert_eq!(format_number(0.0), "0");
    assert_eq!(format_number(999.0), "999");
    assert_eq!(format_number(1000.0), "1,000");
    assert_eq!(format_number(24000.4), "24,000");
    assert_eq!(format_number(1234567.6), "1,234,568");
    assert_eq!(format_number(-4500.0), "-4,500");
    assert_eq!(format_number(f64::NAN), "-");
}

#[test]
fn currency_uses_symbol_or_code() {
    assert_eq!(format_currency(24000.0, "USD"), "$24,000");
    assert_eq!(format_currency(31000.0, ""), "$31,000");
    assert_eq!(format_currency(15500.0, "eur"), "€15,500");
    assert_eq!(format_currency(42000.0, "CAD"), "CAD 42,000");
    assert_eq!(format_currency(-250.0, "USD"), "-$250");
}

#[test]
fn mileage_and_progress_labels() {
    assert_eq!(format_mileage(45210), "45,210 mi");
    let summary = ScanSummary {
        success: 2,
        total: 3,
        processed: 2,
        pending: 1,
        ..ScanSummary::default()
    };
    assert_eq!(progress_label(&summary), "2/3");
}

#[test]
fn badges_cover_every_status() {
    assert_eq!(job_badge(JobStatus::Completed).tone, BadgeTone::Success);
    assert_eq!(job_badge(JobStatus::PartiallyFailed).tone, BadgeTone::Warning);
    assert_eq!(job_badge(JobStatus::Failed).tone, BadgeTone::Danger);
    assert_eq!(job_badge(JobStatus::Processing).label, "Analyzing");
    assert_eq!(item_badge(ItemStatus::NoDataFound).label, "No comparables");
    assert_eq!(item_badge(ItemStatus::Error).tone, BadgeTone::Danger);
}

#[test]
fn status_counts_skip_zero_entries() {
    let summary = ScanSummary {
        success: 2,
        no_data_found: 1,
        total: 3,
        processed: 3,
        ..ScanSummary::default()
    };
    let counts = status_counts(&summary);
    assert_eq!(counts.len(), 2);
    assert_eq!(counts[0], (item_badge(ItemStatus::Success), 2));
    assert_eq!(counts[1], (item_badge(ItemStatus::NoDataFound), 1));
}

#[test]
fn result_row_formats_priced_item() {
    let item = ItemDescriptor::new("veh-1", "Honda", "Civic")
        .with_year(2019)
        .with_mileage(42000)
        .with_trim("EX");
    let result = ItemResult::success(
        JobId::new("job-a"),
        "veh-1",
        MarketAnalysis {
            metrics: PriceMetrics {
                min: 21000.0,
                avg: 24000.0,
                max: 27500.0,
                comparable_count: 14,
                currency: "USD".to_string(),
                source: "marketcheck".to_string(),
                retrieved_at: None,
            },
            comparables: Vec::new(),
        },
    );

    let row = result_row(&item, Some(&result));

    assert_eq!(row.title, "2019 Honda Civic EX");
    assert_eq!(row.mileage.as_deref(), Some("42,000 mi"));
    assert_eq!(row.avg_price.as_deref(), Some("$24,000"));
    assert_eq!(row.price_range.as_deref(), Some("$21,000 - $27,500"));
    assert_eq!(row.comparable_count, Some(14));
    assert_eq!(row.badge, item_badge(ItemStatus::Success));
}

#[test]
fn result_row_without_result_is_waiting() {
    let item = ItemDescriptor::new("veh-2", "", "");
    let row = result_row(&item, None);

    assert_eq!(row.title, "veh-2");
    assert_eq!(row.badge, item_badge(ItemStatus::Pending));
    assert!(row.avg_price.is_none());
}
