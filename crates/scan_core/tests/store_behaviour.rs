use std::sync::Once;

use pretty_assertions::assert_eq;
use scan_core::{
    ItemDescriptor, ItemResult, ItemStatus, JobHandle, JobId, JobStateStore, JobStatus,
    MarketAnalysis, PriceMetrics,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(scan_logging::initialize_for_tests);
}

fn items() -> Vec<ItemDescriptor> {
    vec![
        ItemDescriptor::new("veh-1", "Honda", "Civic").with_year(2019),
        ItemDescriptor::new("veh-2", "Toyota", "Camry").with_year(2021),
        ItemDescriptor::new("veh-3", "Ford", "Ranger").with_year(2018),
    ]
}

fn seeded(job: &str) -> JobStateStore {
    let mut store = JobStateStore::new();
    store.seed(JobHandle {
        job_id: JobId::new(job),
        items: items(),
    });
    store
}

fn analysis(avg: f64) -> MarketAnalysis {
    MarketAnalysis {
        metrics: PriceMetrics {
            min: avg - 2000.0,
            avg,
            max: avg + 2000.0,
            comparable_count: 12,
            currency: "USD".to_string(),
            source: "marketcheck".to_string(),
            retrieved_at: Some("2024-05-01T10:00:00Z".to_string()),
        },
        comparables: Vec::new(),
    }
}

#[test]
fn seed_starts_pending_with_no_results() {
    init_logging();
    let store = seeded("job-a");

    assert_eq!(store.job_id(), Some(&JobId::new("job-a")));
    assert_eq!(store.status(), Some(JobStatus::Pending));
    assert_eq!(store.items(), items().as_slice());
    assert_eq!(store.results().count(), 0);
    let summary = store.summary();
    assert_eq!(summary.pending, 3);
    assert_eq!(summary.processed, 0);
}

#[test]
fn seed_clears_previous_job() {
    init_logging();
    let mut store = seeded("job-a");
    store.apply_item_result(ItemResult::no_data(JobId::new("job-a"), "veh-1"));

    store.seed(JobHandle {
        job_id: JobId::new("job-b"),
        items: items()[..1].to_vec(),
    });

    assert_eq!(store.job_id(), Some(&JobId::new("job-b")));
    assert!(store.result("veh-1").is_none());
    assert_eq!(store.summary().total, 1);
}

#[test]
fn applying_the_same_result_twice_is_idempotent() {
    init_logging();
    let mut store = seeded("job-a");
    let result = ItemResult::success(JobId::new("job-a"), "veh-1", analysis(24000.0));

    assert!(store.apply_item_result(result.clone()));
    let once = store.clone();
    assert!(!store.apply_item_result(result));

    assert_eq!(store, once);
}

#[test]
fn later_item_result_wins() {
    init_logging();
    let mut store = seeded("job-a");
    let job = JobId::new("job-a");

    store.apply_item_result(ItemResult::processing(job.clone(), "veh-2"));
    store.apply_item_result(ItemResult::error(job.clone(), "veh-2", "upstream timeout"));

    let result = store.result("veh-2").unwrap();
    assert_eq!(result.status, ItemStatus::Error);
    assert_eq!(result.error_detail.as_deref(), Some("upstream timeout"));
}

#[test]
fn payload_is_dropped_from_non_success_results() {
    init_logging();
    let mut store = seeded("job-a");
    let mut result = ItemResult::no_data(JobId::new("job-a"), "veh-3");
    result.analysis = Some(analysis(10000.0));
    result.error_detail = Some("stale".to_string());

    store.apply_item_result(result);

    let stored = store.result("veh-3").unwrap();
    assert!(stored.analysis.is_none());
    assert!(stored.error_detail.is_none());
}

#[test]
fn results_for_other_jobs_or_unknown_items_are_ignored() {
    init_logging();
    let mut store = seeded("job-a");

    assert!(!store.apply_item_result(ItemResult::no_data(JobId::new("job-b"), "veh-1")));
    assert!(!store.apply_item_result(ItemResult::no_data(JobId::new("job-a"), "veh-9")));
    assert!(!store.apply_job_update(&JobId::new("job-b"), JobStatus::Failed, None));

    assert_eq!(store.results().count(), 0);
    assert_eq!(store.status(), Some(JobStatus::Pending));
}

#[test]
fn terminal_status_never_changes() {
    init_logging();
    let job = JobId::new("job-a");

    for terminal in [
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::PartiallyFailed,
    ] {
        let mut store = seeded("job-a");
        assert!(store.apply_job_update(&job, JobStatus::Processing, None));
        assert!(store.apply_job_update(&job, terminal, None));

        for next in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::PartiallyFailed,
        ] {
            store.apply_job_update(&job, next, Some("late".to_string()));
            assert_eq!(store.status(), Some(terminal));
        }
    }
}

#[test]
fn stale_pending_after_processing_is_ignored() {
    init_logging();
    let mut store = seeded("job-a");
    let job = JobId::new("job-a");

    assert!(store.apply_job_update(&job, JobStatus::Processing, None));
    assert!(!store.apply_job_update(&job, JobStatus::Pending, None));
    assert_eq!(store.status(), Some(JobStatus::Processing));
}

#[test]
fn job_can_fail_straight_from_pending() {
    init_logging();
    let mut store = seeded("job-a");
    let job = JobId::new("job-a");

    assert!(store.apply_job_update(&job, JobStatus::Failed, Some("quota exceeded".to_string())));
    assert_eq!(store.status(), Some(JobStatus::Failed));
    assert_eq!(store.error_message(), Some("quota exceeded"));
}

#[test]
fn disconnect_is_recorded_only_before_terminal_status() {
    init_logging();
    let mut store = seeded("job-a");
    let job = JobId::new("job-a");

    assert!(store.record_disconnect("socket closed"));
    assert!(store.error_message().unwrap().contains("socket closed"));

    store.apply_job_update(&job, JobStatus::Completed, None);
    assert_eq!(store.error_message(), None);
    assert!(!store.record_disconnect("socket closed again"));
    assert_eq!(store.error_message(), None);
}

#[test]
fn reset_clears_everything() {
    init_logging();
    let mut store = seeded("job-a");
    store.apply_item_result(ItemResult::no_data(JobId::new("job-a"), "veh-1"));

    store.reset();

    assert!(!store.has_job());
    assert_eq!(store.status(), None);
    assert_eq!(store.items().len(), 0);
    assert!(store.consume_dirty());
    assert!(!store.consume_dirty());
}

#[test]
fn summary_counts_items_by_status() {
    init_logging();
    let mut store = seeded("job-a");
    let job = JobId::new("job-a");
    store.apply_item_result(ItemResult::success(job.clone(), "veh-1", analysis(24000.0)));
    store.apply_item_result(ItemResult::processing(job.clone(), "veh-2"));

    let summary = store.summary();
    assert_eq!(summary.success, 1);
    assert_eq!(summary.processing, 1);
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.processed, 1);
    assert!((summary.completion() - 1.0 / 3.0).abs() < f64::EPSILON);
}
