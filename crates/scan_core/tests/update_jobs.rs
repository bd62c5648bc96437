use std::sync::Once;

use scan_core::{
    update, BatchJob, Effect, ItemDescriptor, ItemResult, JobHandle, JobId, JobStatus,
    MarketAnalysis, Msg, NoticeLevel, OwnerId, PanelState, PriceMetrics, ScanSummary,
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

fn priced(job: &JobId, item: &str, avg: f64) -> ItemResult {
    ItemResult::success(
        job.clone(),
        item,
        MarketAnalysis {
            metrics: PriceMetrics {
                min: avg * 0.9,
                avg,
                max: avg * 1.1,
                comparable_count: 8,
                currency: "USD".to_string(),
                source: "marketcheck".to_string(),
                retrieved_at: None,
            },
            comparables: Vec::new(),
        },
    )
}

fn submit_and_accept(state: PanelState, job: &str) -> (PanelState, Vec<Effect>) {
    let (state, _) = update(state, Msg::SubmitRequested(items()));
    update(
        state,
        Msg::SubmitAccepted(JobHandle {
            job_id: JobId::new(job),
            items: items(),
        }),
    )
}

fn job_update(job: &JobId, status: JobStatus) -> Msg {
    Msg::JobUpdate {
        job_id: job.clone(),
        status,
        error_message: None,
    }
}

#[test]
fn submit_request_emits_submit_effect_and_gates_duplicates() {
    init_logging();
    let (state, effects) = update(PanelState::new(), Msg::SubmitRequested(items()));

    assert!(state.is_submitting());
    assert_eq!(effects, vec![Effect::SubmitBatch { items: items() }]);

    let (state, effects) = update(state, Msg::SubmitRequested(items()));
    assert!(state.is_submitting());
    assert!(effects.is_empty());
}

#[test]
fn empty_submission_is_rejected_locally() {
    init_logging();
    let (state, effects) = update(PanelState::new(), Msg::SubmitRequested(Vec::new()));

    assert!(effects.is_empty());
    assert!(!state.is_submitting());
    assert!(!state.live().has_job());
    assert_eq!(state.notice().unwrap().level, NoticeLevel::Error);
}

#[test]
fn failed_submission_leaves_no_local_job() {
    init_logging();
    let (state, _) = update(PanelState::new(), Msg::SubmitRequested(items()));
    let (state, effects) = update(
        state,
        Msg::SubmitFailed {
            message: "analysis service unavailable".to_string(),
        },
    );

    assert!(effects.is_empty());
    assert!(!state.is_submitting());
    assert!(!state.live().has_job());
    assert_eq!(
        state.notice().unwrap().text,
        "analysis service unavailable".to_string()
    );
}

#[test]
fn accepted_submission_tears_down_then_subscribes() {
    init_logging();
    let (state, effects) = submit_and_accept(PanelState::new(), "job-a");
    let job = JobId::new("job-a");

    assert_eq!(
        effects,
        vec![
            Effect::Unsubscribe,
            Effect::Subscribe { job_id: job.clone() },
            Effect::StorePointer { job_id: job.clone() },
        ]
    );
    assert!(!state.is_submitting());
    assert_eq!(state.live().job_id(), Some(&job));
    assert_eq!(state.live().status(), Some(JobStatus::Pending));
}

#[test]
fn new_submission_replaces_previous_live_job() {
    init_logging();
    let (state, _) = submit_and_accept(PanelState::new(), "job-a");
    let (state, _) = update(state, Msg::ItemUpdate(priced(&JobId::new("job-a"), "veh-1", 1.0)));
    let (state, effects) = submit_and_accept(state, "job-b");

    assert_eq!(effects[0], Effect::Unsubscribe);
    assert_eq!(state.live().job_id(), Some(&JobId::new("job-b")));
    assert!(state.live().result("veh-1").is_none());

    // Late result for the old job bleeds into nothing.
    let (state, _) = update(state, Msg::ItemUpdate(priced(&JobId::new("job-a"), "veh-2", 2.0)));
    assert!(state.live().result("veh-2").is_none());
}

#[test]
fn three_item_scan_ends_partially_failed() {
    init_logging();
    let job = JobId::new("job-a");
    let (state, _) = submit_and_accept(PanelState::new(), "job-a");
    let (state, _) = update(state, Msg::SubscriptionOpened { job_id: job.clone() });
    let (state, _) = update(state, job_update(&job, JobStatus::Processing));
    let (state, _) = update(state, Msg::ItemUpdate(priced(&job, "veh-1", 24000.0)));
    let (state, _) = update(state, Msg::ItemUpdate(priced(&job, "veh-2", 31000.0)));
    let (state, _) = update(state, Msg::ItemUpdate(ItemResult::no_data(job.clone(), "veh-3")));
    let (state, _) = update(state, job_update(&job, JobStatus::PartiallyFailed));

    assert_eq!(state.live().status(), Some(JobStatus::PartiallyFailed));
    assert_eq!(
        state.live().summary(),
        ScanSummary {
            success: 2,
            no_data_found: 1,
            total: 3,
            processed: 3,
            ..ScanSummary::default()
        }
    );
    let avg = state
        .live()
        .result("veh-2")
        .and_then(|r| r.analysis.as_ref())
        .map(|a| a.metrics.avg);
    assert_eq!(avg, Some(31000.0));
}

#[test]
fn dropped_subscription_warns_and_allows_reconnect() {
    init_logging();
    let job = JobId::new("job-a");
    let (state, _) = submit_and_accept(PanelState::new(), "job-a");
    let (state, _) = update(state, Msg::SubscriptionOpened { job_id: job.clone() });
    assert!(!state.view().can_reconnect);

    let (state, effects) = update(
        state,
        Msg::SubscriptionDropped {
            job_id: job.clone(),
            reason: "channel closed".to_string(),
        },
    );
    assert!(effects.is_empty());
    assert!(state.view().can_reconnect);
    assert!(state.live().error_message().unwrap().contains("channel closed"));

    let (state, effects) = update(state, Msg::ReconnectClicked);
    assert_eq!(effects, vec![Effect::Subscribe { job_id: job.clone() }]);

    let (state, _) = update(state, Msg::SubscriptionOpened { job_id: job });
    let (_, effects) = update(state, Msg::ReconnectClicked);
    assert!(effects.is_empty());
}

#[test]
fn dismiss_unsubscribes_and_clears_pointer() {
    init_logging();
    let (state, _) = submit_and_accept(PanelState::new(), "job-a");
    let (state, effects) = update(state, Msg::DismissClicked);

    assert_eq!(effects, vec![Effect::Unsubscribe, Effect::ClearPointer]);
    assert!(!state.live().has_job());
    assert!(state.view().job.is_none());

    let (_, effects) = update(state, Msg::DismissClicked);
    assert!(effects.is_empty());
}

#[test]
fn stored_pointer_triggers_resume() {
    init_logging();
    let job = JobId::new("job-a");
    let (_, effects) = update(
        PanelState::new(),
        Msg::Initialized {
            stored_job_id: Some(job.clone()),
        },
    );
    assert_eq!(effects, vec![Effect::ResumeJob { job_id: job }]);
}

fn stored_job(status: JobStatus) -> BatchJob {
    BatchJob {
        id: JobId::new("job-a"),
        owner_id: OwnerId::new("dealer-1"),
        created_at: "2024-05-01T10:00:00.000Z".to_string(),
        updated_at: "2024-05-01T10:05:00.000Z".to_string(),
        status,
        items: items(),
        error_message: None,
    }
}

#[test]
fn resuming_completed_job_restores_without_subscribing() {
    init_logging();
    let job = JobId::new("job-a");
    let results = vec![
        priced(&job, "veh-1", 24000.0),
        priced(&job, "veh-2", 31000.0),
        priced(&job, "veh-3", 18000.0),
    ];
    let (state, effects) = update(
        PanelState::new(),
        Msg::Resumed {
            job: stored_job(JobStatus::Completed),
            results,
        },
    );

    assert!(effects.is_empty());
    assert_eq!(state.live().status(), Some(JobStatus::Completed));
    assert_eq!(state.live().results().count(), 3);
    assert_eq!(state.live().summary().success, 3);
}

#[test]
fn resuming_running_job_resubscribes() {
    init_logging();
    let (state, effects) = update(
        PanelState::new(),
        Msg::Resumed {
            job: stored_job(JobStatus::Processing),
            results: Vec::new(),
        },
    );

    assert_eq!(
        effects,
        vec![Effect::Subscribe {
            job_id: JobId::new("job-a")
        }]
    );
    assert_eq!(state.live().status(), Some(JobStatus::Processing));
}

#[test]
fn missing_resume_target_clears_pointer_silently() {
    init_logging();
    let (state, effects) = update(
        PanelState::new(),
        Msg::ResumeNotFound {
            job_id: JobId::new("job-gone"),
        },
    );

    assert_eq!(effects, vec![Effect::ClearPointer]);
    assert!(state.notice().is_none());
    assert!(state.view().job.is_none());
}

#[test]
fn resume_failure_shows_warning_and_keeps_pointer() {
    init_logging();
    let (state, effects) = update(
        PanelState::new(),
        Msg::ResumeFailed {
            job_id: JobId::new("job-a"),
            message: "disk unavailable".to_string(),
        },
    );

    assert!(effects.is_empty());
    assert_eq!(state.notice().unwrap().level, NoticeLevel::Warning);
    assert!(!state.live().has_job());
}

#[test]
fn late_missing_resume_keeps_pointer_of_newer_job() {
    init_logging();
    let stored = JobId::new("job-old");
    let (state, effects) = update(
        PanelState::new(),
        Msg::Initialized {
            stored_job_id: Some(stored.clone()),
        },
    );
    assert_eq!(effects, vec![Effect::ResumeJob { job_id: stored.clone() }]);

    let (state, _) = submit_and_accept(state, "job-new");
    let (state, effects) = update(state, Msg::ResumeNotFound { job_id: stored });

    assert!(effects.is_empty());
    assert_eq!(state.live().job_id(), Some(&JobId::new("job-new")));
    assert!(state.notice().is_none());
}

#[test]
fn resumed_finished_job_cannot_reconnect() {
    init_logging();
    let job = JobId::new("job-a");
    let (state, _) = update(
        PanelState::new(),
        Msg::Resumed {
            job: stored_job(JobStatus::Completed),
            results: vec![priced(&job, "veh-1", 24000.0)],
        },
    );
    assert!(!state.is_subscription_live());
    assert!(!state.view().can_reconnect);

    let (state, effects) = update(state, Msg::ReconnectClicked);
    assert!(effects.is_empty());
    assert!(!state.is_subscription_live());
}

#[test]
fn job_finishing_after_drop_cannot_reconnect() {
    init_logging();
    let job = JobId::new("job-a");
    let (state, _) = submit_and_accept(PanelState::new(), "job-a");
    let (state, _) = update(state, Msg::SubscriptionOpened { job_id: job.clone() });
    let (state, _) = update(state, job_update(&job, JobStatus::Completed));
    let (state, _) = update(
        state,
        Msg::SubscriptionDropped {
            job_id: job,
            reason: "channel closed".to_string(),
        },
    );

    assert!(!state.view().can_reconnect);
    let (_, effects) = update(state, Msg::ReconnectClicked);
    assert!(effects.is_empty());
}
