//! Display derivation for the analysis panel. Pure functions only.

use crate::{
    HistoryListing, ItemDescriptor, ItemResult, ItemStatus, JobId, JobStatus, Notice, PanelState,
    ScanSummary, ViewMode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTone {
    Neutral,
    Info,
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    pub label: &'static str,
    pub tone: BadgeTone,
}

pub fn job_badge(status: JobStatus) -> Badge {
    let (label, tone) = match status {
        JobStatus::Pending => ("Queued", BadgeTone::Neutral),
        JobStatus::Processing => ("Analyzing", BadgeTone::Info),
        JobStatus::Completed => ("Completed", BadgeTone::Success),
        JobStatus::PartiallyFailed => ("Partially failed", BadgeTone::Warning),
        JobStatus::Failed => ("Failed", BadgeTone::Danger),
    };
    Badge { label, tone }
}

pub fn item_badge(status: ItemStatus) -> Badge {
    let (label, tone) = match status {
        ItemStatus::Pending => ("Waiting", BadgeTone::Neutral),
        ItemStatus::Processing => ("Searching", BadgeTone::Info),
        ItemStatus::Success => ("Priced", BadgeTone::Success),
        ItemStatus::Error => ("Error", BadgeTone::Danger),
        ItemStatus::NoDataFound => ("No comparables", BadgeTone::Warning),
    };
    Badge { label, tone }
}

/// Rounds to whole units and inserts thousands separators: `24000.4` -> `"24,000"`.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn format_currency(amount: f64, currency: &str) -> String {
    let number = format_number(amount.abs());
    let sign = if amount < 0.0 && amount.round() != 0.0 { "-" } else { "" };
    match currency.trim().to_ascii_uppercase().as_str() {
        "" | "USD" => format!("{sign}${number}"),
        "EUR" => format!("{sign}€{number}"),
        "GBP" => format!("{sign}£{number}"),
        code => format!("{sign}{code} {number}"),
    }
}

pub fn format_mileage(miles: u32) -> String {
    format!("{} mi", format_number(f64::from(miles)))
}

/// `"processed/total"`.
pub fn progress_label(summary: &ScanSummary) -> String {
    format!("{}/{}", summary.processed, summary.total)
}

/// Non-zero counts in display order.
pub fn status_counts(summary: &ScanSummary) -> Vec<(Badge, usize)> {
    [
        ItemStatus::Success,
        ItemStatus::NoDataFound,
        ItemStatus::Error,
        ItemStatus::Processing,
        ItemStatus::Pending,
    ]
    .into_iter()
    .map(|status| (item_badge(status), summary.count(status)))
    .filter(|(_, count)| *count > 0)
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRowView {
    pub item_id: String,
    pub title: String,
    pub mileage: Option<String>,
    pub badge: Badge,
    pub avg_price: Option<String>,
    pub price_range: Option<String>,
    pub comparable_count: Option<u32>,
    pub source: Option<String>,
    pub error_detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPanelView {
    pub job_id: JobId,
    pub badge: Badge,
    pub progress: String,
    pub completion_percent: u8,
    pub summary: ScanSummary,
    pub counts: Vec<(Badge, usize)>,
    pub error_message: Option<String>,
    pub read_only: bool,
    pub rows: Vec<ResultRowView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRowView {
    pub job_id: JobId,
    pub label: String,
    pub badge: Badge,
    pub created_at: String,
    pub item_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelViewModel {
    pub mode: ViewMode,
    pub submitting: bool,
    pub can_reconnect: bool,
    pub notice: Option<Notice>,
    /// The active presentation; `None` renders the idle state.
    pub job: Option<JobPanelView>,
    pub history: Vec<HistoryRowView>,
    pub history_listing: HistoryListing,
    pub dirty: bool,
}

pub fn result_row(item: &ItemDescriptor, result: Option<&ItemResult>) -> ResultRowView {
    let status = result.map(|r| r.status).unwrap_or(ItemStatus::Pending);
    let analysis = result.and_then(|r| r.analysis.as_ref());
    let metrics = analysis.map(|a| &a.metrics);
    ResultRowView {
        item_id: item.item_id.clone(),
        title: item.display_name(),
        mileage: item.mileage.map(format_mileage),
        badge: item_badge(status),
        avg_price: metrics.map(|m| format_currency(m.avg, &m.currency)),
        price_range: metrics.map(|m| {
            format!(
                "{} - {}",
                format_currency(m.min, &m.currency),
                format_currency(m.max, &m.currency)
            )
        }),
        comparable_count: metrics.map(|m| m.comparable_count),
        source: metrics.map(|m| m.source.clone()),
        error_detail: result.and_then(|r| r.error_detail.clone()),
    }
}

fn job_view<'a>(
    job_id: &JobId,
    status: JobStatus,
    error_message: Option<&str>,
    items: &[ItemDescriptor],
    summary: ScanSummary,
    read_only: bool,
    lookup: impl Fn(&str) -> Option<&'a ItemResult>,
) -> JobPanelView {
    let completion_percent = (summary.completion() * 100.0).round().clamp(0.0, 100.0) as u8;
    JobPanelView {
        job_id: job_id.clone(),
        badge: job_badge(status),
        progress: progress_label(&summary),
        completion_percent,
        counts: status_counts(&summary),
        summary,
        error_message: error_message.map(ToOwned::to_owned),
        read_only,
        rows: items
            .iter()
            .map(|item| result_row(item, lookup(&item.item_id)))
            .collect(),
    }
}

pub fn panel_view(state: &PanelState) -> PanelViewModel {
    let job = match (state.mode(), state.historical()) {
        (ViewMode::Historical, Some(history)) => {
            let job = history.job();
            Some(job_view(
                &job.id,
                job.status,
                job.error_message.as_deref(),
                &job.items,
                history.summary(),
                true,
                |item_id| history.result(item_id),
            ))
        }
        _ => {
            let live = state.live();
            match (live.job_id(), live.status()) {
                (Some(job_id), Some(status)) => Some(job_view(
                    job_id,
                    status,
                    live.error_message(),
                    live.items(),
                    live.summary(),
                    false,
                    |item_id| live.result(item_id),
                )),
                _ => None,
            }
        }
    };

    let history = state
        .history()
        .iter()
        .map(|entry| HistoryRowView {
            job_id: entry.summary.id.clone(),
            label: entry.label.clone(),
            badge: job_badge(entry.summary.status),
            created_at: entry.summary.created_at.clone(),
            item_count: entry.summary.item_count,
        })
        .collect();

    PanelViewModel {
        mode: state.mode(),
        submitting: state.is_submitting(),
        can_reconnect: state.live().has_job()
            && !state.live().is_terminal()
            && !state.is_subscription_live(),
        notice: state.notice().cloned(),
        job,
        history,
        history_listing: state.history_listing(),
        dirty: state.is_dirty(),
    }
}
