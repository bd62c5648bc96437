use scan_core::{ComparableRecord, ItemResult, ItemStatus, JobId, MarketAnalysis, PriceMetrics};
use scan_logging::scan_warn;
use serde_json::{Map, Value};

use crate::RawItemResult;

const DEFAULT_CURRENCY: &str = "USD";
const UNKNOWN_SOURCE: &str = "unknown";

/// Turn a worker-written result into the typed form. The payload is kept only
/// for `success` and only if its metrics decode.
pub fn decode_result(job_id: &JobId, raw: &RawItemResult) -> ItemResult {
    let analysis = match (raw.status, raw.payload.as_ref()) {
        (ItemStatus::Success, Some(payload)) => {
            let analysis = decode_analysis(payload);
            if analysis.is_none() {
                scan_warn!(
                    "Dropping undecodable payload for item {} of job {}",
                    raw.item_id,
                    job_id
                );
            }
            analysis
        }
        _ => None,
    };

    ItemResult {
        job_id: job_id.clone(),
        item_id: raw.item_id.clone(),
        status: raw.status,
        analysis,
        error_detail: raw.error_detail.clone(),
    }
    .normalized()
}

/// Accepts `{metrics: {...}, comparables}` or the metrics fields flattened
/// next to `comparables`. A JSON-encoded string is unwrapped once.
pub fn decode_analysis(payload: &Value) -> Option<MarketAnalysis> {
    let payload = unwrap_string(payload)?;
    let object = payload.as_object()?;
    let metrics_source = object
        .get("metrics")
        .and_then(Value::as_object)
        .unwrap_or(object);

    let comparables = object
        .get("comparables")
        .map(decode_comparables)
        .unwrap_or_default();
    let metrics = decode_metrics(metrics_source, comparables.len())?;

    Some(MarketAnalysis {
        metrics,
        comparables,
    })
}

/// Normalizes the comparables field, which has been seen as an array, a single
/// object, a JSON-encoded string of either, or null. Anything else yields an
/// empty list; records without a title or price are dropped.
pub fn decode_comparables(value: &Value) -> Vec<ComparableRecord> {
    let Some(value) = unwrap_string(value) else {
        scan_warn!("Comparables field is an unparseable string; treating as empty");
        return Vec::new();
    };

    match &value {
        Value::Array(entries) => entries
            .iter()
            .filter_map(|entry| entry.as_object().and_then(decode_record))
            .collect(),
        Value::Object(object) => decode_record(object).into_iter().collect(),
        Value::Null => Vec::new(),
        other => {
            scan_warn!("Unexpected comparables shape: {}", shape_name(other));
            Vec::new()
        }
    }
}

fn unwrap_string(value: &Value) -> Option<Value> {
    match value {
        Value::String(text) if text.trim().is_empty() => Some(Value::Null),
        Value::String(text) => serde_json::from_str(text).ok(),
        other => Some(other.clone()),
    }
}

fn decode_metrics(object: &Map<String, Value>, comparables_len: usize) -> Option<PriceMetrics> {
    let min = number(field(object, &["min", "minPrice", "min_price"])?)?;
    let avg = number(field(object, &["avg", "average", "avgPrice", "avg_price"])?)?;
    let max = number(field(object, &["max", "maxPrice", "max_price"])?)?;
    let comparable_count = field(object, &["comparableCount", "comparable_count", "count"])
        .and_then(number)
        .map(|count| count.max(0.0).round() as u32)
        .unwrap_or(comparables_len as u32);

    Some(PriceMetrics {
        min,
        avg,
        max,
        comparable_count,
        currency: text(object, &["currency", "unit"]).unwrap_or_else(|| DEFAULT_CURRENCY.into()),
        source: text(object, &["source", "dataSource", "data_source"])
            .unwrap_or_else(|| UNKNOWN_SOURCE.into()),
        retrieved_at: text(object, &["retrievedAt", "retrieved_at", "timestamp"]),
    })
}

fn decode_record(object: &Map<String, Value>) -> Option<ComparableRecord> {
    let title = text(object, &["title", "name"])?;
    let price = number(field(object, &["price", "value"])?)?;

    let attributes = match field(object, &["attributes", "details"]) {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|value| match value {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
        _ => Vec::new(),
    };

    Some(ComparableRecord {
        title,
        price,
        year: field(object, &["year"])
            .and_then(number)
            .map(|year| year.round() as i32),
        mileage: field(object, &["mileage", "miles", "odometer"])
            .and_then(number)
            .filter(|miles| *miles >= 0.0)
            .map(|miles| miles.round() as u32),
        location: text(object, &["location"]),
        attributes,
        link: text(object, &["link", "url"]),
    })
}

fn field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| object.get(*key))
        .filter(|value| !value.is_null())
}

fn text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    field(object, keys)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

/// Numbers, or strings such as `"$24,500"`.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, ',' | '$' | ' '))
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
