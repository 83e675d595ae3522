use crate::error::MalformedRecordError;
use crate::models::MetricRecord;
use serde_json::{Map, Value};

const URL_KEYS: &[&str] = &["url", "requestedUrl", "oldUrl"];
const PERFORMANCE_KEYS: &[&str] = &["performance_score", "performanceScore", "newScore"];
const SEO_KEYS: &[&str] = &["seo_score", "seoScore", "matchScore"];
const MOBILE_KEYS: &[&str] = &["mobile_friendly", "mobileFriendly"];
const ERROR_MESSAGE_KEYS: &[&str] = &["error_message", "errorMessage"];

const DEFAULT_ERROR_MESSAGE: &str = "measurement failed";

/// Turn one raw per-URL result from the job runner into a canonical record.
///
/// Only a missing or unusable `url` is an error. Unknown fields are ignored,
/// scores are clamped into 0-100, and anything that looks like an error
/// indicator wins over whatever scores came along with it.
pub fn normalize(raw: &Value) -> Result<MetricRecord, MalformedRecordError> {
    let obj = raw.as_object().ok_or(MalformedRecordError::NotAnObject)?;

    let url = match first_present(obj, URL_KEYS) {
        None => return Err(MalformedRecordError::MissingUrl),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(_) => return Err(MalformedRecordError::InvalidUrl),
    };

    let status_word = obj
        .get("status")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_lowercase());

    if let Some(message) = error_indicator(obj, status_word.as_deref()) {
        return Ok(MetricRecord::error(url, message));
    }

    if status_word.as_deref() == Some("pending") {
        return Ok(MetricRecord::pending(url));
    }

    let performance =
        first_score(obj, PERFORMANCE_KEYS).or_else(|| lighthouse_score(obj, "performance"));
    let seo = first_score(obj, SEO_KEYS).or_else(|| lighthouse_score(obj, "seo"));
    let mobile = first_present(obj, MOBILE_KEYS).and_then(as_flag);

    let explicitly_measured = matches!(
        status_word.as_deref(),
        Some("measured") | Some("completed") | Some("complete") | Some("success")
    );

    if performance.is_none() && seo.is_none() && mobile.is_none() && !explicitly_measured {
        return Ok(MetricRecord::pending(url));
    }

    Ok(MetricRecord::measured(url, performance, seo, mobile))
}

fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
}

fn error_indicator(obj: &Map<String, Value>, status_word: Option<&str>) -> Option<String> {
    let explicit_message = first_present(obj, ERROR_MESSAGE_KEYS)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    let from_error_field = match obj.get("error") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(Some(s.trim().to_string())),
        Some(Value::Bool(true)) => Some(None),
        Some(Value::Object(inner)) => Some(
            inner
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
        ),
        _ => None,
    };

    let status_says_error = matches!(status_word, Some("error") | Some("failed"));

    if explicit_message.is_none() && from_error_field.is_none() && !status_says_error {
        return None;
    }

    Some(
        explicit_message
            .or(from_error_field.flatten())
            .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
    )
}

fn first_score(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find_map(as_number)
        .map(clamp_score)
}

// Lighthouse reports categories on a 0-1 scale
fn lighthouse_score(obj: &Map<String, Value>, category: &str) -> Option<f64> {
    obj.get("categories")?
        .get(category)?
        .get("score")
        .and_then(as_number)
        .map(|score| clamp_score(score * 100.0))
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

// Scores are kept to thousandths of a point, the precision the aggregate sums use
fn clamp_score(score: f64) -> f64 {
    (score.clamp(0.0, 100.0) * 1000.0).round() / 1000.0
}
