use crate::analysis::PageAnalysis;
use serde_json::Value;

/// Parses a collaborator reply into a [`PageAnalysis`]
///
/// The reply is expected to be a JSON object with `summary`, `keywords` and
/// `answer` fields, possibly wrapped in a markdown code fence. Fields of the
/// wrong type are replaced by their empty value; a reply that is not a JSON
/// object yields `PageAnalysis::default()`.
///
/// # Examples
///
/// ```
/// use sumi_inquiry::analysis::parse_analysis_response;
///
/// let raw = "```json\n{\"summary\": \"Docs\", \"keywords\": [\"rust\"], \"answer\": null}\n```";
/// let analysis = parse_analysis_response(raw);
/// assert_eq!(analysis.summary, "Docs");
/// assert_eq!(analysis.keywords, vec!["rust".to_string()]);
/// assert!(analysis.answer.is_none());
/// ```
pub fn parse_analysis_response(raw: &str) -> PageAnalysis {
    let cleaned = strip_code_fences(raw);

    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Analyzer reply is not valid JSON: {}", e);
            return PageAnalysis::default();
        }
    };

    let Some(object) = value.as_object() else {
        tracing::warn!("Analyzer reply is not a JSON object");
        return PageAnalysis::default();
    };

    let summary = object
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    let keywords = object
        .get("keywords")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let answer = object
        .get("answer")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|a| !a.is_empty() && !a.eq_ignore_ascii_case("null"))
        .map(str::to_string);

    PageAnalysis {
        summary,
        keywords,
        answer,
    }
}

/// Removes ```json / ``` fences the model may wrap around its JSON
fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}
