//! Structured response shapes and their classification.
//!
//! The service is contractually required to reply with one of two
//! envelopes, selected once per run by the disclosure policy:
//! - full disclosure: `{ "data": CorrectnessExplanation }`
//! - incremental:     `{ "data": FilesRequested | CorrectnessExplanation }`

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::disclosure::PromptShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Correctness {
    Correct,
    Incorrect,
    Unknown,
}

/// Terminal verdict for one property. Produced only by the reasoning
/// service, never synthesized locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CorrectnessExplanation {
    pub correctness: Correctness,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FilesRequested {
    pub files_requested: Vec<String>,
}

/// Reply envelope when the whole codebase was inlined up front. There is
/// no file-request option in this shape.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct FullDisclosureReply {
    pub data: CorrectnessExplanation,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum IncrementalData {
    FilesRequested(FilesRequested),
    Verdict(CorrectnessExplanation),
}

/// Reply envelope when files are disclosed incrementally.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct IncrementalReply {
    pub data: IncrementalData,
}

/// The `response_format` object sent with every request, derived from the
/// envelope type the shape makes legal.
pub fn response_format(shape: PromptShape) -> Value {
    let schema = match shape {
        PromptShape::FullDisclosure => {
            serde_json::to_value(schemars::schema_for!(FullDisclosureReply))
        }
        PromptShape::Incremental => serde_json::to_value(schemars::schema_for!(IncrementalReply)),
    }
    // schema_for! output is plain data; serializing it cannot fail.
    .unwrap_or(Value::Null);
    serde_json::json!({
        "type": "json_schema",
        "json_schema": {
            "name": "proof_check_reply",
            "schema": schema,
        }
    })
}

/// What one assistant reply means for the conversation loop.
#[derive(Debug)]
pub enum Classified {
    Verdict(CorrectnessExplanation),
    FilesRequested(Vec<String>),
    /// Neither legal payload shape. A contract violation, handled as fatal
    /// by the driver.
    Invalid(String),
}

pub fn classify(shape: PromptShape, content: &str) -> Classified {
    match shape {
        PromptShape::FullDisclosure => match serde_json::from_str::<FullDisclosureReply>(content) {
            Ok(reply) => Classified::Verdict(reply.data),
            Err(e) => Classified::Invalid(e.to_string()),
        },
        PromptShape::Incremental => match serde_json::from_str::<IncrementalReply>(content) {
            Ok(reply) => match reply.data {
                IncrementalData::FilesRequested(f) => Classified::FilesRequested(f.files_requested),
                IncrementalData::Verdict(v) => Classified::Verdict(v),
            },
            Err(e) => Classified::Invalid(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_parses_in_both_shapes() {
        let content = r#"{"data": {"correctness": "correct", "explanation": "checks out"}}"#;
        for shape in [PromptShape::FullDisclosure, PromptShape::Incremental] {
            match classify(shape, content) {
                Classified::Verdict(v) => {
                    assert_eq!(v.correctness, Correctness::Correct);
                    assert_eq!(v.explanation, "checks out");
                }
                other => panic!("expected verdict, got {other:?}"),
            }
        }
    }

    #[test]
    fn file_request_is_only_legal_incrementally() {
        let content = r#"{"data": {"files_requested": ["a.py", "b.py"]}}"#;
        match classify(PromptShape::Incremental, content) {
            Classified::FilesRequested(files) => assert_eq!(files, vec!["a.py", "b.py"]),
            other => panic!("expected file request, got {other:?}"),
        }
        assert!(matches!(
            classify(PromptShape::FullDisclosure, content),
            Classified::Invalid(_)
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(
            classify(PromptShape::Incremental, "not even json"),
            Classified::Invalid(_)
        ));
        assert!(matches!(
            classify(PromptShape::Incremental, r#"{"data": {"verdict": true}}"#),
            Classified::Invalid(_)
        ));
    }

    #[test]
    fn response_format_embeds_a_schema() {
        let v = response_format(PromptShape::Incremental);
        assert_eq!(v["type"], "json_schema");
        assert_eq!(v["json_schema"]["name"], "proof_check_reply");
        assert!(v["json_schema"]["schema"].is_object());
    }

    #[test]
    fn correctness_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(Correctness::Incorrect).unwrap(),
            "incorrect"
        );
    }
}
