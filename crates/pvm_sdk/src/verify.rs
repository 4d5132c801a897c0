//! Declarative verification policies for runner job results.
//!
//! Pure data: the builder assembles `{mode, runners, threshold, checks}`
//! records consumed by an external verification subsystem. No execution
//! semantics live here.

use crate::codec;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One check descriptor: a kind tag plus kind-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub kind: String,
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// Require the result to validate against a JSON schema.
pub fn json_schema_valid(schema: serde_json::Value) -> Check {
    let mut params = serde_json::Map::with_capacity(1);
    params.insert("schema".to_owned(), schema);
    Check {
        kind: "json_schema_valid".to_owned(),
        params,
    }
}

/// Require the result to structurally match an expected shape.
pub fn structured_match(expected: serde_json::Value) -> Check {
    let mut params = serde_json::Map::with_capacity(1);
    params.insert("expected".to_owned(), expected);
    Check {
        kind: "structured_match".to_owned(),
        params,
    }
}

/// Accept the answer a majority of runners agree on.
pub fn majority_vote() -> Check {
    Check {
        kind: "majority_vote".to_owned(),
        params: serde_json::Map::new(),
    }
}

/// Assembled policy record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyPolicy {
    pub mode: String,
    pub runners: Vec<String>,
    pub threshold: u32,
    pub checks: Vec<Check>,
}

impl VerifyPolicy {
    /// Canonical bytes for transport, through the payload codec like every
    /// other wire record.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        codec::encode_json(&serde_json::to_value(self)?)
    }
}

/// Fluent builder; `build()` returns an independent copy of the accumulated
/// state, so one builder can stamp out several policies.
#[derive(Debug, Clone)]
pub struct VerifyBuilder {
    mode: String,
    runners: Vec<String>,
    threshold: u32,
    checks: Vec<Check>,
}

impl Default for VerifyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VerifyBuilder {
    pub fn new() -> Self {
        Self {
            mode: "all".to_owned(),
            runners: Vec::new(),
            threshold: 0,
            checks: Vec::new(),
        }
    }

    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    pub fn runner(mut self, runner: impl Into<String>) -> Self {
        self.runners.push(runner.into());
        self
    }

    pub fn runners<I, S>(mut self, runners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runners.extend(runners.into_iter().map(Into::into));
        self
    }

    pub fn threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn build(&self) -> VerifyPolicy {
        VerifyPolicy {
            mode: self.mode.clone(),
            runners: self.runners.clone(),
            threshold: self.threshold,
            checks: self.checks.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_is_chainable() {
        let policy = VerifyBuilder::new()
            .mode("quorum")
            .runner("runner-a")
            .runners(["runner-b", "runner-c"])
            .threshold(2)
            .check(majority_vote())
            .check(json_schema_valid(json!({"type": "object"})))
            .build();

        assert_eq!(policy.mode, "quorum");
        assert_eq!(policy.runners, vec!["runner-a", "runner-b", "runner-c"]);
        assert_eq!(policy.threshold, 2);
        assert_eq!(policy.checks.len(), 2);
    }

    #[test]
    fn build_returns_independent_copies() {
        let builder = VerifyBuilder::new().mode("quorum").check(majority_vote());
        let first = builder.build();
        let second = builder.check(structured_match(json!({"ok": true}))).build();
        assert_eq!(first.checks.len(), 1);
        assert_eq!(second.checks.len(), 2);
    }

    #[test]
    fn check_descriptors_carry_kind_and_params() {
        let check = json_schema_valid(json!({"type": "string"}));
        let as_json = serde_json::to_value(&check).unwrap();
        assert_eq!(as_json["kind"], "json_schema_valid");
        assert_eq!(as_json["schema"], json!({"type": "string"}));

        let vote = serde_json::to_value(majority_vote()).unwrap();
        assert_eq!(vote, json!({"kind": "majority_vote"}));
    }

    #[test]
    fn policy_payload_is_canonical() {
        let policy = VerifyBuilder::new()
            .mode("all")
            .runner("r1")
            .check(majority_vote())
            .build();
        let bytes = policy.to_payload().unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"checks":[{"kind":"majority_vote"}],"mode":"all","runners":["r1"],"threshold":0}"#
        );
    }
}
