//! core::params
//!
//! Typed run parameters supplied by the workflow engine.
//!
//! # Boundary Validation
//!
//! Engines hand over run parameters as loosely-typed maps. They are
//! validated once, here, into [`RunParameters`]; the rest of the crate only
//! sees typed values.
//!
//! - `run_id` is required and must be a valid [`RunId`]
//! - extra parameters are scalars: string, integer, float or bool
//! - a `null` extra parameter is dropped, as if it were never supplied
//! - `branch`, if present, must be a string; an empty string means "no
//!   branch" and a non-empty one must be a valid [`BranchName`]
//!
//! # Example
//!
//! ```
//! use doltrun::core::params::RunParameters;
//!
//! let params = RunParameters::from_json(
//!     r#"{"run_id": "run-43", "extra_params": {"branch": "experiment", "limit": 10}}"#,
//! ).unwrap();
//!
//! assert_eq!(params.run_id().as_str(), "run-43");
//! assert_eq!(params.branch().map(|b| b.as_str()), Some("experiment"));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{BranchName, RunId, TypeError};

/// The extra-parameter key naming the branch a run should operate on.
pub const BRANCH_KEY: &str = "branch";

/// Errors from run parameter validation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParamsError {
    #[error("malformed run parameters: {0}")]
    Malformed(String),

    #[error(transparent)]
    InvalidType(#[from] TypeError),

    #[error("extra parameter '{key}' must be a string, number or bool")]
    UnsupportedValue { key: String },

    #[error("extra parameter 'branch' must be a string, got {found}")]
    BranchNotString { found: String },

    #[error("invalid parameter '{0}': expected KEY=VALUE")]
    InvalidAssignment(String),
}

/// A scalar extra-parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    /// Parse a command-line literal, trying bool, integer, then float
    /// before falling back to a string.
    pub fn parse_literal(raw: &str) -> Self {
        match raw {
            "true" => return ParamValue::Bool(true),
            "false" => return ParamValue::Bool(false),
            _ => {}
        }
        if let Ok(i) = raw.parse::<i64>() {
            return ParamValue::Integer(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return ParamValue::Float(f);
            }
        }
        ParamValue::String(raw.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Integer(_) => "integer",
            ParamValue::Float(_) => "float",
            ParamValue::String(_) => "string",
        }
    }

    fn from_json(key: &str, value: serde_json::Value) -> Result<Option<Self>, ParamsError> {
        use serde_json::Value;

        match value {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(ParamValue::Bool(b))),
            Value::String(s) => Ok(Some(ParamValue::String(s))),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Some(ParamValue::Integer(i))),
                None => n
                    .as_f64()
                    .map(|f| Some(ParamValue::Float(f)))
                    .ok_or_else(|| ParamsError::UnsupportedValue {
                        key: key.to_string(),
                    }),
            },
            Value::Array(_) | Value::Object(_) => Err(ParamsError::UnsupportedValue {
                key: key.to_string(),
            }),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Integer(i)
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        ParamValue::Float(f)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Integer(i) => write!(f, "{i}"),
            ParamValue::Float(x) => write!(f, "{x}"),
            ParamValue::String(s) => write!(f, "{s}"),
        }
    }
}

/// Wire shape accepted from engines before validation.
#[derive(Debug, Deserialize)]
struct RawRunParameters {
    run_id: String,
    #[serde(default)]
    extra_params: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pipeline_name: Option<String>,
}

/// Validated parameters of one pipeline run.
///
/// Immutable once constructed. The requested branch is resolved during
/// validation, so [`RunParameters::branch`] never fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunParameters {
    run_id: RunId,
    extra_params: BTreeMap<String, ParamValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pipeline_name: Option<String>,
    #[serde(skip)]
    branch: Option<BranchName>,
}

impl RunParameters {
    /// Build parameters from a run id and extra parameters.
    ///
    /// # Errors
    ///
    /// Fails if the `branch` extra parameter is present but not a valid
    /// branch name (or not a string).
    pub fn new(
        run_id: RunId,
        extra_params: BTreeMap<String, ParamValue>,
    ) -> Result<Self, ParamsError> {
        let branch = resolve_branch(&extra_params)?;
        Ok(Self {
            run_id,
            extra_params,
            pipeline_name: None,
            branch,
        })
    }

    /// Parameters with no extras.
    pub fn for_run(run_id: RunId) -> Self {
        Self {
            run_id,
            extra_params: BTreeMap::new(),
            pipeline_name: None,
            branch: None,
        }
    }

    /// Return a copy with one extra parameter set.
    pub fn with_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Result<Self, ParamsError> {
        self.extra_params.insert(key.into(), value.into());
        self.branch = resolve_branch(&self.extra_params)?;
        Ok(self)
    }

    /// Return a copy naming the pipeline being run.
    pub fn with_pipeline_name(mut self, name: impl Into<String>) -> Self {
        self.pipeline_name = Some(name.into());
        self
    }

    /// Validate an engine-supplied JSON document.
    pub fn from_json(json: &str) -> Result<Self, ParamsError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ParamsError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// Validate an engine-supplied JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ParamsError> {
        let raw: RawRunParameters =
            serde_json::from_value(value).map_err(|e| ParamsError::Malformed(e.to_string()))?;

        let run_id = RunId::new(raw.run_id)?;

        let mut extra_params = BTreeMap::new();
        for (key, value) in raw.extra_params.unwrap_or_default() {
            if let Some(v) = ParamValue::from_json(&key, value)? {
                extra_params.insert(key, v);
            }
        }

        let mut params = Self::new(run_id, extra_params)?;
        params.pipeline_name = raw.pipeline_name.filter(|n| !n.is_empty());
        Ok(params)
    }

    /// Parse `KEY=VALUE` assignments as given on a command line.
    pub fn parse_assignments<'a>(
        assignments: impl IntoIterator<Item = &'a str>,
    ) -> Result<BTreeMap<String, ParamValue>, ParamsError> {
        let mut out = BTreeMap::new();
        for assignment in assignments {
            let (key, value) = assignment
                .split_once('=')
                .filter(|(k, _)| !k.trim().is_empty())
                .ok_or_else(|| ParamsError::InvalidAssignment(assignment.to_string()))?;
            out.insert(key.trim().to_string(), ParamValue::parse_literal(value));
        }
        Ok(out)
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn extra_params(&self) -> &BTreeMap<String, ParamValue> {
        &self.extra_params
    }

    pub fn pipeline_name(&self) -> Option<&str> {
        self.pipeline_name.as_deref()
    }

    /// The branch this run asked to operate on, if any.
    pub fn branch(&self) -> Option<&BranchName> {
        self.branch.as_ref()
    }
}

fn resolve_branch(
    extra_params: &BTreeMap<String, ParamValue>,
) -> Result<Option<BranchName>, ParamsError> {
    match extra_params.get(BRANCH_KEY) {
        None => Ok(None),
        Some(ParamValue::String(s)) if s.is_empty() => Ok(None),
        Some(ParamValue::String(s)) => Ok(Some(BranchName::new(s.as_str())?)),
        Some(other) => Err(ParamsError::BranchNotString {
            found: other.kind().to_string(),
        }),
    }
}
