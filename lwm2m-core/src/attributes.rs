//! Write-attributes parameters
//!
//! Notification attributes attached to an Object, Object Instance or Resource
//! with a Write-Attributes operation. They travel as URI query parameters.

use crate::error::{Lwm2mError, Lwm2mResult};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObserveSpec {
    /// Minimum period between notifications, in seconds
    pub min_period: Option<u32>,
    /// Maximum period between notifications, in seconds
    pub max_period: Option<u32>,
    pub greater_than: Option<f64>,
    pub less_than: Option<f64>,
    pub step: Option<f64>,
    /// Remove all attributes
    pub cancel: bool,
}

impl ObserveSpec {
    pub fn builder() -> ObserveSpecBuilder {
        ObserveSpecBuilder::default()
    }

    /// Query parameters in wire order (`pmin`, `pmax`, `gt`, `lt`, `st`, `cancel`)
    pub fn to_query_params(&self) -> Vec<String> {
        let mut params = Vec::new();
        if self.cancel {
            params.push("cancel".to_string());
        }
        if let Some(v) = self.min_period {
            params.push(format!("pmin={}", v));
        }
        if let Some(v) = self.max_period {
            params.push(format!("pmax={}", v));
        }
        if let Some(v) = self.greater_than {
            params.push(format!("gt={}", v));
        }
        if let Some(v) = self.less_than {
            params.push(format!("lt={}", v));
        }
        if let Some(v) = self.step {
            params.push(format!("st={}", v));
        }
        params
    }

    pub fn validate(&self) -> Lwm2mResult<()> {
        if let (Some(min), Some(max)) = (self.min_period, self.max_period) {
            if min > max {
                return Err(Lwm2mError::InvalidData(format!(
                    "pmin ({}) must not exceed pmax ({})",
                    min, max
                )));
            }
        }
        if self.cancel && self.has_values() {
            return Err(Lwm2mError::InvalidData(
                "cancel cannot be combined with other attributes".to_string(),
            ));
        }
        Ok(())
    }

    fn has_values(&self) -> bool {
        self.min_period.is_some()
            || self.max_period.is_some()
            || self.greater_than.is_some()
            || self.less_than.is_some()
            || self.step.is_some()
    }
}

impl fmt::Display for ObserveSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_query_params().join("&"))
    }
}

#[derive(Debug, Default)]
pub struct ObserveSpecBuilder {
    spec: ObserveSpec,
}

impl ObserveSpecBuilder {
    pub fn min_period(mut self, seconds: u32) -> Self {
        self.spec.min_period = Some(seconds);
        self
    }

    pub fn max_period(mut self, seconds: u32) -> Self {
        self.spec.max_period = Some(seconds);
        self
    }

    pub fn greater_than(mut self, threshold: f64) -> Self {
        self.spec.greater_than = Some(threshold);
        self
    }

    pub fn less_than(mut self, threshold: f64) -> Self {
        self.spec.less_than = Some(threshold);
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.spec.step = Some(step);
        self
    }

    pub fn cancel(mut self) -> Self {
        self.spec.cancel = true;
        self
    }

    /// Build and validate the attribute set
    pub fn build(self) -> Lwm2mResult<ObserveSpec> {
        self.spec.validate()?;
        Ok(self.spec)
    }
}
