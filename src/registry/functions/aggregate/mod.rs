// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Aggregate functions over the values of a stage data element

use crate::ast::{ExpressionNode, ItemReference};
use crate::error::{ExpressionError, Result};
use crate::evaluator::{ExpressionCompiler, ItemStrategy};
use crate::model::{ExpressionValue, ValueKind};
use crate::registry::function::{ExpressionFunction, FunctionRegistry};
use crate::registry::signature::{FunctionSignature, ParameterInfo, ParameterKind};

/// Aggregation applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregate {
    /// Mean
    Avg,
    /// Number of non-null values
    Count,
    /// Largest value
    Max,
    /// Smallest value
    Min,
    /// Sample standard deviation
    StdDev,
    /// Sum
    Sum,
    /// Sample variance
    Variance,
}

impl Aggregate {
    /// Every aggregation
    pub const ALL: [Aggregate; 7] = [
        Self::Avg,
        Self::Count,
        Self::Max,
        Self::Min,
        Self::StdDev,
        Self::Sum,
        Self::Variance,
    ];

    /// Function name
    pub fn name(self) -> &'static str {
        match self {
            Self::Avg => "avg",
            Self::Count => "count",
            Self::Max => "max",
            Self::Min => "min",
            Self::StdDev => "stddev",
            Self::Sum => "sum",
            Self::Variance => "variance",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Avg => "Average",
            Self::Count => "Count",
            Self::Max => "Maximum",
            Self::Min => "Minimum",
            Self::StdDev => "Standard Deviation",
            Self::Sum => "Sum",
            Self::Variance => "Variance",
        }
    }

    /// SQL aggregate function
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::StdDev => "stddev_samp",
            other => other.name(),
        }
    }

    /// Apply to numbers; `None` when undefined for the input size
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        let n = values.len() as f64;
        let sum: f64 = values.iter().sum();
        match self {
            Self::Count => Some(n),
            _ if values.is_empty() => None,
            Self::Sum => Some(sum),
            Self::Avg => Some(sum / n),
            Self::Max => values.iter().copied().reduce(f64::max),
            Self::Min => values.iter().copied().reduce(f64::min),
            Self::StdDev | Self::Variance if values.len() < 2 => None,
            Self::StdDev | Self::Variance => {
                let mean = sum / n;
                let variance =
                    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
                Some(if self == Self::StdDev {
                    variance.sqrt()
                } else {
                    variance
                })
            }
        }
    }
}

/// Aggregate function such as avg() or stddev()
pub struct AggregateFunction {
    aggregate: Aggregate,
    signature: FunctionSignature,
}

impl AggregateFunction {
    /// Create the function for one aggregation
    pub fn new(aggregate: Aggregate) -> Self {
        Self {
            aggregate,
            signature: FunctionSignature::new(
                aggregate.name(),
                vec![ParameterInfo::required("value", ParameterKind::Any)],
                Some(ValueKind::Number),
            ),
        }
    }

    fn numbers(&self, values: Vec<ExpressionValue>) -> Result<Vec<f64>> {
        values
            .into_iter()
            .filter(|value| !value.is_null())
            .map(|value| {
                value.as_number().ok_or_else(|| {
                    ExpressionError::type_mismatch(
                        ValueKind::Number.type_name(),
                        value.type_name(),
                        format!("argument of {}", self.aggregate.name()),
                    )
                })
            })
            .collect()
    }
}

impl ExpressionFunction for AggregateFunction {
    fn name(&self) -> &str {
        self.aggregate.name()
    }

    fn human_friendly_name(&self) -> &str {
        self.aggregate.label()
    }

    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn documentation(&self) -> &str {
        "Aggregates all values of a program stage data element, or the single value of any other argument."
    }

    fn evaluate(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        let [arg] = args else {
            return Err(self.arity_error(args.len()));
        };
        let values = match arg.as_item() {
            Some(ItemReference::StageElement {
                program_stage_uid,
                data_element_uid,
            }) if compiler.context().item_strategy == ItemStrategy::Evaluate => compiler
                .context()
                .require_values()?
                .stage_element_values(program_stage_uid, data_element_uid),
            _ => vec![compiler.visit_value(arg)?],
        };
        let numbers = self.numbers(values)?;
        Ok(self
            .aggregate
            .apply(&numbers)
            .map_or(ExpressionValue::Null, ExpressionValue::Number))
    }

    fn to_sql(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        let [arg] = args else {
            return Err(self.arity_error(args.len()));
        };
        Ok(format!(
            "{}({})",
            self.aggregate.sql_name(),
            compiler.visit_sql_raw(arg)?
        ))
    }
}

/// Register all aggregate functions
pub fn register_aggregate_functions(registry: &mut FunctionRegistry) {
    for aggregate in Aggregate::ALL {
        registry.register(AggregateFunction::new(aggregate));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(Aggregate::Sum.apply(&values), Some(40.0));
        assert_eq!(Aggregate::Avg.apply(&values), Some(5.0));
        assert_eq!(Aggregate::Max.apply(&values), Some(9.0));
        assert_eq!(Aggregate::Count.apply(&[]), Some(0.0));
        assert_eq!(Aggregate::Avg.apply(&[]), None);
        assert_eq!(Aggregate::Variance.apply(&[1.0]), None);
        assert_eq!(Aggregate::Variance.apply(&[1.0, 3.0]), Some(2.0));
    }

    #[test]
    fn test_sql_names() {
        assert_eq!(Aggregate::StdDev.sql_name(), "stddev_samp");
        assert_eq!(Aggregate::Variance.sql_name(), "variance");
    }
}
