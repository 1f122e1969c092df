//! Parallel batch evaluation
//!
//! Items are evaluated independently on the rayon pool. A failing or
//! panicking item is recorded as a failure and never affects the others;
//! results come back in input order.

use crate::evaluator::{ComplianceChecklist, ComplianceEvaluator, EvaluationResult};
use crate::library::{ComponentLibrary, FunctionRepository};
use crate::{EngineError, EngineResult};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Outcome of one batch item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Evaluated { result: EvaluationResult },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub id: String,
    pub outcome: BatchOutcome,
}

impl BatchItem {
    pub fn result(&self) -> Option<&EvaluationResult> {
        match &self.outcome {
            BatchOutcome::Evaluated { result } => Some(result),
            BatchOutcome::Failed { .. } => None,
        }
    }
}

/// Results of a batch, in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.result().is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    pub fn compliant(&self) -> usize {
        self.items
            .iter()
            .filter_map(|i| i.result())
            .filter(|r| r.is_compliant)
            .count()
    }
}

/// Runs many evaluations in parallel
#[derive(Debug, Clone, Default)]
pub struct BatchEvaluator {
    evaluator: ComplianceEvaluator,
}

impl BatchEvaluator {
    pub fn new(evaluator: ComplianceEvaluator) -> Self {
        Self { evaluator }
    }

    /// Evaluate checklists keyed by id
    pub fn evaluate_checklists(
        &self,
        checklists: &IndexMap<String, ComplianceChecklist>,
    ) -> BatchReport {
        let entries: Vec<(&String, &ComplianceChecklist)> = checklists.iter().collect();
        tracing::info!(items = entries.len(), "evaluating checklist batch");

        let items = entries
            .par_iter()
            .map(|(id, checklist)| BatchItem {
                id: (*id).clone(),
                outcome: isolate(id, || Ok(self.evaluator.evaluate(checklist))),
            })
            .collect();

        BatchReport { items }
    }

    /// Evaluate stored safety functions by id
    pub fn evaluate_functions<R, L>(
        &self,
        repository: &R,
        library: &L,
        function_ids: &[String],
    ) -> BatchReport
    where
        R: FunctionRepository + Sync,
        L: ComponentLibrary + Sync,
    {
        tracing::info!(items = function_ids.len(), "evaluating function batch");

        let items = function_ids
            .par_iter()
            .map(|id| BatchItem {
                id: id.clone(),
                outcome: isolate(id, || {
                    self.evaluator.evaluate_function(repository, library, id)
                }),
            })
            .collect();

        BatchReport { items }
    }
}

fn isolate<F>(id: &str, evaluate: F) -> BatchOutcome
where
    F: FnOnce() -> EngineResult<EvaluationResult>,
{
    let result = catch_unwind(AssertUnwindSafe(evaluate))
        .unwrap_or_else(|payload| Err(EngineError::Aborted(panic_message(payload.as_ref()))));

    match result {
        Ok(result) => BatchOutcome::Evaluated { result },
        Err(err) => {
            tracing::warn!(item = %id, error = %err, "batch item failed");
            BatchOutcome::Failed {
                error: err.to_string(),
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic during evaluation".to_string()
    }
}
