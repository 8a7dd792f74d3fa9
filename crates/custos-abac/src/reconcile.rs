//! Attribute reconciliation.
//!
//! Matches the attributes a chain requires against the attributes a caller
//! supplied and classifies every one of them.
//!
//! Matching is by `(class, type)` only, first match wins, and each provided
//! attribute is consumed at most once. Two provided attributes of the same
//! kind are therefore matched in the order they were supplied.

use custos_types::{AccessAttribute, AttributeResult, AttributeStatus};

use crate::{ComparatorRegistry, Result};

/// Reconciles `required` against `provided`.
///
/// The output holds one result per required attribute, in required order,
/// followed by one `ignored` result per provided attribute that was not
/// consumed, in supplied order. Values appear only for provided attributes
/// whose `echo` flag is set.
///
/// Fails only when a required attribute's `(class, type)` has no
/// comparator.
pub fn reconcile(
    registry: &ComparatorRegistry,
    required: &[AccessAttribute],
    provided: &[AccessAttribute],
) -> Result<Vec<AttributeResult>> {
    let mut pool: Vec<&AccessAttribute> = provided.iter().collect();
    let mut results = Vec::with_capacity(required.len() + provided.len());

    for req in required {
        match pool.iter().position(|p| p.same_kind(req)) {
            Some(index) => {
                let found = pool.remove(index);
                let passed = registry.compare(&req.class, &req.attr_type, &req.value, &found.value)?;
                let status = if passed {
                    AttributeStatus::Accepted
                } else {
                    AttributeStatus::Denied
                };
                results.push(AttributeResult::for_provided(found, status));
            }
            None => results.push(AttributeResult::missing(req)),
        }
    }

    results.extend(
        pool.into_iter()
            .map(|p| AttributeResult::for_provided(p, AttributeStatus::Ignored)),
    );

    Ok(results)
}

/// Outcome of one chain, computed from the required portion of its report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainOutcome {
    /// No required slot is `denied` or `required`.
    pub satisfied: bool,
    /// Number of leading consecutive `accepted` slots.
    pub accepted_run: usize,
}

impl ChainOutcome {
    pub fn of(required_results: &[AttributeResult]) -> Self {
        Self {
            satisfied: !required_results.iter().any(|r| r.status().blocks_chain()),
            accepted_run: required_results
                .iter()
                .take_while(|r| r.status() == AttributeStatus::Accepted)
                .count(),
        }
    }
}
