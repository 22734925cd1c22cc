use crate::utils::{Error, Result};
use itertools::Itertools;
use std::{collections::HashMap, str::FromStr};

/// Occurrence counts keyed by element type, then sequence id. Missing pairs are zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseCountMatrix {
    rows: HashMap<String, HashMap<String, u64>>,
}

impl SparseCountMatrix {
    pub fn get(&self, element_type_id: &str, sequence_id: &str) -> u64 {
        self.rows
            .get(element_type_id)
            .and_then(|row| row.get(sequence_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn contains(&self, element_type_id: &str, sequence_id: &str) -> bool {
        self.rows
            .get(element_type_id)
            .is_some_and(|row| row.contains_key(sequence_id))
    }

    pub fn element_types(&self) -> Vec<&str> {
        self.rows.keys().map(String::as_str).sorted().collect()
    }

    pub fn sequence_ids(&self) -> Vec<&str> {
        self.rows
            .values()
            .flat_map(|row| row.keys().map(String::as_str))
            .unique()
            .sorted()
            .collect()
    }

    /// Number of stored entries, explicit zeros included.
    pub fn nnz(&self) -> usize {
        self.rows.values().map(HashMap::len).sum()
    }

    pub fn total(&self) -> u64 {
        self.rows.values().flat_map(HashMap::values).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Adds `other` entry-wise. Summation is order independent, so partial
    /// matrices from any partition of the input merge to the same result.
    pub fn merge(&mut self, other: SparseCountMatrix) {
        for (element_type_id, other_row) in other.rows {
            let row = self.rows.entry(element_type_id).or_default();
            for (sequence_id, count) in other_row {
                *row.entry(sequence_id).or_insert(0) += count;
            }
        }
    }

    /// Presence/absence view: every non-zero count becomes 1.
    pub fn to_presence(&self) -> SparseCountMatrix {
        let rows = self
            .rows
            .iter()
            .map(|(element_type_id, row)| {
                let row = row
                    .iter()
                    .map(|(sequence_id, &count)| (sequence_id.clone(), count.min(1)))
                    .collect();
                (element_type_id.clone(), row)
            })
            .collect();
        SparseCountMatrix { rows }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroPolicy {
    /// Below-threshold observations leave no trace.
    #[default]
    Implicit,
    /// Below-threshold observations of a new pair store an explicit 0.
    Materialize,
}

impl FromStr for ZeroPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "implicit" => Ok(ZeroPolicy::Implicit),
            "materialize" => Ok(ZeroPolicy::Materialize),
            _ => Err(format!(
                "Invalid zero policy '{}': must be 'implicit' or 'materialize'",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    Empty,
    Accumulating,
    Finalized,
}

/// Counts conserved element occurrences per (element type, sequence) pair.
#[derive(Debug)]
pub struct StreamingMatrixAggregator {
    threshold: f64,
    zero_policy: ZeroPolicy,
    matrix: Option<SparseCountMatrix>,
    observations: usize,
}

impl StreamingMatrixAggregator {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            zero_policy: ZeroPolicy::default(),
            matrix: Some(SparseCountMatrix::default()),
            observations: 0,
        }
    }

    pub fn with_zero_policy(mut self, zero_policy: ZeroPolicy) -> Self {
        self.zero_policy = zero_policy;
        self
    }

    pub fn state(&self) -> AggregatorState {
        match (&self.matrix, self.observations) {
            (None, _) => AggregatorState::Finalized,
            (Some(_), 0) => AggregatorState::Empty,
            (Some(_), _) => AggregatorState::Accumulating,
        }
    }

    /// Counts the occurrence iff `conservation_score` is strictly above the threshold.
    pub fn observe(
        &mut self,
        element_type_id: &str,
        sequence_id: &str,
        conservation_score: f64,
    ) -> Result<()> {
        let matrix = self.matrix.as_mut().ok_or_else(|| {
            Error::InvalidState("observe called on a finalized aggregator".to_string())
        })?;
        self.observations += 1;

        let passes = conservation_score > self.threshold;
        if passes {
            if let Some(count) = matrix
                .rows
                .get_mut(element_type_id)
                .and_then(|row| row.get_mut(sequence_id))
            {
                *count += 1;
                return Ok(());
            }
        }

        if !matrix.rows.contains_key(element_type_id) {
            matrix
                .rows
                .insert(element_type_id.to_string(), HashMap::new());
        }
        if let Some(row) = matrix.rows.get_mut(element_type_id) {
            if passes {
                row.insert(sequence_id.to_string(), 1);
            } else if self.zero_policy == ZeroPolicy::Materialize && !row.contains_key(sequence_id)
            {
                row.insert(sequence_id.to_string(), 0);
            }
        }
        Ok(())
    }

    pub fn finalize(&mut self) -> Result<SparseCountMatrix> {
        self.matrix.take().ok_or_else(|| {
            Error::InvalidState("aggregator has already been finalized".to_string())
        })
    }
}
