use crate::state::CurrentState;
use serde::Serialize;
use std::ops::Index;

/// Append-only log of state snapshots, one per tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OutputStates {
    states: Vec<CurrentState>,
}

impl OutputStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            states: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, state: CurrentState) {
        self.states.push(state);
    }

    /// Repeats the last entry (or `fallback` when empty) until the log holds
    /// `len` entries.
    pub fn pad_to(&mut self, len: usize, fallback: &CurrentState) {
        let filler = self.states.last().cloned().unwrap_or_else(|| fallback.clone());
        if self.states.len() < len {
            self.states.resize(len, filler);
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn last(&self) -> Option<&CurrentState> {
        self.states.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CurrentState> {
        self.states.iter()
    }

    /// Extracts one value per tick, e.g. `outputs.series(|s| s.chassis.vx)`.
    pub fn series<F>(&self, f: F) -> Vec<f64>
    where
        F: Fn(&CurrentState) -> f64,
    {
        self.states.iter().map(f).collect()
    }

    pub fn into_inner(self) -> Vec<CurrentState> {
        self.states
    }
}

impl Index<usize> for OutputStates {
    type Output = CurrentState;

    fn index(&self, index: usize) -> &Self::Output {
        &self.states[index]
    }
}

impl<'a> IntoIterator for &'a OutputStates {
    type Item = &'a CurrentState;
    type IntoIter = std::slice::Iter<'a, CurrentState>;

    fn into_iter(self) -> Self::IntoIter {
        self.states.iter()
    }
}
