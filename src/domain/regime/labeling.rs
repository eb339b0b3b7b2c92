//! Turning decoded state ids into Bull / Neutral / Bear labels.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RegimeLabel {
    Bull,
    Neutral,
    Bear,
}

impl fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegimeLabel::Bull => write!(f, "Bull Run"),
            RegimeLabel::Neutral => write!(f, "Neutral"),
            RegimeLabel::Bear => write!(f, "Bear/Crash"),
        }
    }
}

/// Forward-fill, then back-fill the leading gap. `None` when nothing is assigned.
pub fn fill_states(states: &[Option<usize>]) -> Option<Vec<usize>> {
    let mut current = states.iter().flatten().next().copied()?;
    Some(
        states
            .iter()
            .map(|s| {
                if let Some(s) = s {
                    current = *s;
                }
                current
            })
            .collect(),
    )
}

/// (bull_state, bear_state) from the mean of defined returns per state.
/// States that carry no defined return are ignored. Ties go to the lowest id.
pub fn extreme_states(
    states: &[usize],
    returns: &[Option<f64>],
    n_states: usize,
) -> (usize, usize) {
    let mut sums = vec![0.0; n_states];
    let mut counts = vec![0usize; n_states];
    for (&s, r) in states.iter().zip(returns.iter()) {
        if let Some(r) = r {
            sums[s] += r;
            counts[s] += 1;
        }
    }

    let mut means = (0..n_states)
        .filter(|&s| counts[s] > 0)
        .map(|s| (s, sums[s] / counts[s] as f64));

    let Some(first) = means.next() else {
        return (0, 0);
    };
    let (mut bull, mut bear) = (first, first);
    for (s, m) in means {
        if m > bull.1 {
            bull = (s, m);
        }
        if m < bear.1 {
            bear = (s, m);
        }
    }
    (bull.0, bear.0)
}

/// Bear takes precedence when one state is both extremes.
pub fn label_for(state: usize, bull_state: usize, bear_state: usize) -> RegimeLabel {
    if state == bear_state {
        RegimeLabel::Bear
    } else if state == bull_state {
        RegimeLabel::Bull
    } else {
        RegimeLabel::Neutral
    }
}
