use std::fmt;
use std::fmt::Formatter;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::align::structs::State;
use crate::alphabet::{
    AMINO_ALPHABET, AMINO_ALPHABET_SIZE, AMINO_BACKGROUND_FREQUENCIES,
    AMINO_DEGENERATE_ALPHABET_SIZE,
};
use crate::util::LogAbuse;

/// Node transition probabilities, in the order they are read from a model:
/// M->M, M->I, M->D, I->M, I->I, D->M, D->D
pub type NodeTransitions = [f32; 7];

pub const NODE_MATCH_TO_MATCH: usize = 0;
pub const NODE_MATCH_TO_INSERT: usize = 1;
pub const NODE_MATCH_TO_DELETE: usize = 2;
pub const NODE_INSERT_TO_MATCH: usize = 3;
pub const NODE_INSERT_TO_INSERT: usize = 4;
pub const NODE_DELETE_TO_MATCH: usize = 5;
pub const NODE_DELETE_TO_DELETE: usize = 6;

#[derive(Error, Debug, PartialEq)]
pub enum ProfileShapeError {
    #[error("expected {expected} transition rows (nodes 0..=T), found {found}")]
    TransitionRows { expected: usize, found: usize },
    #[error("match emissions at node {node} have {found} values, expected {expected}")]
    EmissionWidth {
        node: usize,
        expected: usize,
        found: usize,
    },
    #[error("probability {value} at node {node} is not in [0, 1]")]
    Probability { node: usize, value: f32 },
    #[error("no match state can be entered: local entry weights total {total}")]
    NoLocalEntry { total: f32 },
}

/// The probabilities a profile is built from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileProbabilities {
    /// One row of 20 match emission probabilities per node 1..=T
    pub match_emissions: Vec<Vec<f32>>,
    /// One row of node transitions per node 0..=T; node 0 is the begin node
    pub transitions: Vec<NodeTransitions>,
}

impl ProfileProbabilities {
    /// Random match emissions and transitions for a model of `length` nodes.
    pub fn random(length: usize, rng: &mut impl Rng) -> Self {
        let normalized = |values: Vec<f32>| -> Vec<f32> {
            let sum: f32 = values.iter().sum();
            values.into_iter().map(|v| v / sum).collect()
        };

        let match_emissions = (0..length)
            .map(|_| {
                normalized(
                    (0..AMINO_ALPHABET_SIZE)
                        .map(|_| rng.gen_range(0.01f32..1.0).powi(3))
                        .collect(),
                )
            })
            .collect();

        let transitions = (0..=length)
            .map(|_| {
                let m = normalized(vec![
                    rng.gen_range(4.0f32..10.0),
                    rng.gen_range(0.05f32..1.0),
                    rng.gen_range(0.05f32..1.0),
                ]);
                let i = rng.gen_range(0.2f32..0.8);
                let d = rng.gen_range(0.2f32..0.8);
                [m[0], m[1], m[2], 1.0 - i, i, 1.0 - d, d]
            })
            .collect();

        ProfileProbabilities {
            match_emissions,
            transitions: Profile::terminated(transitions),
        }
    }
}

#[derive(Clone)]
pub struct Profile {
    /// The name of the profile
    pub name: String,
    /// Model length (number of nodes)
    pub length: usize,
    /// Current target sequence length
    pub target_length: usize,
    /// Transition scores, indexed by node 0..=T, plus a pad node
    pub transitions: Vec<[f32; 8]>,
    /// Match scores, indexed by node 0..=T, plus a pad node
    pub match_scores: Vec<[f32; AMINO_DEGENERATE_ALPHABET_SIZE]>,
    /// Insert scores, indexed by node 0..=T, plus a pad node
    pub insert_scores: Vec<[f32; AMINO_DEGENERATE_ALPHABET_SIZE]>,
    /// Transitions from special states (E, N, J, B, C)
    pub special_transitions: [[f32; 2]; 5],
    /// The expected number of times that the J state is used
    pub expected_j_uses: f32,
}

impl Profile {
    pub const DEFAULT_TARGET_LENGTH: usize = 400;

    // special state indices
    pub const NUM_SPECIAL_STATES: usize = 5;
    pub const SPECIAL_E_IDX: usize = 0;
    pub const SPECIAL_N_IDX: usize = 1;
    pub const SPECIAL_J_IDX: usize = 2;
    pub const SPECIAL_B_IDX: usize = 3;
    pub const SPECIAL_C_IDX: usize = 4;

    pub const SPECIAL_STATE_IDX_TO_NAME: [&'static str; 5] = ["E", "N", "J", "B", "C"];

    // special transition indices
    pub const SPECIAL_LOOP_IDX: usize = 0;
    pub const SPECIAL_MOVE_IDX: usize = 1;

    /// The number of allowed state transitions under the model.
    pub const NUM_STATE_TRANSITIONS: usize = 8;
    pub const MATCH_TO_MATCH_IDX: usize = 0;
    pub const INSERT_TO_MATCH_IDX: usize = 1;
    pub const DELETE_TO_MATCH_IDX: usize = 2;
    pub const BEGIN_TO_MATCH_IDX: usize = 3;
    pub const MATCH_TO_DELETE_IDX: usize = 4;
    pub const DELETE_TO_DELETE_IDX: usize = 5;
    pub const MATCH_TO_INSERT_IDX: usize = 6;
    pub const INSERT_TO_INSERT_IDX: usize = 7;

    pub fn from_probabilities(
        name: impl Into<String>,
        probabilities: &ProfileProbabilities,
    ) -> Result<Self, ProfileShapeError> {
        let length = probabilities.match_emissions.len();

        if probabilities.transitions.len() != length + 1 {
            return Err(ProfileShapeError::TransitionRows {
                expected: length + 1,
                found: probabilities.transitions.len(),
            });
        }

        for (node_idx, emissions) in probabilities.match_emissions.iter().enumerate() {
            if emissions.len() != AMINO_ALPHABET_SIZE {
                return Err(ProfileShapeError::EmissionWidth {
                    node: node_idx + 1,
                    expected: AMINO_ALPHABET_SIZE,
                    found: emissions.len(),
                });
            }
            if let Some(&value) = emissions.iter().find(|p| !(0.0..=1.0).contains(*p)) {
                return Err(ProfileShapeError::Probability {
                    node: node_idx + 1,
                    value,
                });
            }
        }

        for (node_idx, node) in probabilities.transitions.iter().enumerate() {
            if let Some(&value) = node.iter().find(|p| !(0.0..=1.0).contains(*p)) {
                return Err(ProfileShapeError::Probability {
                    node: node_idx,
                    value,
                });
            }
        }

        if length > 0 {
            let (_, total) = Self::local_entry_weights(&probabilities.transitions);
            if !(total > 0.0 && total.is_finite()) {
                return Err(ProfileShapeError::NoLocalEntry { total });
            }
        }

        Ok(Self::build(name.into(), probabilities))
    }

    /// Expected match state occupancy per node, used to spread local entry
    /// over the model, along with its length-weighted total.
    fn local_entry_weights(node_transitions: &[NodeTransitions]) -> (Vec<f32>, f32) {
        let length = node_transitions.len().saturating_sub(1);
        let mut match_occupancy = vec![0.0; length + 1];
        if length == 0 {
            return (match_occupancy, 0.0);
        }

        match_occupancy[1] = node_transitions[0][NODE_MATCH_TO_INSERT]
            + node_transitions[0][NODE_MATCH_TO_MATCH];

        for k in 2..=length {
            match_occupancy[k] = match_occupancy[k - 1]
                * (node_transitions[k - 1][NODE_MATCH_TO_MATCH]
                    + node_transitions[k - 1][NODE_MATCH_TO_INSERT])
                + (1.0 - match_occupancy[k - 1]) * node_transitions[k - 1][NODE_DELETE_TO_MATCH]
        }

        let z: f32 = (1..=length)
            .map(|k| match_occupancy[k] * (length - k + 1) as f32)
            .sum();

        (match_occupancy, z)
    }

    /// Build a profile from probabilities that are known to be well formed.
    fn build(name: String, probabilities: &ProfileProbabilities) -> Self {
        let length = probabilities.match_emissions.len();

        let mut profile = Profile {
            name,
            length,
            target_length: 0,
            // +1 for node 0, +1 for a pad node that the backward pass may read
            transitions: vec![[-f32::INFINITY; 8]; length + 2],
            match_scores: vec![[-f32::INFINITY; AMINO_DEGENERATE_ALPHABET_SIZE]; length + 2],
            insert_scores: vec![[-f32::INFINITY; AMINO_DEGENERATE_ALPHABET_SIZE]; length + 2],
            special_transitions: [[0.0; 2]; 5],
            expected_j_uses: 0.0,
        };

        // these settings are for the single-hit mode
        // N, C, and J transitions are set later by length config
        profile.special_transitions[Profile::SPECIAL_E_IDX][Profile::SPECIAL_MOVE_IDX] = 0.0;
        profile.special_transitions[Profile::SPECIAL_E_IDX][Profile::SPECIAL_LOOP_IDX] =
            -f32::INFINITY;

        if length == 0 {
            return profile;
        }

        let node_transitions = &probabilities.transitions;
        let (match_occupancy, z) = Self::local_entry_weights(node_transitions);

        // B->M(k) is stored with the transitions out of node k - 1
        for k in 1..=length {
            profile.transitions[k - 1][Profile::BEGIN_TO_MATCH_IDX] =
                (match_occupancy[k] / z).ln_or_inf();
        }

        for k in 1..=length {
            let node = &node_transitions[k];
            let scores = &mut profile.transitions[k];
            scores[Profile::MATCH_TO_MATCH_IDX] = node[NODE_MATCH_TO_MATCH].ln_or_inf();
            scores[Profile::MATCH_TO_INSERT_IDX] = node[NODE_MATCH_TO_INSERT].ln_or_inf();
            scores[Profile::MATCH_TO_DELETE_IDX] = node[NODE_MATCH_TO_DELETE].ln_or_inf();
            scores[Profile::INSERT_TO_MATCH_IDX] = node[NODE_INSERT_TO_MATCH].ln_or_inf();
            scores[Profile::INSERT_TO_INSERT_IDX] = node[NODE_INSERT_TO_INSERT].ln_or_inf();
            scores[Profile::DELETE_TO_MATCH_IDX] = node[NODE_DELETE_TO_MATCH].ln_or_inf();
            scores[Profile::DELETE_TO_DELETE_IDX] = node[NODE_DELETE_TO_DELETE].ln_or_inf();
        }

        for k in 1..=length {
            let emissions = &probabilities.match_emissions[k - 1];
            let scores = &mut profile.match_scores[k];

            for alphabet_idx in 0..AMINO_ALPHABET_SIZE {
                // score is match ln(emission / background)
                scores[alphabet_idx] = (emissions[alphabet_idx] as f64
                    / AMINO_BACKGROUND_FREQUENCIES[alphabet_idx] as f64)
                    .ln() as f32;
            }

            // degenerate residues score as the background-weighted mean
            let degenerate_score: f32 = (0..AMINO_ALPHABET_SIZE)
                .filter(|&a| scores[a].is_finite())
                .map(|a| scores[a] * AMINO_BACKGROUND_FREQUENCIES[a])
                .sum();

            scores[AMINO_ALPHABET_SIZE..].fill(degenerate_score);
        }

        // setting insert scores to 0 corresponds to insertion
        // emissions being equal to background probabilities
        for k in 1..length {
            profile.insert_scores[k].fill(0.0);
        }
        // insert at node T is impossible, so it stays at -inf

        profile.configure_for_target_length(Profile::DEFAULT_TARGET_LENGTH);
        profile
    }

    /// A profile with flat match emissions and the same transitions at every node.
    pub fn uniform(length: usize) -> Self {
        let flat = vec![1.0 / AMINO_ALPHABET_SIZE as f32; AMINO_ALPHABET_SIZE];
        let node: NodeTransitions = [0.90, 0.05, 0.05, 0.50, 0.50, 0.50, 0.50];

        let probabilities = ProfileProbabilities {
            match_emissions: vec![flat; length],
            transitions: Self::terminated(vec![node; length + 1]),
        };

        Self::build(format!("uniform-{length}"), &probabilities)
    }

    /// A profile with random match emissions and transitions.
    pub fn random(length: usize, rng: &mut impl Rng) -> Self {
        Self::build(
            format!("random-{length}"),
            &ProfileProbabilities::random(length, rng),
        )
    }

    /// The last node can only move to the end state.
    fn terminated(mut transitions: Vec<NodeTransitions>) -> Vec<NodeTransitions> {
        if let Some(last) = transitions.last_mut() {
            *last = [1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        }
        transitions
    }

    #[inline(always)]
    pub fn match_score(&self, alphabet_idx: usize, profile_idx: usize) -> f32 {
        self.match_scores[profile_idx][alphabet_idx]
    }

    #[inline(always)]
    pub fn insert_score(&self, alphabet_idx: usize, profile_idx: usize) -> f32 {
        self.insert_scores[profile_idx][alphabet_idx]
    }

    #[inline(always)]
    pub fn transition_score(&self, transition_idx: usize, profile_idx: usize) -> f32 {
        self.transitions[profile_idx][transition_idx]
    }

    #[inline(always)]
    pub fn special_transition_score(&self, state_idx: usize, transition_idx: usize) -> f32 {
        self.special_transitions[state_idx][transition_idx]
    }

    /// The score of moving from one trace state to the next, or None when the
    /// model has no such transition.
    pub fn generic_transition_score(
        &self,
        state_from: State,
        idx_from: usize,
        state_to: State,
        idx_to: usize,
    ) -> Option<f32> {
        let special = |state_idx, transition_idx| {
            Some(self.special_transition_score(state_idx, transition_idx))
        };

        match (state_from, state_to) {
            (State::S, State::N) => Some(0.0),
            (State::N, State::N) => special(Profile::SPECIAL_N_IDX, Profile::SPECIAL_LOOP_IDX),
            (State::N, State::B) => special(Profile::SPECIAL_N_IDX, Profile::SPECIAL_MOVE_IDX),
            (State::B, State::M) if idx_to >= 1 => {
                Some(self.transition_score(Profile::BEGIN_TO_MATCH_IDX, idx_to - 1))
            }
            (State::M, State::M) if idx_to == idx_from + 1 => {
                Some(self.transition_score(Profile::MATCH_TO_MATCH_IDX, idx_from))
            }
            (State::M, State::I) if idx_to == idx_from => {
                Some(self.transition_score(Profile::MATCH_TO_INSERT_IDX, idx_from))
            }
            (State::M, State::D) if idx_to == idx_from + 1 => {
                Some(self.transition_score(Profile::MATCH_TO_DELETE_IDX, idx_from))
            }
            (State::I, State::M) if idx_to == idx_from + 1 => {
                Some(self.transition_score(Profile::INSERT_TO_MATCH_IDX, idx_from))
            }
            (State::I, State::I) if idx_to == idx_from => {
                Some(self.transition_score(Profile::INSERT_TO_INSERT_IDX, idx_from))
            }
            (State::D, State::M) if idx_to == idx_from + 1 => {
                Some(self.transition_score(Profile::DELETE_TO_MATCH_IDX, idx_from))
            }
            (State::D, State::D) if idx_to == idx_from + 1 => {
                Some(self.transition_score(Profile::DELETE_TO_DELETE_IDX, idx_from))
            }
            (State::M, State::E) | (State::D, State::E) => Some(0.0),
            (State::E, State::C) => special(Profile::SPECIAL_E_IDX, Profile::SPECIAL_MOVE_IDX),
            (State::E, State::J) => special(Profile::SPECIAL_E_IDX, Profile::SPECIAL_LOOP_IDX),
            (State::J, State::J) => special(Profile::SPECIAL_J_IDX, Profile::SPECIAL_LOOP_IDX),
            (State::J, State::B) => special(Profile::SPECIAL_J_IDX, Profile::SPECIAL_MOVE_IDX),
            (State::C, State::C) => special(Profile::SPECIAL_C_IDX, Profile::SPECIAL_LOOP_IDX),
            (State::C, State::T) => special(Profile::SPECIAL_C_IDX, Profile::SPECIAL_MOVE_IDX),
            _ => None,
        }
    }

    /// Allow (or forbid) more than one hit per target through the J state.
    pub fn configure_multi_hit(&mut self, multi_hit: bool) {
        let (loop_score, move_score, expected_j_uses) = if multi_hit {
            (0.5f32.ln(), 0.5f32.ln(), 1.0)
        } else {
            (-f32::INFINITY, 0.0, 0.0)
        };

        self.special_transitions[Profile::SPECIAL_E_IDX][Profile::SPECIAL_LOOP_IDX] = loop_score;
        self.special_transitions[Profile::SPECIAL_E_IDX][Profile::SPECIAL_MOVE_IDX] = move_score;
        self.expected_j_uses = expected_j_uses;

        if self.target_length > 0 {
            self.configure_for_target_length(self.target_length);
        }
    }

    /// Sets the length of the current target sequence to which the profile will be aligned.
    ///
    /// This also adjusts the loop and move transition scores for the special states N, J, C.
    pub fn configure_for_target_length(&mut self, length: usize) {
        self.target_length = length;

        let move_probability: f32 =
            (2.0 + self.expected_j_uses) / (length as f32 + 2.0 + self.expected_j_uses);

        let loop_probability: f32 = 1.0 - move_probability;

        let loop_score = loop_probability.ln_or_inf();
        let move_score = move_probability.ln();

        self.special_transitions[Profile::SPECIAL_N_IDX][Profile::SPECIAL_LOOP_IDX] = loop_score;
        self.special_transitions[Profile::SPECIAL_J_IDX][Profile::SPECIAL_LOOP_IDX] = loop_score;
        self.special_transitions[Profile::SPECIAL_C_IDX][Profile::SPECIAL_LOOP_IDX] = loop_score;

        self.special_transitions[Profile::SPECIAL_N_IDX][Profile::SPECIAL_MOVE_IDX] = move_score;
        self.special_transitions[Profile::SPECIAL_J_IDX][Profile::SPECIAL_MOVE_IDX] = move_score;
        self.special_transitions[Profile::SPECIAL_C_IDX][Profile::SPECIAL_MOVE_IDX] = move_score;
    }

    /// A copy of this profile configured for a target of the given length.
    pub fn configured_for(&self, length: usize) -> Profile {
        let mut profile = self.clone();
        profile.configure_for_target_length(length);
        profile
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "model length: {}", self.length)?;
        writeln!(f, "target length: {}", self.target_length)?;

        for (name, scores) in Profile::SPECIAL_STATE_IDX_TO_NAME
            .iter()
            .zip(self.special_transitions.iter())
        {
            writeln!(f, "{name} {:8.4} {:8.4}", scores[0], scores[1])?;
        }

        for i in 0..=self.length {
            writeln!(f, "{}", i)?;
            for residue in AMINO_ALPHABET {
                write!(f, "    {}    ", residue)?;
            }
            writeln!(f)?;

            for j in 0..AMINO_ALPHABET_SIZE {
                write!(f, "{:8.4} ", self.match_scores[i][j])?;
            }
            writeln!(f)?;

            for j in 0..AMINO_ALPHABET_SIZE {
                write!(f, "{:8.4} ", self.insert_scores[i][j])?;
            }
            writeln!(f)?;

            for t in 0..Profile::NUM_STATE_TRANSITIONS {
                write!(f, "{:8.4} ", self.transitions[i][t])?;
            }
            writeln!(f)?;
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    #[test]
    fn test_begin_distribution_sums_to_one() {
        let mut rng = Pcg64::seed_from_u64(5);
        let profile = Profile::random(30, &mut rng);

        let total: f32 = (1..=profile.length)
            .map(|k| profile.transition_score(Profile::BEGIN_TO_MATCH_IDX, k - 1).exp())
            .sum();

        // local entry is spread over the model, weighted by occupancy
        check!(total <= 1.0 + 1e-4);
        check!(total > 0.0);
    }

    #[test]
    fn test_pad_node_is_impossible() {
        let profile = Profile::uniform(5);

        check!(profile.transitions.len() == 7);
        check!(profile.match_score(0, 6) == -f32::INFINITY);
        check!(profile.insert_score(0, 5) == -f32::INFINITY);
        check!(profile.insert_score(0, 4) == 0.0);
    }

    #[test]
    fn test_configure_for_target_length() {
        let mut profile = Profile::uniform(5);
        profile.configure_for_target_length(98);

        let n_move = profile.special_transition_score(
            Profile::SPECIAL_N_IDX,
            Profile::SPECIAL_MOVE_IDX,
        );
        let n_loop = profile.special_transition_score(
            Profile::SPECIAL_N_IDX,
            Profile::SPECIAL_LOOP_IDX,
        );

        check!((n_move - (2.0f32 / 100.0).ln()).abs() < 1e-6);
        check!((n_loop - (98.0f32 / 100.0).ln()).abs() < 1e-6);
        check!(
            profile.special_transition_score(Profile::SPECIAL_E_IDX, Profile::SPECIAL_LOOP_IDX)
                == -f32::INFINITY
        );
    }

    #[test]
    fn test_configure_multi_hit() {
        let mut profile = Profile::uniform(5);
        profile.configure_multi_hit(true);

        let e_loop = profile.special_transition_score(
            Profile::SPECIAL_E_IDX,
            Profile::SPECIAL_LOOP_IDX,
        );
        let j_move = profile.special_transition_score(
            Profile::SPECIAL_J_IDX,
            Profile::SPECIAL_MOVE_IDX,
        );
        let expected_move = (3.0f32 / (Profile::DEFAULT_TARGET_LENGTH as f32 + 3.0)).ln();

        check!((e_loop - 0.5f32.ln()).abs() < 1e-6);
        check!((j_move - expected_move).abs() < 1e-6);
    }

    #[test]
    fn test_shape_errors() {
        let probabilities = ProfileProbabilities {
            match_emissions: vec![vec![0.05; 20]; 3],
            transitions: vec![[0.9, 0.05, 0.05, 0.5, 0.5, 0.5, 0.5]; 3],
        };
        let_assert!(Err(err) = Profile::from_probabilities("bad", &probabilities));
        check!(
            err == ProfileShapeError::TransitionRows {
                expected: 4,
                found: 3
            }
        );

        let probabilities = ProfileProbabilities {
            match_emissions: vec![vec![0.05; 19]],
            transitions: vec![[0.9, 0.05, 0.05, 0.5, 0.5, 0.5, 0.5]; 2],
        };
        check!(Profile::from_probabilities("bad", &probabilities).is_err());
    }

    #[test]
    fn test_rejects_models_without_local_entry() {
        // node 0 sends everything to delete, so M1 is never occupied
        let probabilities = ProfileProbabilities {
            match_emissions: vec![vec![0.05; 20]],
            transitions: vec![
                [0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0],
                [1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0],
            ],
        };
        let_assert!(Err(err) = Profile::from_probabilities("dead", &probabilities));
        check!(err == ProfileShapeError::NoLocalEntry { total: 0.0 });

        // the same model with some mass into M1 is fine
        let mut probabilities = probabilities;
        probabilities.transitions[0] = [0.5, 0.0, 0.5, 1.0, 0.0, 0.0, 1.0];
        let_assert!(Ok(profile) = Profile::from_probabilities("live", &probabilities));
        check!(profile
            .transition_score(Profile::BEGIN_TO_MATCH_IDX, 0)
            .is_finite());
    }

    #[test]
    fn test_generic_transition_score() {
        let profile = Profile::uniform(5);

        check!(
            profile.generic_transition_score(State::M, 2, State::M, 3)
                == Some(profile.transition_score(Profile::MATCH_TO_MATCH_IDX, 2))
        );
        check!(
            profile.generic_transition_score(State::B, 0, State::M, 1)
                == Some(profile.transition_score(Profile::BEGIN_TO_MATCH_IDX, 0))
        );
        check!(profile.generic_transition_score(State::M, 2, State::M, 4).is_none());
        check!(profile.generic_transition_score(State::N, 0, State::C, 0).is_none());
    }
}
