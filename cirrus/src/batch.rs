use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use indexmap::IndexMap;
use libcirrus::align::structs::{EdgeBounds, Interval};
use libcirrus::search::{Passes, SearchTask};
use libcirrus::structs::{Profile, ProfileProbabilities, Sequence};
use serde::{Deserialize, Serialize};

/// How a profile is described in a batch file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileEntry {
    Uniform { uniform: usize },
    Probabilities(ProfileProbabilities),
}

/// The region of the matrix a task is scored in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundsEntry {
    #[default]
    Full,
    Band(usize),
    /// Half-open profile intervals for each sequence position
    Rows(Vec<Vec<(usize, usize)>>),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskEntry {
    pub profile: String,
    pub sequence: String,
    #[serde(default)]
    pub bounds: BoundsEntry,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Batch {
    pub profiles: IndexMap<String, ProfileEntry>,
    pub sequences: IndexMap<String, String>,
    pub tasks: Vec<TaskEntry>,
}

impl Batch {
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .context(format!("failed to open batch file: {}", path.to_string_lossy()))?;

        serde_json::from_reader(BufReader::new(file))
            .context(format!("failed to parse batch file: {}", path.to_string_lossy()))
    }

    /// Build every profile and sequence once and pair them up into tasks.
    pub fn search_tasks(&self, passes: Passes) -> anyhow::Result<Vec<SearchTask>> {
        let profiles: IndexMap<&str, Arc<Profile>> = self
            .profiles
            .iter()
            .map(|(name, entry)| -> anyhow::Result<_> {
                Ok((name.as_str(), Arc::new(entry.build(name)?)))
            })
            .collect::<anyhow::Result<_>>()?;

        let sequences: IndexMap<&str, Arc<Sequence>> = self
            .sequences
            .iter()
            .map(|(name, residues)| -> anyhow::Result<_> {
                let sequence = Sequence::from_utf8(residues.as_bytes())
                    .context(format!("failed to read sequence: {name}"))?
                    .with_name(name);
                Ok((name.as_str(), Arc::new(sequence)))
            })
            .collect::<anyhow::Result<_>>()?;

        self.tasks
            .iter()
            .enumerate()
            .map(|(id, entry)| -> anyhow::Result<SearchTask> {
                let profile = profiles
                    .get(entry.profile.as_str())
                    .ok_or_else(|| anyhow!("task {id} names unknown profile: {}", entry.profile))?;
                let sequence = sequences.get(entry.sequence.as_str()).ok_or_else(|| {
                    anyhow!("task {id} names unknown sequence: {}", entry.sequence)
                })?;

                let bounds = entry
                    .bounds
                    .build(sequence.length, profile.length)
                    .context(format!("task {id} has malformed bounds"))?;

                Ok(
                    SearchTask::new(id, profile.clone(), sequence.clone(), bounds)
                        .with_passes(passes),
                )
            })
            .collect()
    }
}

impl ProfileEntry {
    pub fn build(&self, name: &str) -> anyhow::Result<Profile> {
        let mut profile = match self {
            ProfileEntry::Uniform { uniform } => Profile::uniform(*uniform),
            ProfileEntry::Probabilities(probabilities) => {
                Profile::from_probabilities(name, probabilities)
                    .context(format!("failed to build profile: {name}"))?
            }
        };
        profile.name = name.to_string();
        Ok(profile)
    }
}

impl BoundsEntry {
    pub fn build(&self, seq_length: usize, profile_length: usize) -> anyhow::Result<EdgeBounds> {
        let bounds = match self {
            BoundsEntry::Full => EdgeBounds::full(seq_length, profile_length),
            BoundsEntry::Band(radius) => {
                EdgeBounds::diagonal_band(seq_length, profile_length, *radius)
            }
            BoundsEntry::Rows(rows) => EdgeBounds::from_rows(
                seq_length,
                profile_length,
                rows.iter()
                    .map(|row| row.iter().copied().map(Interval::from).collect())
                    .collect(),
            )?,
        };
        Ok(bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};

    const BATCH: &str = r#"{
        "profiles": {
            "flat": { "uniform": 4 }
        },
        "sequences": {
            "short": "ACDE",
            "longer": "ACDEFGHIK"
        },
        "tasks": [
            { "profile": "flat", "sequence": "short", "bounds": "full" },
            { "profile": "flat", "sequence": "longer", "bounds": { "band": 1 } },
            { "profile": "flat", "sequence": "short",
              "bounds": { "rows": [[[0, 2]], [[0, 1], [2, 4]], [], [[3, 4]]] } },
            { "profile": "flat", "sequence": "longer" }
        ]
    }"#;

    #[test]
    fn test_parse_batch() {
        let_assert!(Ok(batch) = serde_json::from_str::<Batch>(BATCH));
        check!(batch.profiles.len() == 1);
        check!(batch.sequences.keys().collect::<Vec<_>>() == ["short", "longer"]);
        check!(batch.tasks[0].bounds == BoundsEntry::Full);
        check!(batch.tasks[1].bounds == BoundsEntry::Band(1));
        check!(batch.tasks[3].bounds == BoundsEntry::Full);
        let_assert!(BoundsEntry::Rows(rows) = &batch.tasks[2].bounds);
        check!(rows[1] == [(0, 1), (2, 4)]);
    }

    #[test]
    fn test_search_tasks() {
        let_assert!(Ok(batch) = serde_json::from_str::<Batch>(BATCH));
        let_assert!(Ok(tasks) = batch.search_tasks(Passes::all()));

        check!(tasks.len() == 4);
        check!(tasks.iter().map(|t| t.id).collect::<Vec<_>>() == [0, 1, 2, 3]);
        check!(tasks[0].profile.name == "flat");
        check!(tasks[1].sequence.name == "longer");
        check!(tasks[0].bounds.num_cells() == 16);
        check!(tasks[2].bounds.num_cells() == 6);
        check!(tasks[3].bounds.num_cells() == 36);
        check!(tasks.iter().all(|t| t.passes == Passes::all()));
        check!(Arc::ptr_eq(&tasks[0].profile, &tasks[1].profile));
    }

    #[test]
    fn test_probability_profiles() {
        let probabilities = ProfileProbabilities {
            match_emissions: vec![vec![0.05; 20]; 3],
            transitions: vec![[0.9, 0.05, 0.05, 0.5, 0.5, 0.5, 0.5]; 4],
        };
        let mut batch = Batch::default();
        batch
            .profiles
            .insert("three".to_string(), ProfileEntry::Probabilities(probabilities));

        let_assert!(Ok(json) = serde_json::to_string(&batch));
        let_assert!(Ok(parsed) = serde_json::from_str::<Batch>(&json));
        let_assert!(Some(entry) = parsed.profiles.get("three"));
        let_assert!(Ok(profile) = entry.build("three"));
        check!(profile.length == 3);
        check!(profile.name == "three");
    }

    #[test]
    fn test_unknown_names_are_errors() {
        let_assert!(Ok(mut batch) = serde_json::from_str::<Batch>(BATCH));
        batch.tasks[1].sequence = "missing".to_string();

        let_assert!(Err(err) = batch.search_tasks(Passes::default()));
        check!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_malformed_rows_are_errors() {
        let_assert!(Ok(mut batch) = serde_json::from_str::<Batch>(BATCH));
        batch.tasks[0].bounds = BoundsEntry::Rows(vec![vec![(0, 9)]; 4]);
        check!(batch.search_tasks(Passes::default()).is_err());

        batch.tasks[0].bounds = BoundsEntry::Rows(vec![vec![(0, 2)]; 3]);
        check!(batch.search_tasks(Passes::default()).is_err());
    }
}
