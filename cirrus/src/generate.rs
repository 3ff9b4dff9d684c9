use std::io::Write;

use anyhow::bail;
use libcirrus::structs::{ProfileProbabilities, Sequence};
use log::info;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::args::GenerateArgs;
use crate::batch::{Batch, BoundsEntry, ProfileEntry, TaskEntry};
use crate::util::PathBufExt;

pub fn generate(args: &GenerateArgs) -> anyhow::Result<()> {
    let batch = random_batch(args)?;

    let mut out = args.output_path.open(args.common_args.allow_overwrite)?;
    serde_json::to_writer_pretty(&mut out, &batch)?;
    writeln!(out)?;
    out.flush()?;

    info!(
        "wrote {} tasks to {}",
        batch.tasks.len(),
        args.output_path.to_string_lossy()
    );
    Ok(())
}

/// Random profiles and sequences, with one task for every pair.
pub fn random_batch(args: &GenerateArgs) -> anyhow::Result<Batch> {
    if args.min_length == 0 || args.min_length > args.max_length {
        bail!(
            "length range must be non-empty and start above zero: {}..={}",
            args.min_length,
            args.max_length
        );
    }

    let mut rng = Pcg64::seed_from_u64(args.seed);
    let mut batch = Batch::default();

    for idx in 0..args.num_profiles {
        let length = rng.gen_range(args.min_length..=args.max_length);
        batch.profiles.insert(
            format!("profile-{idx}"),
            ProfileEntry::Probabilities(ProfileProbabilities::random(length, &mut rng)),
        );
    }

    for idx in 0..args.num_sequences {
        let length = rng.gen_range(args.min_length..=args.max_length);
        let sequence = Sequence::random_amino(length, &mut rng)?;
        batch
            .sequences
            .insert(format!("sequence-{idx}"), sequence.residues().to_string());
    }

    let bounds = match args.band_radius {
        Some(radius) => BoundsEntry::Band(radius),
        None => BoundsEntry::Full,
    };

    for profile in batch.profiles.keys() {
        for sequence in batch.sequences.keys() {
            batch.tasks.push(TaskEntry {
                profile: profile.clone(),
                sequence: sequence.clone(),
                bounds: bounds.clone(),
            });
        }
    }

    Ok(batch)
}
