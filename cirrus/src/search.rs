use std::io::Write;

use libcirrus::search::{
    Scheduler, SearchConfigBuilder, SearchTask, TaskError, TaskResult, TaskScores,
};
use log::{info, warn};

use crate::args::SearchArgs;
use crate::batch::Batch;
use crate::util::{writer_for, PathBufExt};

const HEADER: &str = "#id\tprofile\tsequence\tcells\tforward\tbackward\tviterbi\tbits\ttrace_len\tstatus";

pub fn search(args: &SearchArgs) -> anyhow::Result<()> {
    let batch = Batch::from_path(&args.batch_path)?;
    let tasks = batch.search_tasks(args.passes())?;
    info!(
        "loaded {} profiles, {} sequences, {} tasks",
        batch.profiles.len(),
        batch.sequences.len(),
        tasks.len()
    );

    let mut config = SearchConfigBuilder::default();
    config
        .num_threads(args.common_args.num_threads)
        .storage(args.storage)
        .configure_length(args.configure_length);
    if let Some(max_cells) = args.max_cells {
        config.max_cells(max_cells);
    }

    let scheduler = Scheduler::new(config.build()?)?;
    info!(
        "running on {} threads with {} storage",
        scheduler.num_threads(),
        args.storage
    );

    let results = scheduler.run(&tasks);

    let num_failed = results.iter().filter(|r| !r.is_ok()).count();
    if num_failed > 0 {
        warn!("{num_failed} of {} tasks did not finish cleanly", results.len());
    }

    let mut out = writer_for(args.output_path.as_ref(), args.common_args.allow_overwrite)?;
    write_results(&mut out, &tasks, &results)?;
    out.flush()?;

    if let Some(path) = &args.trace_output_path {
        let mut out = path.open(args.common_args.allow_overwrite)?;
        write_traces(&mut out, &tasks, &results)?;
        out.flush()?;
    }

    Ok(())
}

fn format_score(score: Option<f32>) -> String {
    match score {
        Some(score) => format!("{score:.3}"),
        None => "-".to_string(),
    }
}

/// One tab separated line per task, in task order.
pub fn write_results(
    out: &mut impl Write,
    tasks: &[SearchTask],
    results: &[TaskResult],
) -> anyhow::Result<()> {
    writeln!(out, "{HEADER}")?;

    for (task, result) in tasks.iter().zip(results) {
        let scores = result.outcome.as_ref().ok().copied().unwrap_or(TaskScores {
            num_cells: task.bounds.num_cells(),
            ..Default::default()
        });

        let trace_len = match &result.trace {
            Some(Ok(trace)) => trace.len().to_string(),
            _ => "-".to_string(),
        };

        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            result.id,
            task.profile.name,
            task.sequence.name,
            scores.num_cells,
            format_score(scores.forward.map(|s| s.value())),
            format_score(scores.backward.map(|s| s.value())),
            format_score(scores.viterbi.map(|s| s.value())),
            format_score(scores.bits.map(|s| s.value())),
            trace_len,
            result.status(),
        )?;

        if let Err(TaskError::Panicked { message }) = &result.outcome {
            warn!("task {} panicked: {message}", result.id);
        }
    }

    Ok(())
}

pub fn write_traces(
    out: &mut impl Write,
    tasks: &[SearchTask],
    results: &[TaskResult],
) -> anyhow::Result<()> {
    for (task, result) in tasks.iter().zip(results) {
        match &result.trace {
            Some(Ok(trace)) => {
                writeln!(
                    out,
                    "# task {}: {} x {}",
                    result.id, task.profile.name, task.sequence.name
                )?;
                trace.dump(out, &task.profile, &task.sequence)?;
            }
            Some(Err(err)) => warn!("task {} has no trace: {err}", result.id),
            None => {}
        }
    }
    Ok(())
}
