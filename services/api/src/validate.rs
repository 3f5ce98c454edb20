use ccne_report::error::AppError;
use ccne_report::wizard::pointer::{get, Node, Pointer};
use ccne_report::wizard::steps::StepPath;
use ccne_report::wizard::validation::validate_slice;
use clap::Args;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Form snapshot (JSON) to check
    #[arg(long)]
    pub(crate) file: PathBuf,
}

/// Issue found while checking a snapshot, addressed from the document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SnapshotIssue {
    pub(crate) step: StepPath,
    pub(crate) pointer: Pointer,
    pub(crate) message: String,
}

pub(crate) fn check_snapshot(document: &Node) -> Vec<SnapshotIssue> {
    StepPath::ordered()
        .into_iter()
        .filter_map(|step| step.slice().map(|slice| (step, slice)))
        .flat_map(|(step, slice)| {
            let prefix = Pointer::root().key(slice.key());
            let node = get(document, &prefix).cloned().unwrap_or_default();
            validate_slice(slice, &node)
                .err()
                .unwrap_or_default()
                .into_iter()
                .map(move |issue| SnapshotIssue {
                    step,
                    pointer: prefix.join(&issue.path),
                    message: issue.message,
                })
        })
        .collect()
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<ExitCode, AppError> {
    let raw = std::fs::read_to_string(&args.file)?;
    let document: Node = serde_json::from_str(&raw).map_err(std::io::Error::from)?;
    let issues = check_snapshot(&document);

    println!("Snapshot: {}", args.file.display());
    for step in StepPath::ordered() {
        if step.slice().is_none() {
            continue;
        }
        let step_issues: Vec<_> = issues.iter().filter(|issue| issue.step == step).collect();
        if step_issues.is_empty() {
            println!("  {:<24} ok", step.label());
        } else {
            println!("  {:<24} {} issue(s)", step.label(), step_issues.len());
            for issue in step_issues {
                println!("    - {}: {}", issue.pointer, issue.message);
            }
        }
    }

    if issues.is_empty() {
        println!("Snapshot is ready for submission.");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{} issue(s) block submission.", issues.len());
        Ok(ExitCode::FAILURE)
    }
}
