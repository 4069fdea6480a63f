use anyhow::Result;
use colored::Colorize;

use cloudbuccaneer::rename::{ChangeApplier, RenameAction, RenamePlanner};

use crate::config::RenameConfig;

/// Plan renames under the root and apply them if requested.
///
/// Returns the number of files renamed.
pub fn run(config: &RenameConfig) -> Result<usize> {
    if config.verbose {
        println!("{config}");
    }

    let actions = RenamePlanner::new(config.root.clone(), config.ascii_only, config.keep_track).plan()?;
    if actions.is_empty() {
        println!("Nothing to change.");
        return Ok(0);
    }

    for action in &actions {
        print_action(action, config);
    }

    if !config.apply {
        println!("{}", format!("Dryrun: {} files would be renamed", actions.len()).bold());
        return Ok(0);
    }

    let moved = ChangeApplier::new(config.undo_path.clone(), config.move_covers)
        .verbose(config.verbose)
        .apply(&actions)?;
    println!(
        "{}",
        format!("Renamed {moved} files, undo log: {}", config.undo_path.display())
            .green()
            .bold()
    );
    Ok(moved)
}

fn print_action(action: &RenameAction, config: &RenameConfig) {
    let label = if config.apply {
        "[APPLY]".green()
    } else {
        "[DRY]".yellow()
    };
    println!(
        "{label} {} -> {}",
        action.source.display(),
        action.destination.display()
    );
    if config.verbose {
        let old_name = cloudbuccaneer::get_relative_path_or_filename(&action.source, &config.root);
        let new_name = cloudbuccaneer::get_relative_path_or_filename(&action.destination, &config.root);
        cloudbuccaneer::show_diff(&old_name, &new_name);
    }
}
