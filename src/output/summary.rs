use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use crate::engine::{BuildOutcome, PassSummary};

use super::styling::{added_count, muted, section};
use super::tables::{color_coded_result_cell, count_cell, create_cyan_header, create_table};

/// Prints the outcome of a finished pass to stdout.
///
/// Shows one row per pipeline with how many builds were observed and what
/// happened to them, followed by the builds recorded in this pass.
pub fn print_pass_summary(summary: &PassSummary, target_type: &str) {
    println!("{}", render_pass_summary(summary, target_type));
}

fn render_pass_summary(summary: &PassSummary, target_type: &str) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "{}", section("📊", format!("Usage of {target_type}")));

    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "Pipeline",
        "Name",
        "Observed",
        "Skipped",
        "Rejected",
        "Added",
        "Already recorded",
        "Types seen",
    ]));

    for pipeline in &summary.pipelines {
        let types = pipeline.types_seen();
        table.add_row(vec![
            Cell::new(pipeline.pipeline_id),
            Cell::new(&pipeline.name),
            Cell::new(pipeline.builds.len()),
            Cell::new(pipeline.count(BuildOutcome::Skipped)),
            Cell::new(pipeline.count(BuildOutcome::Rejected)),
            count_cell(pipeline.count(BuildOutcome::Added), TableColor::Green),
            Cell::new(pipeline.count(BuildOutcome::AlreadyPresent)),
            Cell::new(if types.is_empty() {
                "-".to_string()
            } else {
                types.join("\n")
            }),
        ]);
    }

    let _ = writeln!(output, "{table}");

    let added: Vec<_> = summary
        .pipelines
        .iter()
        .flat_map(|p| &p.builds)
        .filter(|b| b.outcome == BuildOutcome::Added)
        .collect();

    if !added.is_empty() {
        let _ = writeln!(output, "\n{}", section("🆕", "Newly recorded"));

        let mut table = create_table();
        table.set_header(create_cyan_header(&["Pipeline", "Build", "Result", "Cluster"]));
        for build in &added {
            table.add_row(vec![
                Cell::new(build.pipeline_id),
                Cell::new(build.build_id),
                color_coded_result_cell(&build.result),
                Cell::new(build.cluster.as_deref().unwrap_or("")),
            ]);
        }
        let _ = writeln!(output, "{table}");
    }

    let _ = write!(
        output,
        "  {} builds observed, {} newly recorded, {} {}",
        summary.observed(),
        added_count(added.len()),
        summary.count(BuildOutcome::AlreadyPresent),
        muted("already recorded")
    );

    output
}
