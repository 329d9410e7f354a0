use std::fmt::Write;

use comfy_table::Cell;

use crate::dataset::PipelineRecord;

use super::styling::{muted, pipeline_label};
use super::tables::{color_coded_result_cell, create_cyan_header, create_table};

/// Renders every pipeline's retained builds, oldest first.
pub fn render_report(records: &[PipelineRecord]) -> String {
    let mut output = String::new();

    for record in records {
        let _ = writeln!(output, "{}", pipeline_label(record.pipeline_id, &record.name));

        if record.builds.is_empty() {
            let _ = writeln!(output, "  {}\n", muted("No builds recorded"));
            continue;
        }

        let mut table = create_table();
        table.set_header(create_cyan_header(&[
            "Build",
            "Underlay type",
            "Date",
            "Result",
            "Cluster",
            "URL",
        ]));

        for build in record.builds_by_time() {
            table.add_row(vec![
                Cell::new(build.build_id),
                Cell::new(&build.underlay_type),
                Cell::new(&build.time),
                color_coded_result_cell(&build.result),
                Cell::new(build.cluster.as_deref().unwrap_or("")),
                Cell::new(&build.url),
            ]);
        }

        let _ = writeln!(output, "{table}");
        let _ = writeln!(
            output,
            "  {} {}\n",
            muted("Builds recorded:"),
            record.builds.len()
        );
    }

    output
}
