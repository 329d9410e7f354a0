use anyhow::Result;
use std::io::Write;

use crate::config::OutputFormat;
use crate::dataset::{PipelineRecord, SequencePipeline};

use super::report::render_report;

/// Writes a dataset report in the requested format.
///
/// - Table: human-readable terminal output
/// - JSON: sequence-shaped dataset, builds ordered by date
/// - CSV: one row per build for spreadsheets
pub fn export_dataset(
    records: &[PipelineRecord],
    format: OutputFormat,
    output: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            write!(output, "{}", render_report(records))?;
            Ok(())
        }
        OutputFormat::Json => export_json(records, output),
        OutputFormat::Csv => export_csv(records, output),
    }
}

fn export_json(records: &[PipelineRecord], output: &mut dyn Write) -> Result<()> {
    let sorted: Vec<SequencePipeline> = records
        .iter()
        .map(|record| SequencePipeline {
            name: record.name.clone(),
            pipeline_id: record.pipeline_id,
            builds: record.builds_by_time().into_iter().cloned().collect(),
        })
        .collect();

    writeln!(output, "{}", serde_json::to_string_pretty(&sorted)?)?;
    Ok(())
}

fn export_csv(records: &[PipelineRecord], output: &mut dyn Write) -> Result<()> {
    writeln!(
        output,
        "pipeline_id,pipeline_name,build_id,underlay_type,time,result,cluster,url"
    )?;

    for record in records {
        for build in record.builds_by_time() {
            writeln!(
                output,
                "{},{},{},{},{},{},{},{}",
                record.pipeline_id,
                csv_field(&record.name),
                build.build_id,
                csv_field(&build.underlay_type),
                csv_field(&build.time),
                csv_field(&build.result),
                csv_field(build.cluster.as_deref().unwrap_or("")),
                csv_field(&build.url),
            )?;
        }
    }

    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::BuildRecord;

    fn sample() -> Vec<PipelineRecord> {
        let mut record = PipelineRecord::new("e2e, nightly", 42);
        for (id, time) in [(2, "2023-05-01"), (1, "2023-01-10")] {
            record.builds.insert(
                id,
                BuildRecord {
                    build_id: id,
                    underlay_type: "AKS_CLUSTER".to_string(),
                    result: "failed".to_string(),
                    time: time.to_string(),
                    url: format!("https://ci/{id}?a=1&b=2"),
                    cluster: (id == 2).then(|| "east".to_string()),
                },
            );
        }
        vec![record]
    }

    fn export(format: OutputFormat) -> String {
        let mut buffer = Vec::new();
        export_dataset(&sample(), format, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_csv_export() {
        let csv = export(OutputFormat::Csv);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "42,\"e2e, nightly\",1,AKS_CLUSTER,2023-01-10,failed,,https://ci/1?a=1&b=2"
        );
        assert!(lines[2].starts_with("42,\"e2e, nightly\",2,"));
        assert!(lines[2].contains(",east,"));
    }

    #[test]
    fn test_json_export_is_sorted_sequence() {
        let json = export(OutputFormat::Json);
        let parsed: Vec<SequencePipeline> = serde_json::from_str(&json).unwrap();

        let ids: Vec<_> = parsed[0].builds.iter().map(|b| b.build_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(parsed[0].builds[1].cluster.as_deref(), Some("east"));
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a\"b"), "\"a\"\"b\"");
    }
}
