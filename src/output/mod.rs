mod exports;
mod progress;
mod report;
mod styling;
mod summary;
mod tables;

pub use exports::export_dataset;
pub use progress::ScanProgress;
pub use summary::print_pass_summary;

use styling::{muted, tool_name};

/// Prints the `aks-usage` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        tool_name("🔎 aks-usage"),
        muted(env!("CARGO_PKG_VERSION")),
        muted("Underlay usage tracker for CI pipelines")
    );
}
