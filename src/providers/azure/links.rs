/// Builds the web URL of a build's result page.
///
/// # Arguments
///
/// * `base_url` - Azure DevOps base URL (e.g., <https://dev.azure.com>)
/// * `organization` - Organization name
/// * `project` - Project name
/// * `build_id` - Numeric build id
///
/// # Returns
///
/// Clickable URL (e.g., <https://dev.azure.com/org/proj/_build/results?buildId=1&view=results>)
pub fn build_results_url(base_url: &str, organization: &str, project: &str, build_id: u64) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/{organization}/{project}/_build/results?buildId={build_id}&view=results")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_results_url() {
        let url = build_results_url("https://dev.azure.com", "msazure", "CloudNativeCompute", 123456);
        assert_eq!(
            url,
            "https://dev.azure.com/msazure/CloudNativeCompute/_build/results?buildId=123456&view=results"
        );
    }

    #[test]
    fn test_build_results_url_ignores_trailing_slash() {
        let url = build_results_url("https://dev.azure.com/", "org", "proj", 7);
        assert_eq!(url, "https://dev.azure.com/org/proj/_build/results?buildId=7&view=results");
    }
}
