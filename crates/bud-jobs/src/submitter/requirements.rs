use std::path::Path;

use crate::JobError;

/// Package name of a requirement line: the text before the first version operator
/// (`<=`, `>=`, `==`, `<`, `>`).
pub fn package_name(line: &str) -> &str {
    let cut = ["<", ">", "=="]
        .iter()
        .filter_map(|op| line.find(op))
        .min()
        .unwrap_or(line.len());
    &line[..cut]
}

/// Drop every line whose package name is listed in `excluded`; all other lines are kept verbatim.
pub fn filter_requirements<'a, I>(lines: I, excluded: &[String]) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .filter(|line| !excluded.iter().any(|name| name == package_name(line)))
        .map(str::to_string)
        .collect()
}

/// Read a requirements file (one spec per line) and filter it with [`filter_requirements`].
pub async fn read_requirements(path: &Path, excluded: &[String]) -> Result<Vec<String>, JobError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| JobError::Requirements {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(filter_requirements(content.lines(), excluded))
}
