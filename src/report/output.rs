use crate::config::DisplayOptions;
use crate::error::Result;
use crate::model::SCHEMA_VERSION;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ReportKind {
    CalendarTeam,
    CalendarUser,
    DonutUser,
    MapUser,
    RunningRepository,
}

/// The document handed to the chart renderer.
#[derive(Debug, Serialize)]
pub struct RenderInput<'a, T: Serialize> {
    pub version: u32,
    pub kind: ReportKind,
    pub options: &'a DisplayOptions,
    pub data: &'a T,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Written(PathBuf),
    Removed(PathBuf),
    Skipped(PathBuf),
}

/// Writes the render input, or deletes a stale output file when the report
/// came out empty.
pub fn write_render_input<T: Serialize>(
    kind: ReportKind,
    options: &DisplayOptions,
    data: &T,
    empty: bool,
) -> Result<Outcome> {
    let path = options.output.clone();
    if empty {
        if path.exists() {
            fs::remove_file(&path)?;
            tracing::info!(?kind, "report is empty, removed {}", path.display());
            return Ok(Outcome::Removed(path));
        }
        tracing::info!(?kind, "report is empty, nothing written");
        return Ok(Outcome::Skipped(path));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let input = RenderInput {
        version: SCHEMA_VERSION,
        kind,
        options,
        data,
    };
    let mut json = serde_json::to_string_pretty(&input)?;
    json.push('\n');
    fs::write(&path, json)?;
    tracing::info!(?kind, "wrote {}", path.display());
    Ok(Outcome::Written(path))
}
