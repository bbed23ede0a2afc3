use std::{borrow::Cow, fmt::Write, path::Path, process::Command};

use anyhow::{Context, Result};
use tracing::info;

use crate::tracker::summary::SummaryRow;

const SUMMARY_HEADER: &str = "Project ID,Project Name,Total Hours";

/// Renders the summary as CSV. Hours always have 2 decimal places.
pub fn summary_csv(rows: &[SummaryRow]) -> String {
    let mut csv = String::from(SUMMARY_HEADER);
    csv.push('\n');
    for row in rows {
        // Writing into a String can't fail.
        let _ = writeln!(
            csv,
            "{},{},{:.2}",
            csv_field(&row.project_id),
            csv_field(&row.project_name),
            row.total_hours
        );
    }
    csv
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

pub async fn write_summary(rows: &[SummaryRow], path: &Path) -> Result<()> {
    tokio::fs::write(path, summary_csv(rows))
        .await
        .with_context(|| format!("Failed to write summary {path:?}"))?;
    info!("Exported {} rows into {path:?}", rows.len());
    Ok(())
}

/// Something that can show an exported file to the user.
#[cfg_attr(test, mockall::automock)]
pub trait Viewer {
    fn open(&self, path: &Path) -> Result<()>;
}

/// Opens files with whatever the platform considers the default application.
pub struct SystemViewer;

impl Viewer for SystemViewer {
    fn open(&self, path: &Path) -> Result<()> {
        let mut command = viewer_command(path);
        #[allow(clippy::zombie_processes)]
        let _ = command
            .spawn()
            .with_context(|| format!("Failed to open {path:?}"))?;
        Ok(())
    }
}

fn viewer_command(path: &Path) -> Command {
    cfg_if::cfg_if! {
        if #[cfg(windows)] {
            let mut command = Command::new("cmd");
            command.args(["/C", "start", ""]).arg(path);
            command
        }
        else if #[cfg(target_os = "macos")] {
            let mut command = Command::new("open");
            command.arg(path);
            command
        }
        else {
            let mut command = Command::new("xdg-open");
            command.arg(path);
            command
        }
    }
}

/// Writes the summary and optionally shows it.
pub async fn export_summary(
    rows: &[SummaryRow],
    path: &Path,
    viewer: Option<&dyn Viewer>,
) -> Result<()> {
    write_summary(rows, path).await?;
    if let Some(viewer) = viewer {
        viewer.open(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use crate::tracker::summary::SummaryRow;

    use super::{export_summary, summary_csv, MockViewer};

    #[test]
    fn test_summary_csv() {
        let rows = vec![
            SummaryRow::new("A1", "Alpha", 5410),
            SummaryRow::new("B,2", "The \"Beta\" project", 36),
        ];

        assert_eq!(
            summary_csv(&rows),
            "Project ID,Project Name,Total Hours\n\
             A1,Alpha,1.50\n\
             \"B,2\",\"The \"\"Beta\"\" project\",0.01\n"
        );
    }

    #[test]
    fn test_empty_summary_has_header() {
        assert_eq!(summary_csv(&[]), "Project ID,Project Name,Total Hours\n");
    }

    #[tokio::test]
    async fn test_export_opens_written_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("summary.csv");
        let expected = path.clone();
        let mut viewer = MockViewer::new();
        viewer
            .expect_open()
            .withf(move |opened| opened.to_path_buf() == expected)
            .times(1)
            .returning(|_| Ok(()));

        export_summary(&[SummaryRow::new("A1", "Alpha", 3600)], &path, Some(&viewer)).await?;

        assert_eq!(
            std::fs::read_to_string(&path)?,
            "Project ID,Project Name,Total Hours\nA1,Alpha,1.00\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_export_without_viewer() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("summary.csv");
        export_summary(&[], &path, None).await?;
        assert!(path.exists());
        Ok(())
    }
}
