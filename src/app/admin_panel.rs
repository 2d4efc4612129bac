use crate::core::admin::{AdminReport, AttendanceSummary};
use crate::domain::ports::SubmissionStore;
use crate::utils::error::{GuestBookError, Result};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminFormat {
    Table,
    Csv,
}

/// Gate for the admin panel. Without a configured token the panel stays open.
pub fn authorize(configured: Option<&str>, provided: Option<&str>) -> Result<()> {
    match configured {
        None => {
            tracing::warn!("⚠️ Admin panel has no token configured, access is open");
            Ok(())
        }
        Some(expected) if provided == Some(expected) => Ok(()),
        Some(_) => Err(GuestBookError::AccessDenied {
            message: if provided.is_some() {
                "admin token does not match".to_string()
            } else {
                "admin token required".to_string()
            },
        }),
    }
}

pub async fn run_admin_panel<W: Write>(
    store: &dyn SubmissionStore,
    format: AdminFormat,
    output: &mut W,
) -> Result<AttendanceSummary> {
    let report = AdminReport::from_store(store).await?;
    let summary = report.summary();

    match format {
        AdminFormat::Csv => write!(output, "{}", report.to_csv()?)?,
        AdminFormat::Table => {
            writeln!(output, "Data Buku Tamu")?;
            if report.responses().is_empty() {
                writeln!(output, "Belum ada ucapan.")?;
            } else {
                writeln!(output, "{}", report.render_table())?;
                writeln!(output)?;
                writeln!(
                    output,
                    "Total {} ucapan: {} hadir ({} orang), {} tidak hadir",
                    summary.total_responses,
                    summary.attending,
                    summary.expected_guests,
                    summary.not_attending
                )?;
            }
        }
    }

    tracing::info!("Listed {} guest book entries", summary.total_responses);
    Ok(summary)
}
