use crate::domain::model::GuestResponse;
use crate::domain::ports::SubmissionStore;
use crate::utils::error::{GuestBookError, Result};

pub const COLUMNS: [&str; 4] = ["Nama", "Kehadiran", "Jumlah", "Ucapan"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceSummary {
    pub total_responses: usize,
    pub attending: usize,
    pub not_attending: usize,
    /// Sum of guest counts over attending responses only.
    pub expected_guests: u64,
}

/// Read-only tabulation of the whole guest book.
#[derive(Debug, Clone)]
pub struct AdminReport {
    responses: Vec<GuestResponse>,
}

impl AdminReport {
    pub fn new(responses: Vec<GuestResponse>) -> Self {
        Self { responses }
    }

    pub async fn from_store(store: &dyn SubmissionStore) -> Result<Self> {
        let responses = store.read_all().await?;
        tracing::debug!("Admin report over {} responses", responses.len());
        Ok(Self::new(responses))
    }

    pub fn responses(&self) -> &[GuestResponse] {
        &self.responses
    }

    pub fn summary(&self) -> AttendanceSummary {
        self.responses
            .iter()
            .fold(AttendanceSummary::default(), |mut acc, r| {
                acc.total_responses += 1;
                if r.is_attending() {
                    acc.attending += 1;
                    acc.expected_guests += u64::from(r.guest_count);
                } else {
                    acc.not_attending += 1;
                }
                acc
            })
    }

    fn rows(&self) -> Vec<[String; 4]> {
        self.responses
            .iter()
            .map(|r| {
                [
                    r.name.clone(),
                    r.attendance.label().to_string(),
                    r.guest_count.to_string(),
                    r.message.clone(),
                ]
            })
            .collect()
    }

    /// Plain-text table, one line per response in insertion order.
    pub fn render_table(&self) -> String {
        let rows: Vec<[String; 4]> = self
            .rows()
            .into_iter()
            .map(|row| row.map(|cell| single_line(&cell)))
            .collect();

        let mut widths = COLUMNS.map(|c| c.chars().count());
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let format_row = |cells: &[String]| -> String {
            let padded: Vec<String> = cells
                .iter()
                .zip(widths.iter())
                .map(|(cell, width)| {
                    let pad = width - cell.chars().count();
                    format!("{}{}", cell, " ".repeat(pad))
                })
                .collect();
            format!("| {} |", padded.join(" | "))
        };

        let header: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
        let separator = format!(
            "|{}|",
            widths
                .iter()
                .map(|w| "-".repeat(w + 2))
                .collect::<Vec<_>>()
                .join("|")
        );

        let mut lines = vec![format_row(&header[..]), separator];
        lines.extend(rows.iter().map(|row| format_row(&row[..])));
        lines.join("\n")
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "name",
            "attendance",
            "guests",
            "message",
            "submitted_at",
        ])?;

        for r in &self.responses {
            let guests = r.guest_count.to_string();
            let submitted_at = r
                .submitted_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default();
            writer.write_record([
                r.name.as_str(),
                r.attendance.as_str(),
                guests.as_str(),
                r.message.as_str(),
                submitted_at.as_str(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| GuestBookError::IoError(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| {
            GuestBookError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }
}

fn single_line(cell: &str) -> String {
    cell.split_whitespace().collect::<Vec<_>>().join(" ")
}
