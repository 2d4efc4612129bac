use crate::core::workflow::{
    GuestState, GuestView, GuestWorkflow, LOADING_MESSAGE, THANK_YOU_NOTE,
};
use crate::domain::model::{trim_name, Attendance, GuestResponse, ResponseForm};
use crate::utils::error::{GuestBookError, Result};
use std::io::{BufRead, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Submitted(GuestResponse),
    /// Input ended before a response was stored.
    Abandoned,
    /// The guest list never loaded.
    Unavailable,
}

/// Line-oriented guest form. Drives `workflow` from `input` and renders each
/// step to `output`; the workflow must have finished loading.
pub async fn run_guest_session<R: BufRead, W: Write>(
    workflow: &mut GuestWorkflow,
    input: &mut R,
    output: &mut W,
) -> Result<SessionOutcome> {
    render(workflow.view(), output)?;
    if !workflow.state().is_ready() {
        return Ok(SessionOutcome::Unavailable);
    }

    loop {
        write!(output, "Masukkan Nama: ")?;
        output.flush()?;
        let Some(name) = read_line(input)? else {
            return Ok(SessionOutcome::Abandoned);
        };

        workflow.edit_name(&name)?;
        workflow.check()?;
        render(workflow.view(), output)?;

        if workflow.state() != &(GuestState::Checked { valid: true }) {
            continue;
        }

        // 表單送出失敗時留在表單，讓來賓重試
        loop {
            let Some(form) = read_form(input, output)? else {
                return Ok(SessionOutcome::Abandoned);
            };

            match workflow.submit(form).await {
                Ok(response) => {
                    render(workflow.view(), output)?;
                    return Ok(SessionOutcome::Submitted(response));
                }
                Err(e @ GuestBookError::Workflow(_)) | Err(e @ GuestBookError::Store(_)) => {
                    tracing::warn!("Submission not stored: {}", e);
                    writeln!(output, "{}", e.user_friendly_message())?;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

pub fn render<W: Write>(view: GuestView<'_>, output: &mut W) -> std::io::Result<()> {
    match view {
        GuestView::LoadingIndicator => writeln!(output, "{}", LOADING_MESSAGE),
        GuestView::ErrorMessage(message) => writeln!(output, "{}", message),
        GuestView::NameEntry {
            notice: Some(notice),
            ..
        } => writeln!(output, "{}", notice),
        GuestView::NameEntry {
            form_enabled: true,
            name,
            ..
        } => writeln!(output, "Selamat datang, {}! Silakan isi konfirmasi.", trim_name(name)),
        GuestView::NameEntry { .. } => Ok(()),
        GuestView::ThankYou { name } => {
            writeln!(output, "Terima kasih, {}!", name)?;
            writeln!(output, "{}", THANK_YOU_NOTE)
        }
    }
}

fn read_form<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Option<ResponseForm>> {
    let defaults = ResponseForm::default();

    let attendance = loop {
        write!(output, "Konfirmasi Kehadiran (hadir/tidak) [hadir]: ")?;
        output.flush()?;
        let Some(answer) = read_line(input)? else {
            return Ok(None);
        };
        if answer.trim().is_empty() {
            break defaults.attendance;
        }
        match Attendance::parse(&answer) {
            Some(attendance) => break attendance,
            None => writeln!(output, "Pilih 'hadir' atau 'tidak'.")?,
        }
    };

    let guest_count = loop {
        write!(output, "Jumlah Orang Hadir [{}]: ", defaults.guest_count)?;
        output.flush()?;
        let Some(answer) = read_line(input)? else {
            return Ok(None);
        };
        if answer.trim().is_empty() {
            break defaults.guest_count;
        }
        match answer.trim().parse::<u32>() {
            Ok(count) => break count,
            Err(_) => writeln!(output, "Masukkan angka.")?,
        }
    };

    write!(output, "Ucapan & Doa: ")?;
    output.flush()?;
    let Some(message) = read_line(input)? else {
        return Ok(None);
    };

    Ok(Some(ResponseForm {
        attendance,
        guest_count,
        message: message.trim().to_string(),
    }))
}

fn read_line<R: BufRead>(input: &mut R) -> std::io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryStorage;
    use crate::core::store::JsonSubmissionStore;
    use crate::core::verifier::GuestVerifier;
    use crate::core::workflow::{LOAD_FAILED_MESSAGE, NOT_REGISTERED_MESSAGE};
    use crate::domain::ports::SubmissionStore;
    use crate::utils::error::LoadError;
    use std::io::Cursor;
    use std::sync::Arc;

    fn session_parts() -> (Arc<dyn SubmissionStore>, GuestWorkflow) {
        let store: Arc<dyn SubmissionStore> =
            Arc::new(JsonSubmissionStore::new(MemoryStorage::new()));
        let records = serde_json::json!([{"Nama": "Alice"}, {"Nama": "Bob"}]);
        let verifier = Arc::new(GuestVerifier::from_records(&records, "Nama").unwrap());
        let workflow = GuestWorkflow::with_verifier(store.clone(), verifier);
        (store, workflow)
    }

    #[tokio::test]
    async fn test_full_session_after_one_wrong_name() {
        let (store, mut workflow) = session_parts();
        let mut input = Cursor::new("alice\nAlice\nhadir\n2\nCongrats!\n");
        let mut output = Vec::new();

        let outcome = run_guest_session(&mut workflow, &mut input, &mut output)
            .await
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains(NOT_REGISTERED_MESSAGE));
        assert!(text.contains("Terima kasih, Alice!"));

        let stored = store.read_all().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].guest_count, 2);
        assert_eq!(stored[0].message, "Congrats!");
        assert_eq!(outcome, SessionOutcome::Submitted(stored[0].clone()));
    }

    #[tokio::test]
    async fn test_defaults_and_reprompts() {
        let (store, mut workflow) = session_parts();
        let mut input = Cursor::new("Bob\nmungkin\n\nabc\n0\n\n\n\n\n");
        let mut output = Vec::new();

        run_guest_session(&mut workflow, &mut input, &mut output)
            .await
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Pilih 'hadir' atau 'tidak'."));
        assert!(text.contains("Masukkan angka."));
        assert!(text.contains("Jumlah orang harus antara 1 dan 20."));

        let stored = store.read_all().await.unwrap();
        assert_eq!(stored[0].attendance, Attendance::Attending);
        assert_eq!(stored[0].guest_count, 1);
        assert_eq!(stored[0].message, "");
    }

    #[tokio::test]
    async fn test_eof_abandons_without_storing() {
        let (store, mut workflow) = session_parts();
        let mut input = Cursor::new("Alice\nhadir\n");
        let mut output = Vec::new();

        let outcome = run_guest_session(&mut workflow, &mut input, &mut output)
            .await
            .unwrap();

        assert_eq!(outcome, SessionOutcome::Abandoned);
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_shows_error_only() {
        let store: Arc<dyn SubmissionStore> =
            Arc::new(JsonSubmissionStore::new(MemoryStorage::new()));
        let mut workflow = GuestWorkflow::new(store);
        let _ = workflow.finish_loading(Err(LoadError::Empty));

        let mut input = Cursor::new("Alice\n");
        let mut output = Vec::new();
        let outcome = run_guest_session(&mut workflow, &mut input, &mut output)
            .await
            .unwrap();

        assert_eq!(outcome, SessionOutcome::Unavailable);
        assert_eq!(String::from_utf8(output).unwrap(), format!("{}\n", LOAD_FAILED_MESSAGE));
    }
}
