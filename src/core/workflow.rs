use crate::core::verifier::{CancelSignal, GuestVerifier};
use crate::domain::model::{trim_name, GuestResponse, ResponseForm};
use crate::domain::ports::{GuestListProvider, SubmissionStore};
use crate::utils::error::{GuestBookError, LoadError, Result, WorkflowError};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const LOADING_MESSAGE: &str = "Memuat daftar tamu...";
pub const LOAD_FAILED_MESSAGE: &str = "Gagal memuat daftar tamu. Silakan coba lagi nanti.";
pub const NOT_REGISTERED_MESSAGE: &str = "Nama tidak terdaftar dalam undangan.";
pub const THANK_YOU_NOTE: &str = "Doa dan kehadiranmu sangat berarti bagi kami 💖";

pub const DEFAULT_MAX_GUESTS: u32 = 20;
pub const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestState {
    Loading,
    /// Terminal: the guest list could not be loaded.
    Failed,
    AwaitingName,
    Checked { valid: bool },
    /// Terminal: the response has been stored.
    Submitted,
}

impl GuestState {
    pub fn is_ready(&self) -> bool {
        matches!(
            self,
            GuestState::AwaitingName | GuestState::Checked { .. } | GuestState::Submitted
        )
    }
}

impl fmt::Display for GuestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuestState::Loading => f.write_str("loading the guest list"),
            GuestState::Failed => f.write_str("the guest list failed to load"),
            GuestState::AwaitingName => f.write_str("awaiting a name"),
            GuestState::Checked { valid: true } => f.write_str("checked (invited)"),
            GuestState::Checked { valid: false } => f.write_str("checked (not invited)"),
            GuestState::Submitted => f.write_str("already submitted"),
        }
    }
}

/// What the guest-facing view should show for the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestView<'a> {
    LoadingIndicator,
    ErrorMessage(&'static str),
    NameEntry {
        name: &'a str,
        notice: Option<&'static str>,
        form_enabled: bool,
    },
    ThankYou {
        name: &'a str,
    },
}

/// One guest's pass through the guest book: load list, check name, submit.
pub struct GuestWorkflow {
    store: Arc<dyn SubmissionStore>,
    verifier: Option<Arc<GuestVerifier>>,
    state: GuestState,
    name_input: String,
    max_guests: u32,
}

impl GuestWorkflow {
    /// A session still waiting for its guest list.
    pub fn new(store: Arc<dyn SubmissionStore>) -> Self {
        Self {
            store,
            verifier: None,
            state: GuestState::Loading,
            name_input: String::new(),
            max_guests: DEFAULT_MAX_GUESTS,
        }
    }

    /// A session over an already loaded list, starting at `AwaitingName`.
    pub fn with_verifier(store: Arc<dyn SubmissionStore>, verifier: Arc<GuestVerifier>) -> Self {
        let mut workflow = Self::new(store);
        workflow.verifier = Some(verifier);
        workflow.state = GuestState::AwaitingName;
        workflow
    }

    pub fn with_max_guests(mut self, max_guests: u32) -> Self {
        self.max_guests = max_guests;
        self
    }

    pub fn state(&self) -> &GuestState {
        &self.state
    }

    pub fn name_input(&self) -> &str {
        &self.name_input
    }

    pub fn verifier(&self) -> Option<&Arc<GuestVerifier>> {
        self.verifier.as_ref()
    }

    /// Loads the list through `provider` and settles the loading state.
    pub async fn begin_loading<P>(
        &mut self,
        provider: &P,
        name_field: &str,
        timeout: Duration,
        cancel: &mut CancelSignal,
    ) -> Result<()>
    where
        P: GuestListProvider + ?Sized,
    {
        self.ensure(&[GuestState::Loading], "load")?;
        let result = GuestVerifier::load_within(provider, name_field, timeout, cancel).await;
        self.finish_loading(result.map(Arc::new))?;
        Ok(())
    }

    /// Applies a finished load. Any error leaves the session failed for good.
    pub fn finish_loading(
        &mut self,
        result: std::result::Result<Arc<GuestVerifier>, LoadError>,
    ) -> std::result::Result<(), LoadError> {
        if self.state != GuestState::Loading {
            tracing::warn!("Ignoring load result while {}", self.state);
            return Ok(());
        }

        match result {
            Ok(verifier) => {
                self.verifier = Some(verifier);
                self.state = GuestState::AwaitingName;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Gagal memuat daftar tamu: {}", e);
                self.state = GuestState::Failed;
                Err(e)
            }
        }
    }

    /// Records what the guest typed. A changed name must be checked again.
    pub fn edit_name(&mut self, input: &str) -> std::result::Result<(), WorkflowError> {
        self.ensure_accepting_input("edit_name")?;
        if self.name_input != input {
            self.name_input = input.to_string();
            self.state = GuestState::AwaitingName;
        }
        Ok(())
    }

    /// The explicit "Cek Undangan" action. Returns whether the name matched.
    pub fn check(&mut self) -> std::result::Result<bool, WorkflowError> {
        self.ensure_accepting_input("check")?;
        let valid = self
            .verifier
            .as_ref()
            .is_some_and(|v| v.is_invited(&self.name_input));

        tracing::debug!("Checked '{}': invited = {}", trim_name(&self.name_input), valid);
        self.state = GuestState::Checked { valid };
        Ok(valid)
    }

    /// Stores the guest's response. Only allowed right after a positive check.
    ///
    /// When the store rejects the append the session stays checked, so the
    /// guest sees the error and can try again.
    pub async fn submit(&mut self, form: ResponseForm) -> Result<GuestResponse> {
        self.ensure(&[GuestState::Checked { valid: true }], "submit")?;
        self.validate_form(&form)?;

        let name = self
            .verifier
            .as_ref()
            .and_then(|v| v.matched_name(&self.name_input))
            .cloned()
            .ok_or_else(|| WorkflowError::InvalidState {
                action: "submit",
                state: self.state.to_string(),
            })?;

        let response = GuestResponse::new(&name, form.attendance, form.guest_count, form.message)
            .with_timestamp(Utc::now());

        if let Err(e) = self.store.append(response.clone()).await {
            tracing::error!("❌ Failed to store response from '{}': {}", name, e);
            return Err(GuestBookError::Store(e));
        }

        tracing::info!(
            "✅ Stored response from '{}' ({}, {} guests)",
            name,
            response.attendance.label(),
            response.guest_count
        );
        self.name_input = name.as_str().to_string();
        self.state = GuestState::Submitted;
        Ok(response)
    }

    pub fn view(&self) -> GuestView<'_> {
        match &self.state {
            GuestState::Loading => GuestView::LoadingIndicator,
            GuestState::Failed => GuestView::ErrorMessage(LOAD_FAILED_MESSAGE),
            GuestState::Submitted => GuestView::ThankYou {
                name: &self.name_input,
            },
            GuestState::AwaitingName => GuestView::NameEntry {
                name: &self.name_input,
                notice: None,
                form_enabled: false,
            },
            GuestState::Checked { valid } => GuestView::NameEntry {
                name: &self.name_input,
                // 空白名字不顯示提示
                notice: (!valid && !self.name_input.is_empty()).then_some(NOT_REGISTERED_MESSAGE),
                form_enabled: *valid,
            },
        }
    }

    fn validate_form(&self, form: &ResponseForm) -> std::result::Result<(), WorkflowError> {
        if form.guest_count < 1 || form.guest_count > self.max_guests {
            return Err(WorkflowError::InvalidForm {
                field: "guests".to_string(),
                reason: format!("Jumlah orang harus antara 1 dan {}.", self.max_guests),
            });
        }
        if form.message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(WorkflowError::InvalidForm {
                field: "message".to_string(),
                reason: format!("Ucapan maksimal {} karakter.", MAX_MESSAGE_CHARS),
            });
        }
        Ok(())
    }

    fn ensure_accepting_input(
        &self,
        action: &'static str,
    ) -> std::result::Result<(), WorkflowError> {
        match self.state {
            GuestState::AwaitingName | GuestState::Checked { .. } => Ok(()),
            _ => Err(WorkflowError::InvalidState {
                action,
                state: self.state.to_string(),
            }),
        }
    }

    fn ensure(
        &self,
        allowed: &[GuestState],
        action: &'static str,
    ) -> std::result::Result<(), WorkflowError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(WorkflowError::InvalidState {
                action,
                state: self.state.to_string(),
            })
        }
    }
}
