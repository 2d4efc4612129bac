pub mod admin;
pub mod store;
pub mod verifier;
pub mod workflow;

pub use crate::domain::model::{Attendance, GuestResponse, InvitedName, ResponseForm};
pub use crate::domain::ports::{ConfigProvider, GuestListProvider, Storage, SubmissionStore};
pub use crate::utils::error::Result;
