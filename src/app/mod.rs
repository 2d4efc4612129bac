// Application layer: the two guest book views on top of the core workflow.

pub mod admin_panel;
pub mod guest_session;
