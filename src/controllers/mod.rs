//! Controllers driving the dashboard pages.

pub mod form;
pub mod list;
pub mod page;
pub mod stats;

pub use form::{FormController, FormState, ImagePreview, ImageRef};
pub use list::{Confirm, DeleteOutcome, ListController, LoadTicket};
pub use page::AdminPage;
pub use stats::OrderSummary;
