//! Chat area: header, welcome screen, message list and input bar.
//!
//! The message list, the draft previews and the send button are also served
//! as standalone fragments so htmx can refresh them when SSE events arrive.

mod header;
mod input_area;
mod message_list;
mod welcome;

pub use header::render_header;
pub use input_area::{render_drafts, render_input_area, render_send_button};
pub use message_list::{render_message, render_message_list};
pub use welcome::render_welcome;
