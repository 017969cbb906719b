mod relay_message;
pub use relay_message::*;
