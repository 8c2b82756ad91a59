pub mod client;
pub mod schema;
pub mod types;
pub mod util;

pub use client::OpenAi;
pub use schema::StructuredOutput;
pub use util::{parse_json_content, truncate_to_char_boundary};
