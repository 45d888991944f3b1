pub mod command;
pub mod file;
pub mod http;
pub mod parse;

pub use command::{CmdOutput, run_cmd_in_dir};
pub use file::write_file;
pub use http::{HttpReply, http_post_json};
pub use parse::{extract_json, strip_code_fences};
