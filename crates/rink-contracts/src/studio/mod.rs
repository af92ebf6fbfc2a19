mod command_registry;
mod intent_parser;

pub use command_registry::{CommandSpec, STUDIO_COMMANDS};
pub use intent_parser::{parse_command, unescape_text, StudioCommand};
