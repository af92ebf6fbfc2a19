#[derive(Clone, Copy, Debug)]
pub struct CommandSpec {
    pub command: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
}

const fn spec(command: &'static str, usage: &'static str, summary: &'static str) -> CommandSpec {
    CommandSpec {
        command,
        usage,
        summary,
    }
}

pub const STUDIO_COMMANDS: &[CommandSpec] = &[
    spec("text", "/text CITY\\nHOCKEY", "set subject text (\\n stacks lines)"),
    spec("colors", "/colors #EF4444, #000000", "set colors directly"),
    spec("count", "/count 3", "number of active color slots (1-10)"),
    spec("slot", "/slot 2 #1E3A8A", "edit one color slot"),
    spec("auto", "/auto", "auto-generate the active colors"),
    spec("style", "/style 72", "pick a style by number or name"),
    spec("mode", "/mode 3D", "2D flat vector or 3D render"),
    spec("ref", "/ref mascot.png", "attach a reference image"),
    spec("clear_ref", "/clear_ref", "drop the reference image"),
    spec("generate", "/generate", "generate with the current parameters"),
    spec("randomize", "/randomize", "random style, mode and palette, then generate"),
    spec("history", "/history", "list recent designs"),
    spec("select", "/select <id>", "display a design from history"),
    spec("delete", "/delete <id>", "remove a design from history"),
    spec("show", "/show", "describe the displayed design"),
    spec("download", "/download [dir]", "save the displayed design as PNG"),
    spec("copy", "/copy", "copy the displayed design's prompt"),
    spec("diff", "/diff <id> <id>", "diff the prompts of two designs"),
    spec("dismiss", "/dismiss", "clear the error banner"),
    spec("params", "/params", "show the current parameters"),
    spec("styles", "/styles", "list the style catalog"),
    spec("help", "/help", "show this help"),
    spec("quit", "/quit", "leave the studio"),
];

pub(crate) fn is_known(command: &str) -> bool {
    command == "exit" || STUDIO_COMMANDS.iter().any(|spec| spec.command == command)
}
