use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rink_contracts::events::{new_session_id, EventWriter};
use rink_contracts::history::GeneratedResult;
use rink_contracts::palette::{generate_palette, ColorSlots, DEFAULT_COLOR_COUNT};
use rink_contracts::params::{
    join_colors, DesignParams, ParamsError, ReferenceImage, RenderMode,
};
use rink_contracts::studio::{parse_command, unescape_text, StudioCommand, STUDIO_COMMANDS};
use rink_contracts::styles::StyleCatalog;
use rink_engine::download::save_png;
use rink_engine::{compile, DesignEngine, EngineConfig, StudioSession};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "rink", version, about = "Hockey sports-print design studio")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the style catalog.
    Styles,
    /// Print a random sports palette.
    Palette(PaletteArgs),
    /// Print the prompt a design would send, without calling any service.
    Compile(CompileArgs),
    /// Generate one design and save it as PNG.
    Generate(GenerateArgs),
    /// Interactive studio shell.
    Studio(StudioArgs),
}

#[derive(Debug, Parser)]
struct PaletteArgs {
    #[arg(long, default_value_t = DEFAULT_COLOR_COUNT)]
    count: usize,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Args)]
struct DesignArgs {
    /// Subject text; `\n` starts a new line.
    #[arg(long)]
    text: String,
    /// Comma-separated hex colors, first is dominant.
    #[arg(long, conflicts_with = "count")]
    colors: Option<String>,
    /// Generate a random palette with this many colors.
    #[arg(long)]
    count: Option<usize>,
    /// Style number, label or name.
    #[arg(long, default_value = "25")]
    style: String,
    #[arg(long, default_value = "2D")]
    mode: String,
    #[arg(long)]
    reference: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Parser)]
struct CompileArgs {
    #[command(flatten)]
    design: DesignArgs,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct EngineArgs {
    #[arg(long, default_value = "gemini", value_parser = ["gemini", "dryrun"])]
    provider: String,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    events: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[command(flatten)]
    design: DesignArgs,
    #[command(flatten)]
    engine: EngineArgs,
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

#[derive(Debug, Parser)]
struct StudioArgs {
    #[command(flatten)]
    engine: EngineArgs,
    /// Download directory.
    #[arg(long, default_value = ".")]
    out: PathBuf,
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("rink error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Styles => {
            print_styles();
            Ok(0)
        }
        Command::Palette(args) => {
            let mut rng = seeded_rng(args.seed);
            println!("{}", join_colors(&generate_palette(args.count, &mut rng)));
            Ok(0)
        }
        Command::Compile(args) => run_compile(args),
        Command::Generate(args) => run_generate(args),
        Command::Studio(args) => {
            run_studio(args)?;
            Ok(0)
        }
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn build_params(args: &DesignArgs) -> Result<DesignParams> {
    let mut rng = seeded_rng(args.seed);
    let colors = match (&args.colors, args.count) {
        (Some(colors), _) => colors.trim().to_string(),
        (None, Some(count)) => join_colors(&generate_palette(count, &mut rng)),
        (None, None) => ColorSlots::default().colors_string(),
    };
    let style = StyleCatalog::global()
        .resolve(&args.style)
        .ok_or_else(|| ParamsError::UnknownStyle(args.style.trim().to_string()))?;
    let mode = args.mode.parse::<RenderMode>()?;
    let reference_image = match &args.reference {
        Some(path) => Some(ReferenceImage::from_path(path)?),
        None => None,
    };
    let params = DesignParams {
        text: unescape_text(&args.text),
        colors,
        style,
        mode,
        reference_image,
        ..DesignParams::default()
    };
    params.validate()?;
    Ok(params)
}

fn open_engine(args: &EngineArgs) -> Result<DesignEngine> {
    let mut config = EngineConfig::from_env();
    if let Some(model) = args.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        config.image_model = model.to_string();
    }
    if args.provider == "gemini" && !config.has_credential() {
        eprintln!(
            "warning: no API key found in {}; generation will fail until one is set",
            EngineConfig::credential_env_vars().join(", ")
        );
    }
    let events = match &args.events {
        Some(path) => EventWriter::new(path, new_session_id()),
        None => EventWriter::disabled(),
    };
    DesignEngine::new(&config, &args.provider, events)
}

fn run_compile(args: CompileArgs) -> Result<i32> {
    let params = build_params(&args.design)?;
    let compiled = compile(&params);
    if args.json {
        let attachment = compiled.attachment.as_ref().map(|attachment| {
            json!({
                "mime_type": attachment.mime_type,
                "bytes": attachment.bytes.len(),
            })
        });
        let payload = json!({
            "prompt": compiled.prompt,
            "colors": params.colors,
            "style": params.style.label(),
            "mode": params.mode.as_str(),
            "attachment": attachment,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(0);
    }
    println!("{}", compiled.prompt);
    if let Some(attachment) = &compiled.attachment {
        eprintln!(
            "(attachment: {} bytes, {})",
            attachment.bytes.len(),
            attachment.mime_type
        );
    }
    Ok(0)
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let params = build_params(&args.design)?;
    let engine = open_engine(&args.engine)?;
    let result = engine.submit(&params)?;
    let path = save_png(&result, &args.out)?;
    println!("Generated {} ({})", result.id, params.style.label());
    println!("Saved {}", path.display());
    Ok(0)
}

fn run_studio(args: StudioArgs) -> Result<()> {
    let engine = open_engine(&args.engine)?;
    let mut session = match args.seed {
        Some(seed) => StudioSession::with_seed(engine, seed),
        None => StudioSession::new(engine),
    };

    let stdin = io::stdin();
    let mut line = String::new();

    println!(
        "Rink studio started ({} / {}). Type /help for commands.",
        session.engine().provider_name(),
        session.engine().model()
    );

    loop {
        if let Some(message) = session.error() {
            println!("[error] {message} (/dismiss to clear)");
        }
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        match parse_command(input) {
            StudioCommand::Noop => continue,
            StudioCommand::Quit => break,
            command => handle_command(&mut session, command, &args.out),
        }
    }
    Ok(())
}

fn handle_command(session: &mut StudioSession, command: StudioCommand, out_dir: &Path) {
    match command {
        StudioCommand::Noop | StudioCommand::Quit => {}
        StudioCommand::SetText(text) => {
            session.set_text(&text);
            println!("Text set ({} line(s))", session.params().text_lines().len());
        }
        StudioCommand::SetColors(colors) => match session.set_colors(&colors) {
            Ok(()) => println!("Colors: {}", session.params().colors),
            Err(err) => println!("{err}"),
        },
        StudioCommand::SetCount(count) => {
            let count = session.set_count(count);
            println!("Using {count} color(s): {}", session.params().colors);
        }
        StudioCommand::SetSlot { index, color } => {
            if session.set_slot(index, &color) {
                println!("Colors: {}", session.params().colors);
            } else {
                println!("/slot index must be between 1 and {}", session.slots().slots().len());
            }
        }
        StudioCommand::AutoPalette => {
            let palette = session.auto_palette();
            println!("Palette: {}", join_colors(&palette));
        }
        StudioCommand::SetStyle(style) => match session.set_style(&style) {
            Ok(style) => println!("Style: {style}"),
            Err(err) => println!("{err}"),
        },
        StudioCommand::SetMode(mode) => match session.set_mode(&mode) {
            Ok(mode) => println!("Mode: {mode}"),
            Err(err) => println!("{err}"),
        },
        StudioCommand::SetReference(path) => match session.set_reference_path(&path) {
            Ok(()) => println!("Reference image set to {}", path.display()),
            Err(err) => println!("Reference image failed: {err:#}"),
        },
        StudioCommand::ClearReference => {
            session.clear_reference();
            println!("Reference image cleared");
        }
        StudioCommand::Generate => {
            if let Err(err) = session.params().validate() {
                println!("Cannot generate yet: {err}");
                return;
            }
            println!("Generating...");
            if let Ok(result) = session.generate() {
                print_result(result);
            }
        }
        StudioCommand::Randomize => {
            if let Err(err) = session.params().validate() {
                println!("Cannot generate yet: {err}");
                return;
            }
            println!("Generating...");
            if let Ok(result) = session.randomize() {
                print_result(result);
            }
        }
        StudioCommand::History => print_history(session),
        StudioCommand::Select(id) => match session.select(&id) {
            Some(result) => print_result(result),
            None => println!("No result with id {id}"),
        },
        StudioCommand::Delete(id) => match session.delete(&id) {
            Some(removed) => println!("Deleted {}", removed.id),
            None => println!("No result with id {id}"),
        },
        StudioCommand::Show => match session.displayed() {
            Some(result) => {
                print_result(result);
                println!("{}", result.prompt);
            }
            None => println!("Nothing displayed"),
        },
        StudioCommand::Download(dir) => {
            let dir = dir.unwrap_or_else(|| out_dir.to_path_buf());
            match session.download(None, &dir) {
                Ok(path) => println!("Saved {}", path.display()),
                Err(err) => println!("Download failed: {err:#}"),
            }
        }
        StudioCommand::Copy => match session.copy_prompt() {
            Some(prompt) => match copy_to_clipboard(prompt) {
                Ok(()) => println!("Prompt copied to clipboard"),
                Err(err) => {
                    eprintln!("{err:#}");
                    println!("{prompt}");
                }
            },
            None => println!("Nothing displayed"),
        },
        StudioCommand::Diff { from, to } => match session.prompt_diff(&from, &to) {
            Some(lines) => {
                for line in lines {
                    println!("{line}");
                }
            }
            None => println!("/diff needs two result ids from /history"),
        },
        StudioCommand::Dismiss => session.dismiss_error(),
        StudioCommand::Params => print_params(session),
        StudioCommand::Styles => print_styles(),
        StudioCommand::Help => {
            for spec in STUDIO_COMMANDS {
                println!("  {:<28} {}", spec.usage, spec.summary);
            }
        }
        StudioCommand::Invalid { message, .. } => println!("{message}"),
        StudioCommand::Unknown { command, .. } => {
            println!("Unknown command /{command}. Type /help for commands.")
        }
    }
}

fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("clipboard unavailable")?;
    clipboard
        .set_text(text.to_string())
        .context("failed to write clipboard")?;
    Ok(())
}

fn print_styles() {
    for style in StyleCatalog::global().iter() {
        println!("{style}");
    }
}

fn print_result(result: &GeneratedResult) {
    println!(
        "[{}] {} | {} | {} | {}",
        result.id,
        result.params.style,
        result.params.mode,
        result.params.colors,
        result.created_at_iso()
    );
}

fn print_history(session: &StudioSession) {
    let history = session.history();
    if history.is_empty() {
        println!("History is empty");
        return;
    }
    let displayed = history.displayed_id();
    for result in history.entries() {
        let marker = if Some(result.id.as_str()) == displayed { "*" } else { " " };
        print!("{marker} ");
        print_result(result);
    }
}

fn print_params(session: &StudioSession) {
    let params = session.params();
    println!("Text: {:?}", params.text);
    println!("Sport: {} ({})", params.sport.as_str(), params.sport.theme());
    println!(
        "Colors ({} of {}): {}",
        session.slots().count(),
        session.slots().slots().len(),
        params.colors
    );
    println!("Style: {}", params.style);
    println!("Mode: {}", params.mode);
    match &params.reference_image {
        Some(reference) => println!("Reference: {}", reference.mime_type()),
        None => println!("Reference: none"),
    }
    println!(
        "Ready: {}",
        if session.can_generate() { "yes" } else { "no" }
    );
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use rink_contracts::params::RenderMode;

    use super::{build_params, Cli, Command};

    fn design_args(argv: &[&str]) -> anyhow::Result<super::DesignArgs> {
        let mut full = vec!["rink", "compile"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full)?.command {
            Command::Compile(args) => Ok(args.design),
            other => anyhow::bail!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn compile_args_build_validated_params() -> anyhow::Result<()> {
        let args = design_args(&[
            "--text",
            "CITY\\nHOCKEY",
            "--colors",
            "#EF4444, #000000",
            "--style",
            "25. Modern Athletic",
            "--mode",
            "2d",
        ])?;
        let params = build_params(&args)?;
        assert_eq!(params.text, "CITY\nHOCKEY");
        assert_eq!(params.colors, "#EF4444, #000000");
        assert_eq!(params.style.number(), 25);
        assert_eq!(params.mode, RenderMode::TwoD);
        Ok(())
    }

    #[test]
    fn count_generates_seeded_palette() -> anyhow::Result<()> {
        let args = design_args(&["--text", "X", "--count", "4", "--seed", "3"])?;
        let first = build_params(&args)?;
        let second = build_params(&args)?;
        assert_eq!(first.color_list().len(), 4);
        assert_eq!(first.colors, second.colors);
        Ok(())
    }

    #[test]
    fn bad_inputs_are_rejected() -> anyhow::Result<()> {
        assert!(build_params(&design_args(&["--text", "  "])?).is_err());
        assert!(build_params(&design_args(&["--text", "X", "--style", "200"])?).is_err());
        assert!(build_params(&design_args(&["--text", "X", "--mode", "4D"])?).is_err());
        assert!(design_args(&["--text", "X", "--colors", "#fff", "--count", "2"]).is_err());
        Ok(())
    }
}
