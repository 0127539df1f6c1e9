//! Interactive REPL for the GLV MCP server.
//!
//! Launch with `glv-mcp repl` to run the tools by hand.
//! Type `/help` for available commands, Tab for completion.

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};
use tokio::runtime::Handle;

use glv::{FileClient, ImageLoader, VisionClient, VisionMode};

use crate::config::ServerContext;
use crate::tools::ToolRegistry;

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/read", "Read and normalize an image: /read <path|url> [maxSide]"),
    ("/ask", "Ask the vision model: /ask <path|url> <mode> <prompt>"),
    ("/file", "Extract document content: /file <path> [prompt]"),
    ("/tools", "List available MCP tools"),
    ("/config", "Show the effective endpoint and model"),
    ("/info", "Show server capabilities and tools"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

const MODES: &[&str] = &["describe", "ocr", "qa", "detect"];

/// REPL helper for tab completion.
#[derive(Default)]
struct GlvHelper;

impl Completer for GlvHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<8} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        // Mode completion for the second /ask argument
        let words: Vec<&str> = input.split(' ').collect();
        if words[0] == "/ask" && words.len() == 3 {
            let partial = words[2];
            let start = input.len() - partial.len();
            let matches: Vec<Pair> = MODES
                .iter()
                .filter(|m| m.starts_with(partial))
                .map(|m| Pair {
                    display: m.to_string(),
                    replacement: format!("{m} "),
                })
                .collect();
            return Ok((start, matches));
        }

        Ok((pos, Vec::new()))
    }
}

impl Hinter for GlvHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for GlvHelper {}
impl Validator for GlvHelper {}
impl Helper for GlvHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Run the interactive REPL.
///
/// Blocks on line input, so call it from a blocking thread. Tool calls run on `runtime`.
pub fn run(context: ServerContext, runtime: Handle) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1mglv-mcp v{}\x1b[0m \x1b[90m\u{2014} Vision tools for AI agents\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<GlvHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(GlvHelper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".glv_mcp_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let prompt = " \x1b[36mglv>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let input = line.strip_prefix('/').unwrap_or(line);
                if input.is_empty() {
                    cmd_help();
                    continue;
                }

                let mut parts = input.splitn(2, ' ');
                let cmd = parts.next().unwrap_or("");
                let args = parts.next().unwrap_or("").trim();

                match cmd {
                    "exit" | "quit" => {
                        eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                        break;
                    }
                    "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "info" => cmd_info(),
                    "tools" => cmd_tools(),
                    "config" => cmd_config(&context),
                    "read" => runtime.block_on(cmd_read(args, &context)),
                    "ask" => runtime.block_on(cmd_ask(args, &context)),
                    "file" => runtime.block_on(cmd_file(args, &context)),
                    _ => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = std::fs::create_dir_all(hist_path.parent().unwrap_or(std::path::Path::new(".")));
    let _ = rl.save_history(&hist_path);

    Ok(())
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<8} {desc}");
    }
    eprintln!();
    eprintln!("  Modes: {}", MODES.join(", "));
    eprintln!();
}

fn cmd_info() {
    let capabilities = crate::types::InitializeResult::default_result();
    let tools = ToolRegistry::list_tools();
    eprintln!();
    eprintln!(
        "  Server:   {} v{}",
        capabilities.server_info.name, capabilities.server_info.version
    );
    eprintln!("  Protocol: {}", capabilities.protocol_version);
    eprintln!("  Tools:    {}", tools.len());
    eprintln!();
}

fn cmd_tools() {
    let tools = ToolRegistry::list_tools();
    eprintln!();
    eprintln!("  {} MCP tools available:", tools.len());
    eprintln!();
    for tool in &tools {
        let summary = tool
            .description
            .as_deref()
            .and_then(|d| d.lines().next())
            .unwrap_or("");
        eprintln!("    {:<14} {}", tool.name, summary);
    }
    eprintln!();
}

fn cmd_config(context: &ServerContext) {
    let config = context.api_config();
    eprintln!();
    eprintln!("  Endpoint:   {}", config.base_url);
    eprintln!("  Model:      {}", config.vision_model);
    eprintln!(
        "  Credential: {}",
        if config.has_credential() {
            "configured"
        } else {
            "missing"
        }
    );
    eprintln!();
}

async fn cmd_read(args: &str, context: &ServerContext) {
    let mut words = args.split_whitespace();
    let Some(reference) = words.next() else {
        eprintln!("  Usage: /read <path|url> [maxSide]");
        return;
    };
    let max_side = match words.next().map(str::parse::<u32>) {
        None => None,
        Some(Ok(side)) if side > 0 => Some(side),
        Some(_) => {
            eprintln!("  maxSide must be a positive integer");
            return;
        }
    };

    let loader = ImageLoader::new(context.http().clone());
    let result = loader.read_image(reference, max_side).await;
    match (result.image, result.error) {
        (Some(image), _) => {
            let dims = match (image.width, image.height) {
                (Some(w), Some(h)) => format!("{w}x{h}"),
                _ => "unknown".to_string(),
            };
            eprintln!();
            eprintln!("  Source:     {}", image.source);
            eprintln!("  MIME:       {}", image.mime);
            eprintln!("  Size:       {dims}");
            eprintln!("  Transcoded: {}", image.transcoded);
            eprintln!("  Data URL:   {} chars", image.data_url.len());
            eprintln!();
        }
        (None, error) => {
            eprintln!("  Read failed: {}", error.unwrap_or_default());
        }
    }
}

async fn cmd_ask(args: &str, context: &ServerContext) {
    let mut parts = args.splitn(3, ' ');
    let (Some(reference), Some(mode), Some(prompt)) = (parts.next(), parts.next(), parts.next())
    else {
        eprintln!("  Usage: /ask <path|url> <mode> <prompt>");
        return;
    };
    let mode: VisionMode = match mode.parse() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("  {e}");
            return;
        }
    };

    let client = VisionClient::new(context.http().clone(), context.api_config());
    let result = client.query(reference, prompt.trim(), mode, false).await;
    print_json(&result);
}

async fn cmd_file(args: &str, context: &ServerContext) {
    let mut parts = args.splitn(2, ' ');
    let Some(path) = parts.next().filter(|p| !p.is_empty()) else {
        eprintln!("  Usage: /file <path> [prompt]");
        return;
    };
    let prompt = parts.next().map(str::trim).filter(|p| !p.is_empty());

    let client = FileClient::new(context.http().clone(), context.api_config());
    let result = client.process_file(path, prompt).await;
    print_json(&result);
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            eprintln!();
            for line in text.lines() {
                eprintln!("  {line}");
            }
            eprintln!();
        }
        Err(e) => eprintln!("  Failed to render result: {e}"),
    }
}
