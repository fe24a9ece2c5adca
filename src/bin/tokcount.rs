//! tokcount CLI binary.
//!
//! Chat-message token counting for OpenAI models.
//!
//! # Commands
//!
//! - `count` - Count tokens for one message or a JSON message file
//! - `encode` - Encode text and print token ids
//! - `models` - List snapshots, aliases and families
//! - `server` - Start the HTTP tokenizer server

use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokcount::{
    config::Config,
    encoding::{encoding_names, Encoding},
    server::{serve, AppState, ServerConfig, TokenizerRequest},
    Message, TokenCounter, VERSION,
};

#[derive(Parser)]
#[command(name = "tokcount")]
#[command(version = VERSION)]
#[command(about = "Count chat-message tokens for OpenAI models", long_about = None)]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count tokens for one message, or for a JSON message file
    Count {
        /// Model name
        #[arg(short, long)]
        model: String,

        /// Message content (or - for stdin)
        content: Option<String>,

        /// Message role
        #[arg(short, long, default_value = "user")]
        role: String,

        /// Participant name
        #[arg(short, long)]
        name: Option<String>,

        /// JSON file holding a message object or an array of messages
        #[arg(short, long, conflicts_with_all = ["content", "role", "name"])]
        file: Option<PathBuf>,
    },

    /// Encode text and print its token ids
    Encode {
        /// Text to encode (or - for stdin)
        input: Option<String>,

        /// Model name (resolved to its encoding)
        #[arg(short, long, conflicts_with = "encoding")]
        model: Option<String>,

        /// Encoding name
        #[arg(short, long)]
        encoding: Option<String>,

        /// Treat special-token text as special tokens
        #[arg(long)]
        allow_special: bool,

        /// Print only the token count
        #[arg(long)]
        count_only: bool,
    },

    /// List supported snapshots, aliases and families
    Models {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP tokenizer server
    Server {
        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Listen host
        #[arg(long)]
        host: Option<String>,

        /// Bind to all interfaces
        #[arg(long)]
        bind_all: bool,

        /// Emit JSON log lines
        #[arg(long)]
        json_logs: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let json_logs = matches!(cli.command, Commands::Server { json_logs: true, .. });
    init_logging(cli.verbose, json_logs);

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        Commands::Count {
            model,
            content,
            role,
            name,
            file,
        } => cmd_count(&config, &model, content, role, name, file),

        Commands::Encode {
            input,
            model,
            encoding,
            allow_special,
            count_only,
        } => cmd_encode(&config, input, model, encoding, allow_special, count_only),

        Commands::Models { json } => cmd_models(&config, json),

        Commands::Server {
            port,
            host,
            bind_all,
            ..
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config, bind_all)
        },
    }
}

fn init_logging(verbose: bool, json: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    // Logs go to stderr so command output stays pipeable.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Runtime::new()?)
}

fn cmd_count(
    config: &Config,
    model: &str,
    content: Option<String>,
    role: String,
    name: Option<String>,
    file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let messages = if let Some(path) = file {
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let request: TokenizerRequest = serde_json::from_str(&json)
            .context("Expected a message object or an array of messages")?;
        request.into_messages()
    } else {
        let content = read_input(content)?;
        let message = Message::new(role, content);
        vec![match name {
            Some(name) => message.with_name(name),
            None => message,
        }]
    };

    let counter = TokenCounter::from_config(config)?;
    let total = runtime()?.block_on(counter.count_tokens(&messages, model))?;

    println!("{total}");
    Ok(())
}

fn cmd_encode(
    config: &Config,
    input: Option<String>,
    model: Option<String>,
    encoding: Option<String>,
    allow_special: bool,
    count_only: bool,
) -> anyhow::Result<()> {
    let text = read_input(input)?;
    let counter = TokenCounter::from_config(config)?;

    let encoding: Arc<Encoding> = runtime()?.block_on(async {
        match (model, encoding) {
            (Some(model), _) => counter.encoding_for_model(&model).await,
            (None, Some(name)) => counter.store().load(&name).await,
            (None, None) => counter.store().load("cl100k_base").await,
        }
    })?;

    let tokens = if allow_special {
        encoding.encode_with_special_tokens(&text)?
    } else {
        encoding.encode(&text)?
    };

    if count_only {
        println!("{}", tokens.len());
    } else {
        println!("{}", serde_json::to_string(&tokens)?);
    }
    Ok(())
}

fn cmd_models(config: &Config, json: bool) -> anyhow::Result<()> {
    let counter = TokenCounter::from_config(config)?;
    let resolver = counter.resolver();
    let framing = counter.framing();

    if json {
        let snapshots: Vec<_> = framing
            .snapshots()
            .into_iter()
            .map(|(name, rule)| {
                serde_json::json!({
                    "name": name,
                    "encoding": resolver.encoding_for(name).ok(),
                    "tokens_per_message": rule.tokens_per_message,
                    "tokens_per_name": rule.tokens_per_name,
                })
            })
            .collect();
        let aliases: Vec<_> = resolver
            .aliases()
            .into_iter()
            .map(|(alias, snapshot)| serde_json::json!({"alias": alias, "snapshot": snapshot}))
            .collect();
        let output = serde_json::json!({
            "encodings": encoding_names().collect::<Vec<_>>(),
            "reply_priming_tokens": framing.reply_priming_tokens(),
            "snapshots": snapshots,
            "aliases": aliases,
            "families": resolver.families(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Snapshots (reply priming: {} tokens):", framing.reply_priming_tokens());
    println!();
    println!("{:<28} {:<14} {:>8} {:>6}", "SNAPSHOT", "ENCODING", "PER MSG", "NAME");
    println!("{}", "-".repeat(60));
    for (name, rule) in framing.snapshots() {
        println!(
            "{:<28} {:<14} {:>8} {:>6}",
            name,
            resolver.encoding_for(name).unwrap_or("-"),
            rule.tokens_per_message,
            rule.tokens_per_name
        );
    }

    println!();
    println!("Aliases:");
    for (alias, snapshot) in resolver.aliases() {
        println!("  {alias:<26} -> {snapshot}");
    }

    println!();
    println!("Families (name contains pattern, first match wins):");
    for family in resolver.families() {
        println!("  {:<26} -> {}", family.glob(), family.snapshot);
    }

    Ok(())
}

fn cmd_server(config: &Config, bind_all: bool) -> anyhow::Result<()> {
    let mut server_config = ServerConfig::from_section(&config.server)?;
    if bind_all {
        server_config = server_config.bind_all();
    }

    let counter = TokenCounter::from_config(config)?;

    tracing::info!("Starting tokcount server on {}", server_config.addr);
    tracing::info!("Vocabulary source: {}", counter.store().source());

    let state = Arc::new(AppState::new(server_config, counter));
    runtime()?.block_on(serve(state))?;
    Ok(())
}

fn read_input(input: Option<String>) -> anyhow::Result<String> {
    match input.filter(|s| s != "-") {
        Some(s) => Ok(s),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        },
    }
}
