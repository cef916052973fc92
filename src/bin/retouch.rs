//! CLI for Retouch - edit images with natural-language instructions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use retouch::{
    encode, ClientConfig, FileSource, GeminiModel, Session, Status, TransformationClient,
    TransformationClientBuilder, TransformedImage,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "retouch")]
#[command(about = "Edit an image with a text instruction via Gemini image generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform an image according to a prompt
    Edit(EditArgs),

    /// Verify the API key and model are usable
    Check(ClientArgs),

    /// List available models
    Models,
}

#[derive(Args)]
struct ClientArgs {
    /// API key (falls back to GOOGLE_API_KEY, then API_KEY)
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model to use
    #[arg(short, long, value_enum, default_value = "nano-banana")]
    model: ModelArg,

    /// Request timeout in seconds (0 disables)
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// Override the API base URL
    #[arg(long, hide = true)]
    base_url: Option<String>,
}

#[derive(Args)]
struct EditArgs {
    /// Input image file
    input: PathBuf,

    /// Edit instruction
    #[arg(short, long)]
    prompt: String,

    /// Output file path (defaults to ai-generated-<timestamp>.png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Declared MIME type of the input (inferred when omitted)
    #[arg(long)]
    mime: Option<String>,

    /// Print the result as a data URL instead of only saving it
    #[arg(long)]
    data_url: bool,

    #[command(flatten)]
    client: ClientArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    NanoBanana,
    NanoBananaPro,
}

impl From<ModelArg> for GeminiModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::NanoBanana => GeminiModel::NanoBanana,
            ModelArg::NanoBananaPro => GeminiModel::NanoBananaPro,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("retouch=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Edit(args) => {
            edit_image(args, cli.json).await?;
        }
        Commands::Check(args) => {
            check(args, cli.json).await?;
        }
        Commands::Models => {
            list_models(cli.json)?;
        }
    }

    Ok(())
}

fn build_client(args: &ClientArgs) -> anyhow::Result<TransformationClient> {
    let mut config = ClientConfig::from_env();
    if let Some(key) = args.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
        config.api_key = Some(key.clone());
    }
    config.model = args.model.into();
    config.timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    if let Some(ref url) = args.base_url {
        config.base_url = url.clone();
    }
    Ok(TransformationClientBuilder::from_config(config).build()?)
}

async fn edit_image(args: EditArgs, json_output: bool) -> anyhow::Result<()> {
    // Guards run before the client exists so a bad invocation never reaches the network.
    if args.prompt.trim().is_empty() {
        anyhow::bail!("prompt must not be empty");
    }

    let source = match args.mime {
        Some(ref mime) => FileSource::with_mime_type(&args.input, mime),
        None => FileSource::new(&args.input),
    };
    let image = encode(&source)?;

    let client = build_client(&args.client)?;

    let mut session = Session::new();
    session.select_image(image);
    session.set_prompt(&args.prompt);

    let start = Instant::now();
    let dispatched = tokio::select! {
        dispatched = session.submit(&client) => dispatched,
        _ = tokio::signal::ctrl_c() => {
            anyhow::bail!("cancelled");
        }
    };
    if !dispatched {
        anyhow::bail!("nothing to submit: an image and a prompt are required");
    }
    let duration_ms = start.elapsed().as_millis() as u64;

    let image = match session.status() {
        Status::Success(image) => image,
        Status::Error(message) => anyhow::bail!("{message}"),
        Status::Idle | Status::Generating => anyhow::bail!("transformation did not complete"),
    };

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(TransformedImage::default_filename()));
    image.save(&output)?;

    if json_output {
        let mut result = serde_json::json!({
            "success": true,
            "output": output.display().to_string(),
            "model": client.model().as_str(),
            "duration_ms": duration_ms,
        });
        if args.data_url {
            result["data_url"] = serde_json::Value::from(image.data_url());
        }
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        if args.data_url {
            println!("{}", image.data_url());
        }
        println!(
            "Transformed image: {} via {} ({}ms)",
            output.display(),
            client.model(),
            duration_ms
        );
    }

    Ok(())
}

async fn check(args: ClientArgs, json_output: bool) -> anyhow::Result<()> {
    let client = build_client(&args)?;
    let result = client.health_check().await;

    if json_output {
        let value = serde_json::json!({
            "model": client.model().as_str(),
            "ok": result.is_ok(),
            "error": result.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if result.is_ok() {
        println!("✓ {} is reachable", client.model());
    }

    result?;
    Ok(())
}

fn list_models(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct ModelInfo {
        name: &'static str,
        id: &'static str,
        default: bool,
    }

    let models: Vec<ModelInfo> = GeminiModel::ALL
        .iter()
        .map(|m| ModelInfo {
            name: match m {
                GeminiModel::NanoBanana => "nano-banana",
                GeminiModel::NanoBananaPro => "nano-banana-pro",
            },
            id: m.as_str(),
            default: *m == GeminiModel::default(),
        })
        .collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&models)?);
    } else {
        println!("Available models:\n");
        for m in &models {
            let marker = if m.default { " (default)" } else { "" };
            println!("  {} -> {}{}", m.name, m.id, marker);
        }
        println!("\nAPI key: GOOGLE_API_KEY or API_KEY");
    }

    Ok(())
}
