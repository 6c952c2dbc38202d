use clap::Parser;
use grounded_search::config::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, GenerationConfig, LlmConfig, ServerConfig,
};
use grounded_search::server;

#[derive(Parser, Debug)]
#[command(name = "grounded-search")]
#[command(about = "Conversational web search backed by a grounded LLM chat API")]
#[command(long_about = r#"
Conversational web search backed by a grounded LLM chat API

Serves two JSON endpoints:
  GET  /api/search?q=...      start a conversation, returns sessionId, summary, sources
  POST /api/follow-up         {"sessionId": ..., "query": ...} continues it

Examples:
  GOOGLE_API_KEY=... grounded-search --port 3000
  grounded-search --api-key ... --model gemini-2.0-flash-exp --temperature 0.4
"#)]
struct CliArgs {
    /// Host address to bind the server
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// API key for the Gemini API
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of the model API
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Timeout in seconds for a single model call
    #[arg(long, default_value_t = 600)]
    request_timeout_secs: u64,

    /// Sampling temperature
    #[arg(long, default_value_t = 0.9)]
    temperature: f32,

    /// Nucleus sampling threshold
    #[arg(long, default_value_t = 1.0)]
    top_p: f32,

    /// Top-k sampling
    #[arg(long, default_value_t = 1)]
    top_k: u32,

    /// Maximum number of tokens in an answer
    #[arg(long, default_value_t = 2048)]
    max_output_tokens: u32,

    /// Maximum JSON payload size in bytes
    #[arg(long, default_value_t = 262144)] // 256KB
    max_payload_size: usize,

    /// Set the logging level
    #[arg(long, default_value = "info", value_parser = ["off", "error", "warn", "info", "debug", "trace"])]
    log_level: String,
}

impl CliArgs {
    fn to_server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            max_payload_size: self.max_payload_size,
            log_level: Some(self.log_level.clone()),
            llm: LlmConfig {
                api_key: self.api_key.clone().unwrap_or_default(),
                base_url: self.base_url.clone(),
                model: self.model.clone(),
                request_timeout_secs: self.request_timeout_secs,
                generation: GenerationConfig {
                    temperature: self.temperature,
                    top_p: self.top_p,
                    top_k: self.top_k,
                    max_output_tokens: self.max_output_tokens,
                },
            },
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli_args = CliArgs::parse();

    println!("Grounded search starting...");
    println!("Host: {}:{}", cli_args.host, cli_args.port);
    println!("Model: {}", cli_args.model);

    let server_config = cli_args.to_server_config();
    server_config.validate()?;

    actix_web::rt::System::new().block_on(server::startup(server_config))?;

    Ok(())
}
