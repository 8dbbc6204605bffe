//! A single downstream MCP connection, uniform across stdio/HTTP/SSE
//! transports (§3 `ClientConnection`, §9's "polymorphic client abstraction"
//! design note).

use std::sync::Arc;
use std::time::Duration;

use config::{ServerConfig, TransportConfig};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, GetPromptRequestParam, GetPromptResult, Prompt, ReadResourceRequestParam,
    ReadResourceResult, Resource, Tool,
};
use rmcp::service::RunningService;
use rmcp::transport::common::client_side_sse::FixedInterval;
use rmcp::transport::sse_client::SseClientConfig;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{ConfigureCommandExt, SseClientTransport, StreamableHttpClientTransport, TokioChildProcess};
use rmcp::{RoleClient, ServiceExt};
use tokio::process::Command;
use tokio::sync::RwLock;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// One connected downstream server, holding the running `rmcp` service and
/// the resolved configuration that governs dispatch against it.
pub struct ClientConnection {
    config: ServerConfig,
    service: RunningService<RoleClient, ()>,
    /// Instruction captured from the server's handshake when the config
    /// didn't supply one explicitly (§4.G).
    handshake_instruction: RwLock<Option<String>>,
}

impl ClientConnection {
    /// Dials `config`'s transport, racing the attempt against `timeout`.
    pub async fn connect(config: ServerConfig, timeout: Duration) -> anyhow::Result<Self> {
        let dial = async {
            match &config.transport {
                TransportConfig::Stdio { command, args, env } => dial_stdio(command, args, env).await,
                TransportConfig::Http { url, headers } => dial_http(url, headers).await,
                TransportConfig::Sse { url, headers } => dial_sse(url, headers).await,
            }
        };

        let service = tokio::time::timeout(timeout, dial)
            .await
            .map_err(|_| anyhow::anyhow!("dial timed out after {}ms", timeout.as_millis()))??;

        let handshake_instruction = service
            .peer_info()
            .and_then(|info| info.instructions.clone());

        Ok(Self {
            config,
            service,
            handshake_instruction: RwLock::new(handshake_instruction),
        })
    }

    /// Name of the downstream server this connection was configured for.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Resolved configuration (blacklist, instruction, prompts, …).
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The effective instruction: configured value, else whatever the
    /// handshake carried.
    pub async fn instruction(&self) -> Option<String> {
        if let Some(instruction) = &self.config.instruction {
            return Some(instruction.clone());
        }
        self.handshake_instruction.read().await.clone()
    }

    #[fastrace::trace(name = "client:list_tools")]
    pub async fn list_tools(&self) -> anyhow::Result<Vec<Tool>> {
        Ok(self.service.list_tools(Default::default()).await?.tools)
    }

    #[fastrace::trace(name = "client:list_resources")]
    pub async fn list_resources(&self) -> anyhow::Result<Vec<Resource>> {
        Ok(self.service.list_resources(Default::default()).await?.resources)
    }

    #[fastrace::trace(name = "client:list_prompts")]
    pub async fn list_prompts(&self) -> anyhow::Result<Vec<Prompt>> {
        Ok(self.service.list_prompts(Default::default()).await?.prompts)
    }

    #[fastrace::trace(name = "client:call_tool")]
    pub async fn call_tool(&self, params: CallToolRequestParam) -> Result<CallToolResult, rmcp::ServiceError> {
        self.service.call_tool(params).await
    }

    #[fastrace::trace(name = "client:read_resource")]
    pub async fn read_resource(&self, params: ReadResourceRequestParam) -> anyhow::Result<ReadResourceResult> {
        Ok(self.service.read_resource(params).await?)
    }

    #[fastrace::trace(name = "client:get_prompt")]
    pub async fn get_prompt(&self, params: GetPromptRequestParam) -> Result<GetPromptResult, rmcp::ServiceError> {
        self.service.get_prompt(params).await
    }

    /// Closes this connection, giving the peer `SHUTDOWN_GRACE` to exit
    /// cleanly. Stdio children are marked `kill_on_drop` at spawn time, so a
    /// timeout here still guarantees the process dies once `self` is
    /// dropped (§4.G shutdown discipline).
    pub async fn close(self) {
        let name = self.config.name.clone();
        match tokio::time::timeout(SHUTDOWN_GRACE, self.service.cancel()).await {
            Ok(Ok(_)) => log::debug!("server '{name}' closed gracefully"),
            Ok(Err(e)) => log::warn!("server '{name}' close reported an error: {e}"),
            Err(_) => log::warn!("server '{name}' did not close within {SHUTDOWN_GRACE:?}, forcing"),
        }
    }
}

async fn dial_stdio(
    command: &str,
    args: &[String],
    env: &std::collections::HashMap<String, String>,
) -> anyhow::Result<RunningService<RoleClient, ()>> {
    let args = args.to_vec();
    let env = env.clone();

    let transport = TokioChildProcess::new(Command::new(command).configure(move |cmd| {
        cmd.args(&args).envs(&env).kill_on_drop(true);
    }))?;

    Ok(().serve(transport).await?)
}

async fn dial_http(
    url: &str,
    headers: &std::collections::HashMap<String, String>,
) -> anyhow::Result<RunningService<RoleClient, ()>> {
    let client = build_http_client(headers)?;
    let config = StreamableHttpClientTransportConfig::with_uri(url.to_string());
    let transport = StreamableHttpClientTransport::with_client(client, config);
    Ok(().serve(transport).await?)
}

async fn dial_sse(
    url: &str,
    headers: &std::collections::HashMap<String, String>,
) -> anyhow::Result<RunningService<RoleClient, ()>> {
    let client = build_http_client(headers)?;
    let client_config = SseClientConfig {
        sse_endpoint: url.to_string().into(),
        retry_policy: Arc::new(FixedInterval::default()),
        use_message_endpoint: None,
    };
    let transport = SseClientTransport::start_with_client(client, client_config).await?;
    Ok(().serve(transport).await?)
}

fn build_http_client(headers: &std::collections::HashMap<String, String>) -> anyhow::Result<reqwest::Client> {
    let mut default_headers = reqwest::header::HeaderMap::new();
    for (name, value) in headers {
        default_headers.insert(
            reqwest::header::HeaderName::from_bytes(name.as_bytes())?,
            reqwest::header::HeaderValue::from_str(value)?,
        );
    }

    Ok(reqwest::Client::builder().default_headers(default_headers).build()?)
}
