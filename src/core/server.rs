/// Server Transports
///
/// Hosts the tool registry over two transports:
/// - HTTP (Actix Web): plain GET routes for selected tools, plus the MCP
///   JSON-RPC endpoint mounted as a sub-application under `/mcp-server`
/// - STDIO: line-delimited JSON-RPC on stdin/stdout
///
/// Both transports delegate MCP methods to `protocol::dispatch`.

use actix_web::{
    App, HttpResponse, HttpServer, Result,
    http::header,
    middleware::{Compress, DefaultHeaders, Logger},
    web,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

use crate::core::config::ServerConfig;
use crate::core::error::InvokeError;
use crate::core::protocol::{self, MCPRequest, MCPResponse, PARSE_ERROR, ServerInfo};
use crate::core::registry::{Arguments, ToolDescriptor, ToolRegistry};

/// Path prefix the MCP sub-application is mounted under.
pub const MCP_MOUNT: &str = "/mcp-server";

/// HTTP routes that double as tools: (path, tool name).
pub const TOOL_ROUTES: &[(&str, &str)] = &[("/add", "add"), ("/multiply", "multiply_endpoint")];

/// Total MCP requests served over HTTP.
#[derive(Debug, Default)]
pub struct RequestCounter(AtomicU64);

impl RequestCounter {
    /// Count one request.
    pub fn increment(&self) {
        // Only atomicity matters here.
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Requests counted so far.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Health check endpoint handler.
async fn health() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "arithmetic-mcp"
    })))
}

/// MCP JSON-RPC handler for HTTP. Notifications are acknowledged with 202.
async fn mcp_handler(
    info: web::Data<ServerInfo>,
    registry: web::Data<ToolRegistry>,
    counter: web::Data<RequestCounter>,
    req: web::Json<MCPRequest>,
) -> Result<HttpResponse> {
    counter.increment();

    match protocol::dispatch(&info, &registry, req.into_inner()) {
        Some(response) => Ok(HttpResponse::Ok().json(response)),
        None => Ok(HttpResponse::Accepted().finish()),
    }
}

/// Metrics endpoint handler: total MCP requests since start.
async fn metrics_handler(counter: web::Data<RequestCounter>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "requests_total": counter.get(),
        "status": "ok"
    })))
}

/// Server-Sent Events endpoint for tools discovery.
///
/// Emits a single event carrying the same tool list as `tools/list`.
async fn sse_tools_discovery(registry: web::Data<ToolRegistry>) -> Result<HttpResponse> {
    let tools = protocol::list_tools(&registry);
    let tools_data = serde_json::json!({
        "count": tools.len(),
        "tools": tools,
    });

    let sse_data = format!(
        "data: {}\n\n",
        serde_json::to_string(&tools_data).unwrap_or_else(|_| "{}".to_string())
    );

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(header::CacheControl(vec![
            header::CacheDirective::NoCache,
            header::CacheDirective::NoStore,
            header::CacheDirective::MustRevalidate,
        ]))
        // Disable proxy buffering
        .insert_header(("x-accel-buffering", "no"))
        .body(sse_data))
}

/// Serve a tool as a plain GET route, taking its arguments from the query
/// string. Query parameters the tool does not declare are ignored.
async fn tool_route(
    tool: &'static str,
    registry: web::Data<ToolRegistry>,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    let Some(descriptor) = registry.get(tool) else {
        return HttpResponse::NotFound().json(serde_json::json!({ "detail": format!("unknown tool: {}", tool) }));
    };

    let result = query_arguments(descriptor, &query).and_then(|args| registry.invoke(tool, &args));
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e @ InvokeError::ArgumentMismatch { .. }) => {
            HttpResponse::UnprocessableEntity().json(serde_json::json!({ "detail": e.to_string() }))
        }
        Err(e @ InvokeError::UnknownTool(_)) => {
            HttpResponse::NotFound().json(serde_json::json!({ "detail": e.to_string() }))
        }
        Err(InvokeError::Handler(message)) => {
            tracing::error!(tool, error = %message, "tool route failed");
            HttpResponse::InternalServerError().json(serde_json::json!({ "detail": message }))
        }
    }
}

/// Coerce query-string values to the tool's declared parameter types.
fn query_arguments(
    descriptor: &ToolDescriptor,
    query: &HashMap<String, String>,
) -> std::result::Result<Arguments, InvokeError> {
    descriptor
        .parameters()
        .iter()
        .filter_map(|param| query.get(&param.name).map(|raw| (param, raw)))
        .map(|(param, raw)| {
            param
                .ty
                .coerce(raw)
                .map(|value| (param.name.clone(), value))
                .ok_or_else(|| InvokeError::ArgumentMismatch {
                    tool: descriptor.name().to_string(),
                    reason: format!("argument '{}' expected {}, got '{}'", param.name, param.ty, raw),
                })
        })
        .collect()
}

/// Route table shared by the HTTP server and its tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    for &(path, tool) in TOOL_ROUTES {
        cfg.route(
            path,
            web::get().to(move |registry: web::Data<ToolRegistry>, query: web::Query<HashMap<String, String>>| {
                tool_route(tool, registry, query)
            }),
        );
    }

    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics_handler))
        .route("/mcp", web::post().to(mcp_handler))
        .service(
            web::scope(MCP_MOUNT)
                .route("/sse", web::post().to(mcp_handler))
                .route("/sse", web::get().to(sse_tools_discovery)),
        )
        .route("/", web::post().to(mcp_handler))
        .route("/", web::get().to(health));
}

/// Run the HTTP server.
///
/// Worker count comes from the config; connection limits and timeouts are
/// fixed for high-traffic deployments.
pub async fn run_server_http(config: &ServerConfig, registry: Arc<ToolRegistry>) -> std::io::Result<()> {
    let bind_addr = config.bind_addr();
    let info = web::Data::new(config.server_info());
    let registry = web::Data::from(registry);
    let counter = web::Data::new(RequestCounter::default());

    tracing::info!(
        name = %config.name,
        version = %config.version,
        bind = %bind_addr,
        workers = config.workers,
        mcp = %format!("{}/sse", MCP_MOUNT),
        "MCP server starting (HTTP mode)"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(info.clone())
            .app_data(registry.clone())
            .app_data(counter.clone())
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY")),
            )
            // %r = request line, %s = status, %D = duration in ms
            .wrap(Logger::new("%r %s %Dms"))
            .configure(configure)
    })
    .workers(config.workers)
    .max_connections(10000)
    .max_connection_rate(1000)
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_secs(30))
    .client_disconnect_timeout(Duration::from_secs(2))
    .shutdown_timeout(10)
    .bind(&bind_addr)?
    .run()
    .await
}

/// Run the server in STDIO mode on the process's stdin/stdout.
pub async fn run_server_stdio(info: ServerInfo, registry: Arc<ToolRegistry>) -> std::io::Result<()> {
    tracing::info!(name = %info.name, version = %info.version, "MCP server starting (STDIO mode)");

    let stdin = BufReader::with_capacity(8192, tokio::io::stdin());
    let stdout = BufWriter::with_capacity(8192, tokio::io::stdout());
    serve_lines(&info, &registry, stdin, stdout).await
}

/// Process one JSON-RPC request per line until `reader` is exhausted,
/// writing one response per line to `writer`.
pub async fn serve_lines<R, W>(
    info: &ServerInfo,
    registry: &ToolRegistry,
    reader: R,
    mut writer: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<MCPRequest>(&line) {
            Ok(req) => protocol::dispatch(info, registry, req),
            Err(e) => {
                tracing::warn!(error = %e, "parse error");
                // Only answer when the id can be recovered from the raw JSON.
                serde_json::from_str::<serde_json::Value>(&line)
                    .ok()
                    .and_then(|partial| partial.get("id").cloned())
                    .map(|id| MCPResponse::failure(Some(id), PARSE_ERROR, format!("Parse error: {}", e)))
            }
        };

        let Some(response) = response else {
            continue;
        };

        let response_json = match serde_json::to_string(&response) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response");
                continue;
            }
        };

        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        // Flush per response; clients wait on each line.
        writer.flush().await?;
    }

    Ok(())
}
