//! wacrm CLI
//!
//! Command-line interface for a running wacrm server:
//! - Send, preview, broadcast and run campaigns
//! - Manage templates and leads
//! - Read logs, inbox threads and metrics

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;

use wacrm::ledger::LeadStatus;
use wacrm::messaging::{ComposeRequest, ExtractionMode, TemplateSort};

#[derive(Parser)]
#[command(name = "wacrm-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "WhatsApp Business CRM client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:4000", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

/// What to send: free text or a template with positional variables
#[derive(Args, Clone)]
pub struct MessageArgs {
    /// Text body
    #[arg(long, conflicts_with = "template")]
    pub text: Option<String>,

    /// Template name
    #[arg(long)]
    pub template: Option<String>,

    /// Template variable, in placeholder order (repeatable)
    #[arg(short = 'v', long = "var")]
    pub vars: Vec<String>,

    /// Template language override
    #[arg(long)]
    pub language: Option<String>,
}

impl MessageArgs {
    fn compose_request(&self) -> ComposeRequest {
        match &self.template {
            Some(name) => {
                let request = ComposeRequest::template(name.clone(), self.vars.clone());
                match &self.language {
                    Some(code) => request.language(code.clone()),
                    None => request,
                }
            }
            None => ComposeRequest::text(self.text.clone().unwrap_or_default()),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send one message
    Send {
        /// Destination phone number
        to: String,
        #[command(flatten)]
        message: MessageArgs,
    },

    /// Preview a message without sending it
    Preview {
        #[command(flatten)]
        message: MessageArgs,
    },

    /// Send to a list of numbers
    Broadcast {
        /// Numbers, comma separated
        #[arg(short, long, value_delimiter = ',')]
        numbers: Vec<String>,
        /// File with one number per line
        #[arg(long)]
        file: Option<PathBuf>,
        #[command(flatten)]
        message: MessageArgs,
    },

    /// Send to every lead with a status
    Campaign {
        /// Lead status, or "all"
        #[arg(short, long, default_value = "all")]
        status: String,
        #[command(flatten)]
        message: MessageArgs,
    },

    /// Inspect or stop the running batch
    Batch {
        #[command(subcommand)]
        action: BatchAction,
    },

    /// Manage message templates
    Templates {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Manage leads
    Leads {
        #[command(subcommand)]
        action: LeadAction,
    },

    /// Show the activity log
    Logs {
        /// Clear the log instead
        #[arg(long)]
        clear: bool,
    },

    /// List inbox threads, or show one thread
    Inbox {
        /// Thread phone number
        phone: Option<String>,
        /// Filter threads by phone or name
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Reply inside an inbox thread
    Reply {
        phone: String,
        text: String,
    },

    /// Show send counters
    Metrics,

    /// Show server status
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum BatchAction {
    /// Current snapshot
    Status,
    /// Stop after the attempt in flight
    Cancel,
    /// Follow progress until the batch ends
    Watch {
        /// Poll interval in milliseconds
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
    },
}

#[derive(Subcommand)]
pub enum TemplateAction {
    /// List templates
    List {
        #[arg(short, long)]
        search: Option<String>,
        /// Sort key (name, date, status)
        #[arg(long, default_value = "name")]
        sort: TemplateSort,
        /// Include unapproved templates and every language
        #[arg(long)]
        all: bool,
    },
    /// Submit a body-only template for review
    Create {
        name: String,
        body: String,
        #[arg(long, default_value = "MARKETING")]
        category: String,
        #[arg(long, default_value = "en_US")]
        language: String,
    },
    /// Delete a template by id
    Delete { id: String },
    /// Show the variable inputs of a template
    Vars {
        name: String,
        /// Count each distinct placeholder once
        #[arg(long)]
        distinct: bool,
    },
}

#[derive(Subcommand)]
pub enum LeadAction {
    /// List leads
    List {
        #[arg(short, long)]
        search: Option<String>,
        /// Lead status, or "all"
        #[arg(long)]
        status: Option<String>,
    },
    /// Add a lead
    Add {
        name: String,
        phone: String,
        #[arg(long, default_value = "New")]
        status: LeadStatus,
    },
    /// Delete a lead by id
    Delete { id: String },
}

/// Thin JSON client over the server API
struct Api {
    client: reqwest::Client,
    base: String,
}

impl Api {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base.trim_end_matches('/'), path)
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> anyhow::Result<Value> {
        let response = self.client.get(self.url(path)).query(query).send().await?;
        read(response).await
    }

    async fn post(&self, path: &str, body: Value) -> anyhow::Result<Value> {
        let response = self.client.post(self.url(path)).json(&body).send().await?;
        read(response).await
    }

    async fn delete(&self, path: &str) -> anyhow::Result<Value> {
        let response = self.client.delete(self.url(path)).send().await?;
        read(response).await
    }
}

/// Decode a response body, exiting with the server's message on errors
async fn read(response: reqwest::Response) -> anyhow::Result<Value> {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(text);
        eprintln!("Failed ({}): {}", status, message);
        std::process::exit(1);
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let api = Api {
        client: reqwest::Client::new(),
        base: cli.api_url.clone(),
    };
    let as_json = cli.format == "json";

    match cli.command {
        Commands::Send { to, message } => {
            let mut body = serde_json::to_value(message.compose_request())?;
            body["to"] = json!(to);
            let result = api.post("/api/v1/messages", body).await?;

            if as_json {
                print_json(&result)?;
            } else {
                print_outcome(&result);
            }
        }

        Commands::Preview { message } => {
            let result = api
                .post("/api/v1/preview", serde_json::to_value(message.compose_request())?)
                .await?;

            if as_json {
                print_json(&result)?;
            } else {
                match result["preview"].as_str() {
                    Some(text) => println!("{}", text),
                    None => println!("(nothing to preview)"),
                }
                if let Some(reason) = result["invalid"].as_str() {
                    println!();
                    println!("Would be rejected: {}", reason);
                }
            }
        }

        Commands::Broadcast {
            numbers,
            file,
            message,
        } => {
            let mut list = numbers;
            if let Some(path) = file {
                list.extend(std::fs::read_to_string(&path)?.lines().map(str::to_string));
            }

            let mut body = serde_json::to_value(message.compose_request())?;
            body["numbers"] = json!(list.join("\n"));
            let started = api.post("/api/v1/broadcast", body).await?;
            print_started(&started, as_json)?;
        }

        Commands::Campaign { status, message } => {
            let mut body = serde_json::to_value(message.compose_request())?;
            body["status"] = json!(status);
            let started = api.post("/api/v1/campaigns", body).await?;
            print_started(&started, as_json)?;
        }

        Commands::Batch { action } => match action {
            BatchAction::Status => {
                let snapshot = api.get("/api/v1/batch", &[]).await?;
                if as_json {
                    print_json(&snapshot)?;
                } else {
                    print_snapshot(&snapshot);
                }
            }
            BatchAction::Cancel => {
                let result = api.post("/api/v1/batch/cancel", json!({})).await?;
                if result["cancelled"].as_bool().unwrap_or(false) {
                    println!("Cancellation requested");
                } else {
                    println!("No batch is running");
                }
            }
            BatchAction::Watch { interval_ms } => {
                let mut last_attempted = None;
                loop {
                    let snapshot = api.get("/api/v1/batch", &[]).await?;
                    let attempted = snapshot["attempted"].as_u64();
                    if attempted != last_attempted {
                        print_snapshot(&snapshot);
                        last_attempted = attempted;
                    }
                    if snapshot["phase"] != "running" {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                }
            }
        },

        Commands::Templates { action } => match action {
            TemplateAction::List { search, sort, all } => {
                let mut query = vec![
                    ("sort", format!("{:?}", sort).to_lowercase()),
                    ("all", all.to_string()),
                ];
                if let Some(search) = search {
                    query.push(("search", search));
                }
                let listing = api.get("/api/v1/templates", &query).await?;

                if as_json {
                    print_json(&listing)?;
                } else {
                    print_templates(&listing);
                }
            }
            TemplateAction::Create {
                name,
                body,
                category,
                language,
            } => {
                let created = api
                    .post(
                        "/api/v1/templates",
                        json!({"name": name, "body": body, "category": category, "language": language}),
                    )
                    .await?;
                println!(
                    "Template submitted: id {} ({})",
                    created["id"].as_str().unwrap_or("-"),
                    created["status"].as_str().unwrap_or("PENDING")
                );
            }
            TemplateAction::Delete { id } => {
                api.delete(&format!("/api/v1/templates/{}", id)).await?;
                println!("Template {} deleted", id);
            }
            TemplateAction::Vars { name, distinct } => {
                let mode = if distinct {
                    ExtractionMode::Distinct
                } else {
                    ExtractionMode::Ordered
                };
                let vars = api
                    .get(
                        &format!("/api/v1/templates/{}/variables", name),
                        &[("mode", format!("{:?}", mode).to_lowercase())],
                    )
                    .await?;

                if as_json {
                    print_json(&vars)?;
                } else {
                    println!("{}: {} variable(s)", name, vars["count"].as_u64().unwrap_or(0));
                    for input in vars["panel"]["inputs"].as_array().into_iter().flatten() {
                        println!(
                            "  {:>2}. {}",
                            input["position"].as_u64().unwrap_or(0),
                            input["label"].as_str().unwrap_or("-")
                        );
                    }
                }
            }
        },

        Commands::Leads { action } => match action {
            LeadAction::List { search, status } => {
                let mut query = Vec::new();
                if let Some(search) = search {
                    query.push(("search", search));
                }
                if let Some(status) = status {
                    query.push(("status", status));
                }
                let listing = api.get("/api/v1/leads", &query).await?;

                if as_json {
                    print_json(&listing)?;
                } else {
                    print_leads(&listing);
                }
            }
            LeadAction::Add {
                name,
                phone,
                status,
            } => {
                let lead = api
                    .post(
                        "/api/v1/leads",
                        json!({"name": name, "phone": phone, "status": status}),
                    )
                    .await?;
                println!("Added lead {}", lead["id"].as_str().unwrap_or("-"));
            }
            LeadAction::Delete { id } => {
                api.delete(&format!("/api/v1/leads/{}", id)).await?;
                println!("Lead {} deleted", id);
            }
        },

        Commands::Logs { clear } => {
            if clear {
                api.delete("/api/v1/logs").await?;
                println!("Log cleared");
            } else {
                let logs = api.get("/api/v1/logs", &[]).await?;
                if as_json {
                    print_json(&logs)?;
                } else {
                    print_logs(&logs);
                }
            }
        }

        Commands::Inbox { phone, search } => match phone {
            Some(phone) => {
                let thread = api.get(&format!("/api/v1/inbox/{}", phone), &[]).await?;
                if as_json {
                    print_json(&thread)?;
                } else {
                    print_thread(&thread);
                }
            }
            None => {
                let query: Vec<(&str, String)> =
                    search.map(|s| vec![("search", s)]).unwrap_or_default();
                let threads = api.get("/api/v1/inbox", &query).await?;
                if as_json {
                    print_json(&threads)?;
                } else {
                    print_threads(&threads);
                }
            }
        },

        Commands::Reply { phone, text } => {
            let result = api
                .post(&format!("/api/v1/inbox/{}/reply", phone), json!({"text": text}))
                .await?;
            if as_json {
                print_json(&result)?;
            } else {
                print_outcome(&result);
            }
        }

        Commands::Metrics => {
            let metrics = api.get("/api/v1/metrics", &[]).await?;
            if as_json {
                print_json(&metrics)?;
            } else {
                println!("Sent:       {}", metrics["sent"].as_u64().unwrap_or(0));
                println!("Delivered:  {}", metrics["delivered"].as_u64().unwrap_or(0));
                println!("Failed:     {}", metrics["failed"].as_u64().unwrap_or(0));
                println!("Leads:      {}", metrics["total_leads"].as_u64().unwrap_or(0));
                println!("Threads:    {}", metrics["threads"].as_u64().unwrap_or(0));
            }
        }

        Commands::Status => {
            let response = api.client.get(api.url("/health")).send().await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: Value = resp.json().await?;

                    if as_json {
                        print_json(&health)?;
                        return Ok(());
                    }

                    println!("wacrm v{}", env!("CARGO_PKG_VERSION"));
                    println!();
                    println!("API Status: {}", health["status"].as_str().unwrap_or("unknown"));
                    println!("WhatsApp:   {}", health["whatsapp"].as_str().unwrap_or("unknown"));
                    println!("Ledger:     {}", health["ledger"].as_str().unwrap_or("unknown"));
                    println!(
                        "Batch:      {}",
                        if health["batch_running"].as_bool().unwrap_or(false) {
                            "running"
                        } else {
                            "idle"
                        }
                    );

                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!();
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Ok(resp) => {
                    eprintln!("API returned error: {}", resp.status());
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Cannot connect to wacrm API at {}", cli.api_url);
                    eprintln!("Error: {}", e);
                    eprintln!();
                    eprintln!("Make sure the wacrm server is running:");
                    eprintln!("  cargo run --bin wacrm");
                    std::process::exit(1);
                }
            }
        }

        Commands::Config { output } => {
            let config = wacrm::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_outcome(result: &Value) {
    let to = result["to"].as_str().unwrap_or("-");
    match result["outcome"]["status"].as_str() {
        Some("success") => println!("Message sent to {}", to),
        _ => {
            eprintln!(
                "Failed: {}",
                result["outcome"]["reason"].as_str().unwrap_or("unknown error")
            );
            std::process::exit(1);
        }
    }
}

fn print_started(started: &Value, as_json: bool) -> anyhow::Result<()> {
    if as_json {
        return print_json(started);
    }
    println!(
        "{} started for {} recipient(s)",
        started["kind"].as_str().unwrap_or("batch"),
        started["total"].as_u64().unwrap_or(0)
    );
    println!("Follow it with: wacrm-cli batch watch");
    Ok(())
}

fn print_snapshot(snapshot: &Value) {
    let attempted = snapshot["attempted"].as_u64().unwrap_or(0);
    let total = snapshot["total"].as_u64().unwrap_or(0);
    let percent = if total == 0 {
        0
    } else {
        attempted * 100 / total
    };

    println!(
        "{:<10} {:<10} {}/{} ({}%)  sent {}  failed {}",
        snapshot["phase"].as_str().unwrap_or("-"),
        snapshot["kind"].as_str().unwrap_or("-"),
        attempted,
        total,
        percent,
        snapshot["succeeded"].as_u64().unwrap_or(0),
        snapshot["failed"].as_u64().unwrap_or(0)
    );
}

fn print_templates(listing: &Value) {
    let templates = listing["templates"].as_array().cloned().unwrap_or_default();

    if templates.is_empty() {
        println!("No templates found.");
    } else {
        println!(
            "{:<28} {:<8} {:<16} {:<12} {}",
            "Name", "Lang", "Status", "Category", "Vars"
        );
        println!("{}", "-".repeat(72));

        for t in &templates {
            println!(
                "{:<28} {:<8} {:<16} {:<12} {}",
                t["name"].as_str().unwrap_or("-"),
                t["language"].as_str().unwrap_or("-"),
                t["status"].as_str().unwrap_or("-"),
                t["category"].as_str().unwrap_or("-"),
                t["variable_count"].as_u64().unwrap_or(0)
            );
        }
    }

    let stats = &listing["stats"];
    println!();
    println!(
        "{} total, {} approved, {} pending, {} rejected",
        stats["total"].as_u64().unwrap_or(0),
        stats["approved"].as_u64().unwrap_or(0),
        stats["pending"].as_u64().unwrap_or(0),
        stats["rejected"].as_u64().unwrap_or(0)
    );
}

fn print_leads(listing: &Value) {
    let leads = listing["leads"].as_array().cloned().unwrap_or_default();

    if leads.is_empty() {
        println!("No leads yet.");
        println!();
        println!("Add one with:");
        println!("  wacrm-cli leads add \"Ana\" +15550001111");
        return;
    }

    println!(
        "{:<36} {:<20} {:<16} {:<10} {}",
        "ID", "Name", "Phone", "Status", "Last contact"
    );
    println!("{}", "-".repeat(96));

    for lead in &leads {
        println!(
            "{:<36} {:<20} {:<16} {:<10} {}",
            lead["id"].as_str().unwrap_or("-"),
            lead["name"].as_str().unwrap_or("-"),
            lead["phone"].as_str().unwrap_or("-"),
            lead["status"].as_str().unwrap_or("-"),
            lead["last_contact"].as_str().unwrap_or("Never")
        );
    }
}

fn print_logs(logs: &Value) {
    let entries = logs["logs"].as_array().cloned().unwrap_or_default();
    if entries.is_empty() {
        println!("No activity yet.");
        return;
    }

    for entry in &entries {
        let time = entry["time"]
            .as_str()
            .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {:<8} {}",
            time,
            entry["kind"].as_str().unwrap_or("-"),
            entry["message"].as_str().unwrap_or("")
        );
    }
}

fn print_threads(threads: &Value) {
    let threads = threads["threads"].as_array().cloned().unwrap_or_default();
    if threads.is_empty() {
        println!("Inbox is empty.");
        return;
    }

    println!("{:<16} {:<24} {:>5}  {}", "Phone", "Name", "Msgs", "Last message");
    println!("{}", "-".repeat(72));
    for t in &threads {
        println!(
            "{:<16} {:<24} {:>5}  {}",
            t["phone"].as_str().unwrap_or("-"),
            t["name"].as_str().unwrap_or("-"),
            t["message_count"].as_u64().unwrap_or(0),
            t["last_text"].as_str().unwrap_or("")
        );
    }
}

fn print_thread(thread: &Value) {
    println!(
        "{} ({})",
        thread["name"].as_str().unwrap_or("-"),
        thread["phone"].as_str().unwrap_or("-")
    );
    println!();
    for message in thread["messages"].as_array().into_iter().flatten() {
        let arrow = match message["direction"].as_str() {
            Some("in") => "<-",
            _ => "->",
        };
        println!("{} {}", arrow, message["text"].as_str().unwrap_or(""));
    }
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}
