use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use scratchmatch_core::{EventConfig, EventConfigPatch, Participant};

/// Scratchmatch: admin tool for the event check-in service
#[derive(Parser, Debug)]
#[command(name = "scratchmatch")]
#[command(about = "Admin tool for the scratchmatch event service", long_about = None)]
struct Cli {
    /// Base URL of the scratchmatch server
    #[arg(long, env = "SCRATCHMATCH_SERVER", default_value = "http://localhost:3000")]
    server: String,

    /// Admin username (falls back to SCRATCHMATCH_ADMIN_USERNAME)
    #[arg(long, env = "SCRATCHMATCH_ADMIN_USERNAME")]
    username: Option<String>,

    /// Admin password (falls back to SCRATCHMATCH_ADMIN_PASSWORD)
    #[arg(long, env = "SCRATCHMATCH_ADMIN_PASSWORD")]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show event progress: totals, group fill, and the participant list
    Status,
    /// Approve a participant by email
    Approve(ApproveArgs),
    /// Open the event for group reveals
    Open,
    /// Close the event
    Close,
    /// Clear all participant data (configuration is kept)
    Reset(ResetArgs),
    /// Update the event configuration
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
struct ApproveArgs {
    /// Email address of the participant to approve
    email: String,
}

#[derive(Parser, Debug)]
struct ResetArgs {
    /// Confirm the reset; without this flag nothing is deleted
    #[arg(long)]
    yes: bool,
}

#[derive(Parser, Debug)]
struct ConfigArgs {
    /// Expected number of participants
    #[arg(long)]
    total: Option<u32>,

    /// Number of groups to assign into
    #[arg(long)]
    groups: Option<u32>,

    /// Target participants per group
    #[arg(long)]
    per_group: Option<u32>,
}

impl ConfigArgs {
    fn to_patch(&self) -> EventConfigPatch {
        EventConfigPatch {
            total_participants: self.total,
            number_of_groups: self.groups,
            participants_per_group: self.per_group,
            event_open: None,
        }
    }
}

#[derive(Deserialize, Debug)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct StatusSummary {
    total_participants: usize,
    registered: usize,
    approved: usize,
    scratched: usize,
}

#[derive(Deserialize, Debug)]
struct GroupFill {
    group: u32,
    count: usize,
    capacity: u32,
    full: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    version: String,
    event_open: bool,
    config: EventConfig,
    summary: StatusSummary,
    groups: Vec<GroupFill>,
    participants: Vec<Participant>,
}

/// An authenticated client for the admin endpoints.
struct AdminClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl AdminClient {
    /// Log in with the credential pair and keep the session token.
    async fn login(
        client: reqwest::Client,
        base_url: &str,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        let response = client
            .post(format!("{base_url}/admin/login"))
            .json(&serde_json::json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .with_context(|| format!("Failed to reach server at {base_url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .context("Failed to read error response")?;
            return Err(anyhow!("Login failed: {} - {}", status, error_text));
        }

        let login: LoginResponse = response
            .json()
            .await
            .context("Failed to parse login response")?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            token: login.token,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("Failed to send GET {path}"))?;
        Self::parse(response, path).await
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let mut request = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send POST {path}"))?;
        Self::parse(response, path).await
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        path: &str,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .context("Failed to read error response")?;
            return Err(anyhow!("{path} failed: {} - {}", status, error_text));
        }
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {path}"))
    }
}

fn render_status(status: &StatusResponse) {
    println!(
        "scratchmatch {} - event {}",
        status.version,
        if status.event_open { "OPEN" } else { "closed" }
    );
    println!(
        "Config: {} expected, {} groups of {}",
        status.config.total_participants,
        status.config.number_of_groups,
        status.config.participants_per_group
    );
    println!(
        "Participants: {} signed in, {} registered, {} approved, {} revealed",
        status.summary.total_participants,
        status.summary.registered,
        status.summary.approved,
        status.summary.scratched
    );

    println!("\nGroups:");
    for group in &status.groups {
        println!(
            "  Group {}: {}/{}{}",
            group.group,
            group.count,
            group.capacity,
            if group.full { " (full)" } else { "" }
        );
    }

    if !status.participants.is_empty() {
        println!("\nParticipants:");
        for p in &status.participants {
            let stage = if p.scratched {
                match p.assigned_group {
                    Some(group) => format!("group {group}"),
                    None => "revealed".to_string(),
                }
            } else if p.approved {
                "approved".to_string()
            } else if p.registered {
                "awaiting approval".to_string()
            } else {
                "signed in".to_string()
            };
            println!(
                "  {} - {} ({})",
                p.email,
                p.full_name.as_deref().unwrap_or("<unregistered>"),
                stage
            );
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let username = cli.username.context(
        "Admin username must be provided via --username or SCRATCHMATCH_ADMIN_USERNAME",
    )?;
    let password = cli.password.context(
        "Admin password must be provided via --password or SCRATCHMATCH_ADMIN_PASSWORD",
    )?;

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")?;

    let base_url = cli.server.trim_end_matches('/');
    let client = AdminClient::login(http, base_url, &username, &password).await?;

    match cli.command {
        Commands::Status => {
            let status: StatusResponse = client.get("/admin/status").await?;
            render_status(&status);
        }
        Commands::Approve(args) => {
            let participant: Participant = client
                .post(
                    &format!("/admin/participants/{}/approve", args.email),
                    None,
                )
                .await?;
            println!(
                "Approved {} ({})",
                participant.email,
                participant.full_name.as_deref().unwrap_or("<unregistered>")
            );
        }
        Commands::Open => {
            let config: EventConfig = client.post("/admin/event/open", None).await?;
            println!(
                "Event is open: {} groups of {}",
                config.number_of_groups, config.participants_per_group
            );
        }
        Commands::Close => {
            client.post::<EventConfig>("/admin/event/close", None).await?;
            println!("Event is closed");
        }
        Commands::Reset(args) => {
            if !args.yes {
                return Err(anyhow!(
                    "Reset deletes every participant record. Re-run with --yes to confirm."
                ));
            }
            client.post::<serde_json::Value>("/admin/reset", None).await?;
            println!("All participant data cleared");
        }
        Commands::Config(args) => {
            if args.total.is_none() && args.groups.is_none() && args.per_group.is_none() {
                return Err(anyhow!(
                    "Nothing to update; pass at least one of --total, --groups, --per-group"
                ));
            }
            let patch = serde_json::to_value(args.to_patch())
                .context("Failed to encode config patch")?;
            let config: EventConfig = client.post("/admin/config", Some(patch)).await?;
            println!(
                "Config updated: {} expected, {} groups of {}",
                config.total_participants, config.number_of_groups, config.participants_per_group
            );
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
