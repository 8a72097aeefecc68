//! Command handlers for shikayatctl.

use crate::http_client::{ShikayatdClient, SubmitBody};
use anyhow::{anyhow, Context, Result};
use base64::Engine as _;
use owo_colors::OwoColorize;
use shikayat_common::types::{Complaint, Severity, Status};
use std::io::Write;
use std::path::Path;

const HR: &str = "----------------------------------------------------------------";

pub struct SubmitArgs {
    pub text: Option<String>,
    pub image: Option<String>,
    pub audio: Option<String>,
    pub audio_language: Option<String>,
    pub district: String,
    pub location: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub language: Option<String>,
}

pub async fn submit(url: Option<&str>, args: SubmitArgs) -> Result<()> {
    let client = ShikayatdClient::new(url)?;

    let image_base64 = match &args.image {
        Some(path) => Some(read_base64(path)?),
        None => None,
    };
    let audio_base64 = match &args.audio {
        Some(path) => Some(read_base64(path)?),
        None => None,
    };
    if args.text.is_none() && image_base64.is_none() && audio_base64.is_none() {
        return Err(anyhow!("provide --text, --image, or --audio"));
    }

    let receipt = client
        .submit(&SubmitBody {
            text: args.text,
            image_base64,
            audio_base64,
            audio_language: args.audio_language,
            district: args.district,
            location: args.location,
            email: args.email,
            phone: args.phone,
            language: args.language,
        })
        .await?;

    println!();
    println!("{}", "Complaint registered".green().bold());
    println!("{}", HR.dimmed());
    print_kv("tracking_id", &receipt.tracking_id.bold().to_string());
    print_kv("issue_type", &receipt.issue_type);
    print_kv("severity", &colorize_severity(&receipt.severity));
    print_kv("department", &receipt.department);
    print_kv("status", &receipt.status);
    print_kv("confidence", &format!("{:.2}", receipt.confidence));
    println!("{}", HR.dimmed());
    println!();
    Ok(())
}

fn read_base64(path: &str) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

pub async fn track(url: Option<&str>, tracking_id: &str) -> Result<()> {
    let client = ShikayatdClient::new(url)?;
    let complaint = client.track(tracking_id).await?;
    print_complaint(&complaint);
    Ok(())
}

pub async fn history(url: Option<&str>, tracking_id: &str) -> Result<()> {
    let client = ShikayatdClient::new(url)?;
    let updates = client.history(tracking_id).await?;

    println!();
    println!("{} {}", "History for".bold(), tracking_id.bold());
    println!("{}", HR.dimmed());
    if updates.is_empty() {
        println!("no status changes yet");
    }
    for u in &updates {
        println!(
            "{}  {} -> {}  by {}{}",
            u.updated_at.format("%Y-%m-%d %H:%M"),
            u.old_status.as_str(),
            colorize_status(u.new_status),
            u.updated_by,
            if u.note.is_empty() {
                String::new()
            } else {
                format!("  ({})", u.note)
            }
        );
    }
    println!("{}", HR.dimmed());
    println!();
    Ok(())
}

pub struct ListArgs {
    pub district: Option<String>,
    pub status: Option<String>,
    pub severity: Option<String>,
    pub issue_type: Option<String>,
}

pub async fn list(url: Option<&str>, args: ListArgs) -> Result<()> {
    let client = ShikayatdClient::new(url)?;
    let mut query: Vec<(&str, String)> = Vec::new();
    if let Some(d) = args.district {
        query.push(("district", d));
    }
    if let Some(s) = args.status {
        query.push(("status", s));
    }
    if let Some(s) = args.severity {
        query.push(("severity", s));
    }
    if let Some(t) = args.issue_type {
        query.push(("issue_type", t));
    }

    let complaints = client.list(&query).await?;
    println!();
    println!("{} complaint(s)", complaints.len().bold());
    println!("{}", HR.dimmed());
    for c in &complaints {
        println!(
            "{}  {:22} {:8} {:12} {}",
            c.tracking_id.bold(),
            c.issue_type.as_str(),
            colorize_severity(c.severity.as_str()),
            colorize_status(c.status),
            c.district
        );
    }
    println!("{}", HR.dimmed());
    println!();
    Ok(())
}

pub async fn login(url: Option<&str>, username: &str, password: &str) -> Result<()> {
    let client = ShikayatdClient::new(url)?;
    let reply = client.login(username, password).await?;
    println!();
    println!(
        "{} {} ({})",
        "Logged in as".green(),
        reply.principal.full_name.bold(),
        reply.principal.role
    );
    println!();
    println!("export SHIKAYAT_TOKEN={}", reply.token);
    println!();
    Ok(())
}

pub async fn transition(
    url: Option<&str>,
    token: Option<String>,
    tracking_id: &str,
    new_status: &str,
    note: &str,
) -> Result<()> {
    let token = token
        .or_else(|| std::env::var("SHIKAYAT_TOKEN").ok())
        .ok_or_else(|| anyhow!("no session token; run `shikayatctl login` or set SHIKAYAT_TOKEN"))?;

    let client = ShikayatdClient::new(url)?;
    let update = client
        .transition(&token, tracking_id, new_status, note)
        .await?;
    println!(
        "{} {}: {} -> {}",
        "Updated".green(),
        update.tracking_id.bold(),
        update.old_status.as_str(),
        colorize_status(update.new_status)
    );
    Ok(())
}

pub async fn export_csv(url: Option<&str>, output: Option<&str>) -> Result<()> {
    let client = ShikayatdClient::new(url)?;
    let csv = client.export_csv().await?;
    match output {
        Some(path) => {
            std::fs::write(path, csv).with_context(|| format!("failed to write {}", path))?;
            println!("{} {}", "Wrote".green(), path);
        }
        None => {
            std::io::stdout().write_all(csv.as_bytes())?;
        }
    }
    Ok(())
}

pub async fn export_document(url: Option<&str>, tracking_id: &str, output: Option<&str>) -> Result<()> {
    let client = ShikayatdClient::new(url)?;
    let bytes = client.export_document(tracking_id).await?;
    let path = match output {
        Some(p) => p.to_string(),
        None => format!("{}.pdf", tracking_id),
    };
    std::fs::write(Path::new(&path), bytes)
        .with_context(|| format!("failed to write {}", path))?;
    println!("{} {}", "Wrote".green(), path);
    Ok(())
}

pub async fn stats(url: Option<&str>) -> Result<()> {
    let client = ShikayatdClient::new(url)?;
    let stats = client.stats().await?;

    println!();
    println!("{}", "Complaint statistics".bold());
    println!("{}", HR.dimmed());
    print_kv("total", &stats.total.to_string());
    print_section("by_status", &stats.by_status);
    print_section("by_severity", &stats.by_severity);
    print_section("by_type", &stats.by_type);
    print_section("by_district", &stats.by_district);
    println!("{}", HR.dimmed());
    println!();
    Ok(())
}

pub async fn health(url: Option<&str>) -> Result<()> {
    let client = ShikayatdClient::new(url)?;
    match client.health().await {
        Ok(body) => {
            let version = body
                .get("version")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            println!("{} shikayatd v{}", "OK".green().bold(), version);
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "DOWN".red().bold(), e);
            Err(e)
        }
    }
}

fn print_complaint(c: &Complaint) {
    println!();
    println!("{}", c.tracking_id.bold());
    println!("{}", HR.dimmed());
    print_kv("issue_type", c.issue_type.as_str());
    print_kv("severity", &colorize_severity(c.severity.as_str()));
    print_kv("department", &c.department);
    print_kv("status", &colorize_status(c.status));
    print_kv("district", &c.district);
    print_kv("location", &c.location);
    if let (Some(lat), Some(lon)) = (c.latitude, c.longitude) {
        print_kv("coordinates", &format!("{:.4}, {:.4}", lat, lon));
    }
    print_kv("created_at", &c.created_at.format("%Y-%m-%d %H:%M UTC").to_string());
    println!();
    println!("{}", c.description);
    println!("{}", HR.dimmed());
    println!();
}

fn print_kv(key: &str, value: &str) {
    println!("{:14} {}", key, value);
}

fn print_section(title: &str, counts: &std::collections::HashMap<String, usize>) {
    let mut rows: Vec<_> = counts.iter().collect();
    rows.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    println!("{}", title);
    for (key, count) in rows {
        println!("  {:24} {}", key, count);
    }
}

fn colorize_status(status: Status) -> String {
    match status {
        Status::Pending => status.as_str().yellow().to_string(),
        Status::UnderReview | Status::Assigned | Status::InProgress => {
            status.as_str().cyan().to_string()
        }
        Status::Resolved => status.as_str().green().to_string(),
        Status::Rejected => status.as_str().red().to_string(),
    }
}

fn colorize_severity(severity: &str) -> String {
    match Severity::parse(severity) {
        Some(Severity::High) => severity.red().to_string(),
        Some(Severity::Medium) => severity.yellow().to_string(),
        Some(Severity::Low) => severity.green().to_string(),
        None => severity.to_string(),
    }
}
