//! Shikayat Control - CLI client for the shikayat daemon.

use anyhow::Result;
use clap::{Parser, Subcommand};
use shikayatctl::commands::{self, ListArgs, SubmitArgs};

#[derive(Parser)]
#[command(name = "shikayatctl")]
#[command(about = "Citizen complaint reporting - daemon client", long_about = None)]
#[command(version)]
struct Cli {
    /// Daemon URL (defaults to $SHIKAYATD_URL, then http://127.0.0.1:7180)
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a new complaint
    Submit {
        /// Complaint text
        #[arg(long)]
        text: Option<String>,

        /// Path to a photo of the issue
        #[arg(long)]
        image: Option<String>,

        /// Path to a voice recording of the issue
        #[arg(long)]
        audio: Option<String>,

        /// Spoken language of the recording (e.g. "ur", "en")
        #[arg(long)]
        audio_language: Option<String>,

        /// District the issue is in
        #[arg(long)]
        district: String,

        /// Street address or landmark
        #[arg(long)]
        location: String,

        /// Email for status notifications
        #[arg(long)]
        email: Option<String>,

        /// Phone number for status notifications
        #[arg(long)]
        phone: Option<String>,

        /// Language for the formal complaint letter (english or urdu)
        #[arg(long)]
        language: Option<String>,
    },

    /// Look up a complaint by tracking id
    Track {
        tracking_id: String,
    },

    /// Show the status history of a complaint
    History {
        tracking_id: String,
    },

    /// List complaints, optionally filtered
    List {
        #[arg(long)]
        district: Option<String>,

        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        severity: Option<String>,

        #[arg(long)]
        issue_type: Option<String>,
    },

    /// Log in as an admin and print a session token
    Login {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,
    },

    /// Change a complaint's status (admin)
    Status {
        tracking_id: String,

        /// New status (e.g. "Under Review", "Resolved")
        new_status: String,

        /// Note recorded with the change
        #[arg(long, default_value = "")]
        note: String,

        /// Session token (defaults to $SHIKAYAT_TOKEN)
        #[arg(long)]
        token: Option<String>,
    },

    /// Export all complaints as CSV
    Export {
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },

    /// Download the formal complaint document as PDF
    Document {
        tracking_id: String,

        /// Output path (defaults to <tracking_id>.pdf)
        #[arg(long)]
        output: Option<String>,
    },

    /// Show aggregate complaint statistics
    Stats,

    /// Check daemon health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let url = cli.url.as_deref();

    match cli.command {
        Commands::Submit {
            text,
            image,
            audio,
            audio_language,
            district,
            location,
            email,
            phone,
            language,
        } => {
            commands::submit(
                url,
                SubmitArgs {
                    text,
                    image,
                    audio,
                    audio_language,
                    district,
                    location,
                    email,
                    phone,
                    language,
                },
            )
            .await
        }
        Commands::Track { tracking_id } => commands::track(url, &tracking_id).await,
        Commands::History { tracking_id } => commands::history(url, &tracking_id).await,
        Commands::List {
            district,
            status,
            severity,
            issue_type,
        } => {
            commands::list(
                url,
                ListArgs {
                    district,
                    status,
                    severity,
                    issue_type,
                },
            )
            .await
        }
        Commands::Login { username, password } => commands::login(url, &username, &password).await,
        Commands::Status {
            tracking_id,
            new_status,
            note,
            token,
        } => commands::transition(url, token, &tracking_id, &new_status, &note).await,
        Commands::Export { output } => commands::export_csv(url, output.as_deref()).await,
        Commands::Document {
            tracking_id,
            output,
        } => commands::export_document(url, &tracking_id, output.as_deref()).await,
        Commands::Stats => commands::stats(url).await,
        Commands::Health => commands::health(url).await,
    }
}
