use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mastery",
    about = "Mastery Engine — operator CLI for the evaluation pipeline",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Output raw JSON (for scripting/piping)
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show system health, version, and endpoint info
    Status,

    /// Submit an activity transcript through the evaluation pipeline
    Evaluate {
        /// Activity ID to evaluate
        activity_id: String,
        /// Learner ID submitting the activity
        learner_id: String,
        /// Path to a JSON file holding the submission's `activity_transcript`
        /// (defaults to reading from stdin)
        #[arg(long)]
        transcript: Option<std::path::PathBuf>,
    },

    /// Inspect a learner's skill progress and activity history
    #[command(subcommand)]
    Learner(LearnerCommand),

    /// Read or replace the four server-side configuration documents
    #[command(subcommand)]
    Docs(DocsCommand),

    /// Manage local CLI configuration (endpoint URL, API key)
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Operator-only administrative operations
    #[command(subcommand)]
    Admin(AdminCommand),

    /// View the structured event log
    Logs {
        /// Follow mode: stream events in real-time over SSE
        #[arg(short, long)]
        follow: bool,
        /// Limit number of history entries
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Launch the interactive TUI dashboard
    Tui {
        /// Learner ID to track skill progress for (optional)
        #[arg(long)]
        learner_id: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum LearnerCommand {
    /// Show current `SkillProgress` rows for a learner
    Skills {
        /// Learner ID
        learner_id: String,
    },
    /// Show `ActivityHistoryRow` entries for a (learner, skill) pair
    History {
        /// Learner ID
        learner_id: String,
        /// Skill ID
        skill_id: String,
        /// List newest-first instead of chronological (oldest-first)
        #[arg(long)]
        recent: bool,
    },
}

#[derive(Subcommand)]
pub enum DocsCommand {
    /// Fetch a configuration document (llm_settings, scoring_config, domain_model, app_state)
    Get {
        /// Document name
        doc: String,
    },
    /// Replace a configuration document wholesale (admin API key required)
    Set {
        /// Document name
        doc: String,
        /// Path to a JSON file with the new document contents
        file: std::path::PathBuf,
    },
}

#[derive(Subcommand)]
pub enum AdminCommand {
    /// Delete a learner's history, skill progress, and activity records
    Reset {
        /// Learner ID
        learner_id: String,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Retroactively recompute decay-adjusted evidence for one or all
    /// `(learner, skill)` pairs under the current decay setting
    Recalculate {
        /// Restrict to a single learner (requires --skill-id)
        #[arg(long)]
        learner_id: Option<String>,
        /// Restrict to a single skill (requires --learner-id)
        #[arg(long)]
        skill_id: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Key name (url, api_key)
        key: String,
        /// Value to set
        value: String,
    },
}
