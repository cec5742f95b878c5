//! CLI argument definitions.

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `tracelink`.
#[derive(Debug, Parser)]
#[command(name = "tracelink", version, about = "Trace tasks and releases to branches and commits")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage projects.
    Project {
        /// Project operation to run.
        #[command(subcommand)]
        command: ProjectCommand,
    },
    /// Manage tasks.
    Task {
        /// Task operation to run.
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Manually link a task to a branch or commit.
    Link {
        /// Reference kind to link.
        #[command(subcommand)]
        command: RefCommand,
    },
    /// Remove a link from a task.
    Unlink {
        /// Reference kind to unlink.
        #[command(subcommand)]
        command: RefCommand,
    },
    /// Show all links for a task, newest first.
    Links {
        /// Task id (e.g. TASK-001).
        task_id: String,
    },
    /// Reverse lookup: tasks linked to a branch or commit within a project.
    TasksFor {
        /// Project id scoping the lookup.
        #[arg(long)]
        project: String,
        /// Repository full name (org/repo).
        #[arg(long)]
        repo: String,
        /// Branch name to look up.
        #[arg(long, conflicts_with = "commit")]
        branch: Option<String>,
        /// Commit sha to look up.
        #[arg(long)]
        commit: Option<String>,
    },
    /// Show commit history for a branch (served from the cache when fresh).
    Commits {
        /// Repository full name (org/repo).
        repo: String,
        /// Branch name.
        branch: String,
        /// Cache freshness window in minutes.
        #[arg(long)]
        max_age_mins: Option<i64>,
    },
    /// Manage a project's workflow stages.
    Workflow {
        /// Workflow operation to run.
        #[command(subcommand)]
        command: WorkflowCommand,
    },
    /// Show the completed-task percentage for a project.
    Progress {
        /// Project id.
        project_id: String,
    },
    /// Manage version snapshots and their commits.
    Version {
        /// Version operation to run.
        #[command(subcommand)]
        command: VersionCommand,
    },
    /// Auto-link tasks referenced by commit messages on a branch.
    Sync {
        /// Project whose tasks may be linked.
        project_id: String,
        /// Repository full name (org/repo).
        repo: String,
        /// Branch to scan.
        branch: String,
        /// Cache freshness window in minutes.
        #[arg(long)]
        max_age_mins: Option<i64>,
        /// Notification target; falls back to the `notify.target` setting.
        #[arg(long)]
        notify: Option<String>,
    },
    /// List open issues for a repository.
    Issues {
        /// Repository full name (org/repo).
        repo: String,
    },
}

/// Project subcommands.
#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    /// Create a project with the default workflow.
    Add {
        /// Project display name.
        name: String,
    },
    /// List all projects.
    List,
}

/// Task subcommands.
#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// Create a task in a project.
    Add {
        /// Owning project id.
        project_id: String,
        /// Task title.
        title: String,
        /// Initial stage id; defaults to the workflow's first stage.
        #[arg(long)]
        status: Option<String>,
    },
    /// Move a task to another stage.
    Move {
        /// Task id.
        task_id: String,
        /// Target stage id.
        stage_id: String,
    },
    /// List all tasks in a project.
    List {
        /// Project id.
        project_id: String,
    },
}

/// A branch or commit reference paired with its task.
#[derive(Debug, Subcommand)]
pub enum RefCommand {
    /// A branch reference.
    Branch {
        /// Task id.
        task_id: String,
        /// Repository full name (org/repo).
        repo: String,
        /// Branch name.
        branch: String,
    },
    /// A commit reference.
    Commit {
        /// Task id.
        task_id: String,
        /// Repository full name (org/repo).
        repo: String,
        /// Commit sha.
        sha: String,
    },
}

/// Workflow subcommands.
#[derive(Debug, Subcommand)]
pub enum WorkflowCommand {
    /// Replace a project's workflow from a YAML stage list.
    Define {
        /// Project id.
        project_id: String,
        /// Path to a YAML file with the ordered stage list.
        #[arg(long)]
        file: std::path::PathBuf,
    },
    /// Show a project's current workflow.
    Show {
        /// Project id.
        project_id: String,
    },
}

/// Version snapshot subcommands.
#[derive(Debug, Subcommand)]
pub enum VersionCommand {
    /// Create a version snapshot in a project.
    Add {
        /// Owning project id.
        project_id: String,
        /// Version name (e.g. 1.4.0).
        name: String,
    },
    /// Attach a commit to a version snapshot.
    Attach {
        /// Version id.
        version_id: String,
        /// Repository full name (org/repo).
        repo: String,
        /// Commit sha.
        sha: String,
    },
    /// Detach a commit from a version snapshot.
    Detach {
        /// Version id.
        version_id: String,
        /// Repository full name (org/repo).
        repo: String,
        /// Commit sha.
        sha: String,
    },
    /// Show the commits attached to a version snapshot.
    Show {
        /// Version id.
        version_id: String,
    },
}
