use anyhow::Result;
use clap::{Parser, Subcommand};

use corelens::commands::{
    detect_core_command, import_command, init_project_command, list_flags_command,
    list_runs_command, modules_command, project_info_command, tree_command,
};
use corelens::init_logging;

/// Core detection and functional module mapping over application object graphs.
///
/// This CLI is a thin wrapper around `corelens-core` (exposed in code as
/// `corelens_core`). All substantive logic lives in the library.
#[derive(Parser, Debug)]
#[command(
    name = "corelens",
    version,
    about = "Find an application's core and map its modules",
    long_about = None
)]
struct Cli {
    /// Enable debug logging on stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new project at the given root.
    ///
    /// Creates `.corelens/project.json`, the project database, and `reports/`.
    InitProject {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Optional project name. If omitted, the name is derived from the root directory.
        #[arg(long)]
        name: Option<String>,
    },

    /// Show project configuration, imported applications, and run counts.
    ProjectInfo {
        #[arg(long, default_value = ".")]
        root: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Import a graph snapshot (JSON or YAML) into the project database.
    Import {
        #[arg(long, default_value = ".")]
        root: String,

        /// Snapshot file, relative to the project root unless absolute.
        #[arg(long)]
        file: String,

        /// Application name overriding the one in the snapshot.
        #[arg(long)]
        application: Option<String>,
    },

    /// Print the naming tree of an application.
    Tree {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        application: String,

        /// JAVA, NET, or COBOL.
        #[arg(long)]
        language: String,

        /// Hide leaves deeper than this.
        #[arg(long)]
        max_depth: Option<usize>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Detect an application's core and flag external objects extending it.
    DetectCore {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        application: String,

        /// JAVA, NET, or COBOL.
        #[arg(long)]
        language: String,

        /// Detection config (JSON or YAML) replacing the project's settings.
        #[arg(long)]
        config: Option<String>,

        /// Report candidates without flagging them.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Slice an application into modules and link them through the call graph.
    Modules {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        application: String,

        /// JAVA, NET, or COBOL.
        #[arg(long)]
        language: String,

        /// Slice depth; defaults to the project's `slice_depth`.
        #[arg(long)]
        depth: Option<usize>,

        /// Duplicate member policy: last_wins or first_wins.
        #[arg(long)]
        policy: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List recorded detection runs.
    ListRuns {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        application: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List flags written by detection runs.
    ListFlags {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        application: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Command::InitProject { root, name } => init_project_command(&root, name)?,
        Command::ProjectInfo { root, json } => project_info_command(&root, json)?,
        Command::Import { root, file, application } => import_command(&root, &file, application)?,
        Command::Tree { root, application, language, max_depth, json } => {
            tree_command(&root, &application, &language, max_depth, json)?
        }
        Command::DetectCore { root, application, language, config, dry_run, json } => {
            detect_core_command(&root, &application, &language, config, dry_run, json)?
        }
        Command::Modules { root, application, language, depth, policy, json } => {
            modules_command(&root, &application, &language, depth, policy, json)?
        }
        Command::ListRuns { root, application, json } => {
            list_runs_command(&root, application, json)?
        }
        Command::ListFlags { root, application, json } => {
            list_flags_command(&root, application, json)?
        }
    }

    Ok(())
}
