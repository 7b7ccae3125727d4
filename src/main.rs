use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::env;
use std::path::Path;
use std::process;
use url::Url;

use envsync::context::{self, ContextFlags, ContextSource, LocalContext, ResolvedContext,
    SharedContext};
use envsync::error::{EnvSyncError, Result};
use envsync::remote::{HttpRemote, Remote};
use envsync::sync::{InteractivePrompter, NonInteractivePrompter, Prompter, SyncEngine,
    SyncOptions};
use envsync::tracker::VersionStore;
use envsync::{auth, envfile};

/// Command-line interface for envsync.
#[derive(Parser)]
#[command(name = "envsync")]
#[command(about = "Versioned environment-variable sync with a remote snapshot store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    globals: GlobalArgs,
}

#[derive(Args)]
struct GlobalArgs {
    /// Organization name or slug
    #[arg(long, global = true, env = "ENVSYNC_ORG")]
    org: Option<String>,
    /// Project name or slug
    #[arg(long, global = true, env = "ENVSYNC_PROJECT")]
    project: Option<String>,
    /// Environment name or slug
    #[arg(short = 'e', long, global = true, env = "ENVSYNC_ENVIRONMENT")]
    environment: Option<String>,
    /// Working env file
    #[arg(long, global = true, default_value = ".env")]
    file: String,
    /// Machine-readable output; interactive prompts are disabled
    #[arg(long, global = true)]
    json: bool,
    /// Skip overwrite confirmations
    #[arg(short = 'y', long, global = true)]
    yes: bool,
    /// Remote API base URL
    #[arg(
        long,
        global = true,
        env = "ENVSYNC_API_URL",
        default_value = "https://api.envsync.dev/"
    )]
    api_url: Url,
    /// Service token; enables non-interactive service mode
    #[arg(long, global = true, env = "ENVSYNC_TOKEN", hide_env_values = true)]
    service_token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the current (or a pinned) snapshot into the working file
    Pull {
        /// Pull a specific version instead of the current one
        #[arg(long)]
        version: Option<u64>,
    },
    /// Submit the working file as a new snapshot version
    Push {
        /// Skip base-version checking; always accepted, flagged forced
        #[arg(short = 'f', long)]
        force: bool,
    },
    /// Roll the remote back to an earlier version (appends a new one)
    Rollback {
        /// Target version number
        version: u64,
    },
    /// Print the working file with local overrides applied
    Print,
    /// Show the resolved (org, project, environment) context
    Context,
    /// Manage environments
    Env {
        #[command(subcommand)]
        action: EnvAction,
    },
    /// Store a personal access token
    Login {
        /// Token value (prompts when omitted)
        #[arg(long)]
        token: Option<String>,
    },
    /// Remove the stored personal access token
    Logout,
}

#[derive(Subcommand)]
enum EnvAction {
    /// List the environments of the resolved project
    List,
    /// Create a new environment in the resolved project
    Create { name: String },
    /// Clone the resolved environment under a new name
    Clone { name: String },
    /// Delete the resolved environment
    Delete {
        /// Delete permanently instead of soft-deleting
        #[arg(long)]
        hard: bool,
    },
}

/// The single place where errors become exit codes and output. Every
/// command funnels through here exactly once.
fn main() {
    let cli = Cli::parse();
    let json = cli.globals.json;
    if let Err(err) = run(cli) {
        if json {
            let payload = serde_json::json!({
                "error": err.kind(),
                "message": err.to_string(),
            });
            eprintln!("{}", payload);
        } else {
            eprintln!("{} {}", "error:".red().bold(), err);
            if matches!(err, EnvSyncError::Conflict { .. }) {
                eprintln!(
                    "{}",
                    "hint: run 'envsync pull' to fetch the latest snapshot, then push again"
                        .yellow()
                );
            }
        }
        process::exit(err.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let globals = cli.globals;

    // login/logout manage the credential store itself and need no
    // resolved context
    match &cli.command {
        Commands::Login { token } => return login(token.clone(), globals.json),
        Commands::Logout => return logout(globals.json),
        _ => {}
    }

    let (token, service_mode) = auth::resolve_token(globals.service_token.clone())?;
    let interactive = !globals.json && !service_mode;
    let remote = HttpRemote::new(globals.api_url.clone(), token);
    let dir = env::current_dir()?;

    let flags = ContextFlags {
        org: globals.org.clone(),
        project: globals.project.clone(),
        environment: globals.environment.clone(),
    };
    let resolved = match context::resolve(&flags, &dir, service_mode)? {
        Some(ctx) => ctx,
        None if interactive => select_context(&remote, &dir)?,
        None => {
            return Err(EnvSyncError::InteractiveRequired(
                "context selection".to_string(),
            ))
        }
    };

    if let Commands::Context = cli.command {
        return show_context(&resolved, globals.json);
    }

    let overrides = if service_mode {
        Default::default()
    } else {
        LocalContext::load(&dir)?
            .map(|local| local.overrides)
            .unwrap_or_default()
    };
    let mut tracker = VersionStore::load(VersionStore::default_path()?)?;
    let mut interactive_prompter = InteractivePrompter;
    let mut denying_prompter = NonInteractivePrompter;
    let prompter: &mut dyn Prompter = if interactive {
        &mut interactive_prompter
    } else {
        &mut denying_prompter
    };
    let options = SyncOptions {
        force: matches!(cli.command, Commands::Push { force: true }),
        assume_yes: globals.yes,
        service_mode,
    };

    let mut engine = SyncEngine::new(
        &remote,
        &mut tracker,
        prompter,
        resolved,
        overrides,
        &dir,
        &globals.file,
        options,
    );

    match cli.command {
        Commands::Pull { version } => {
            let outcome = engine.pull(version)?;
            if globals.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "version": outcome.version,
                        "variables": outcome.variable_count,
                        "backed_up": outcome.backed_up,
                    })
                );
            } else {
                println!(
                    "{} Pulled version {} ({} variables) into {}",
                    "✓".green(),
                    outcome.version,
                    outcome.variable_count,
                    globals.file
                );
                if outcome.backed_up {
                    println!("  Previous content saved to {}.backup", globals.file);
                }
            }
        }
        Commands::Push { .. } => {
            let outcome = engine.push()?;
            if globals.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "version": outcome.version,
                        "forced": outcome.forced,
                    })
                );
            } else if outcome.forced {
                println!(
                    "{} Force-pushed version {} (base-version check bypassed)",
                    "✓".green(),
                    outcome.version
                );
            } else {
                println!("{} Pushed version {}", "✓".green(), outcome.version);
            }
        }
        Commands::Rollback { version } => {
            let report = engine.rollback(version)?;
            if globals.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "rolled_back_from": report.rolled_back_from,
                        "rolled_back_to": report.rolled_back_to,
                        "version": report.new_version,
                    })
                );
            } else {
                println!(
                    "{} Rolled back from version {} to the content of version {} (new version {})",
                    "✓".green(),
                    report.rolled_back_from,
                    report.rolled_back_to,
                    report.new_version
                );
            }
        }
        Commands::Print => {
            let text = engine.print()?;
            if globals.json {
                println!("{}", serde_json::to_string_pretty(&envfile::parse(&text))?);
            } else {
                print!("{}", text);
            }
        }
        Commands::Env { action } => run_env_action(&mut engine, action, globals.json)?,
        Commands::Context | Commands::Login { .. } | Commands::Logout => unreachable!(),
    }
    Ok(())
}

fn run_env_action(engine: &mut SyncEngine<'_>, action: EnvAction, json: bool) -> Result<()> {
    match action {
        EnvAction::List => {
            let environments = engine.list_environments()?;
            if json {
                let names: Vec<_> = environments
                    .iter()
                    .map(|e| serde_json::json!({"id": e.id, "name": e.name, "slug": e.slug}))
                    .collect();
                println!("{}", serde_json::Value::Array(names));
            } else {
                for environment in environments {
                    println!("{}  ({})", environment.name, environment.slug);
                }
            }
        }
        EnvAction::Create { name } => {
            let environment = engine.create_environment(&name)?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({"id": environment.id, "name": environment.name})
                );
            } else {
                println!("{} Created environment {}", "✓".green(), environment.name);
            }
        }
        EnvAction::Clone { name } => {
            let environment = engine.clone_environment(&name)?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({"id": environment.id, "name": environment.name})
                );
            } else {
                println!(
                    "{} Cloned {} into {}",
                    "✓".green(),
                    engine.context(),
                    environment.name
                );
            }
        }
        EnvAction::Delete { hard } => {
            let context = engine.context().clone();
            engine.delete_environment(hard)?;
            if json {
                println!("{}", serde_json::json!({"deleted": context.environment}));
            } else {
                println!("{} Deleted environment {}", "✓".green(), context);
            }
        }
    }
    Ok(())
}

fn show_context(resolved: &ResolvedContext, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(resolved)?);
    } else {
        println!("Organization: {}", resolved.org);
        println!("Project:      {}", resolved.project);
        println!("Environment:  {}", resolved.environment);
        println!("Source:       {}", resolved.source);
    }
    Ok(())
}

/// Interactive fallback when no context resolves: pick org, project and
/// environment from the remote listings, then persist the shared
/// context file for the team.
fn select_context(remote: &dyn Remote, dir: &Path) -> Result<ResolvedContext> {
    let organizations = remote.list_organizations()?;
    if organizations.is_empty() {
        return Err(EnvSyncError::NotFound("organization listing".to_string()));
    }
    let names: Vec<String> = organizations.iter().map(|o| o.name.clone()).collect();
    let choice = inquire::Select::new("Select an organization:", names).raw_prompt()?;
    let org = &organizations[choice.index];

    let projects = remote.list_projects(org.id)?;
    if projects.is_empty() {
        return Err(EnvSyncError::NotFound(format!(
            "projects in organization '{}'",
            org.name
        )));
    }
    let names: Vec<String> = projects.iter().map(|p| p.name.clone()).collect();
    let choice = inquire::Select::new("Select a project:", names).raw_prompt()?;
    let project = &projects[choice.index];

    let environments = remote.list_environments(project.id)?;
    if environments.is_empty() {
        return Err(EnvSyncError::NotFound(format!(
            "environments in project '{}'",
            project.name
        )));
    }
    let names: Vec<String> = environments.iter().map(|e| e.name.clone()).collect();
    let choice = inquire::Select::new("Select an environment:", names).raw_prompt()?;
    let environment = &environments[choice.index];

    let shared = SharedContext {
        org: org.slug.clone(),
        project: project.slug.clone(),
        environment: environment.slug.clone(),
    };
    shared.save(dir)?;
    println!(
        "{} Saved context to {}",
        "✓".green(),
        context::SHARED_FILE
    );

    Ok(ResolvedContext {
        org: shared.org,
        project: shared.project,
        environment: shared.environment,
        source: ContextSource::Interactive,
    })
}

fn login(token: Option<String>, json: bool) -> Result<()> {
    let token = match token {
        Some(token) => token,
        None if json => {
            return Err(EnvSyncError::InteractiveRequired(
                "token entry".to_string(),
            ))
        }
        None => inquire::Password::new("Personal access token:")
            .without_confirmation()
            .prompt()?,
    };
    if token.trim().is_empty() {
        return Err(EnvSyncError::Validation("token must not be empty".into()));
    }
    auth::store_token(token.trim())?;
    if json {
        println!("{}", serde_json::json!({"logged_in": true}));
    } else {
        println!("{} Token stored in the system keychain", "✓".green());
    }
    Ok(())
}

fn logout(json: bool) -> Result<()> {
    let existed = auth::clear_token()?;
    if json {
        println!("{}", serde_json::json!({"logged_out": existed}));
    } else if existed {
        println!("{} Token removed", "✓".green());
    } else {
        println!("No stored token to remove");
    }
    Ok(())
}
