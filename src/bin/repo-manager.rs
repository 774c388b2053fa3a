//! CLI for repo-manager.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use repo_manager::ci::{Pipeline, PipelineRunner, StepEvent};
use repo_manager::config::{PAT_ENV_VAR, config_dir, load_github_pat};
use repo_manager::logging;
use repo_manager::manager::local_branches;
use repo_manager::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "repo-manager")]
#[command(author, version, about = "Manage GitHub repositories and local clones", long_about = None)]
struct Cli {
    /// GitHub personal access token
    #[arg(long, global = true, env = PAT_ENV_VAR, hide_env_values = true)]
    token: Option<String>,

    /// GitHub API base URL (for GitHub Enterprise)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Path to the settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List your repositories
    List {
        /// Only repositories whose name or description contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Hide archived repositories
        #[arg(long)]
        active: bool,

        /// Hide forks
        #[arg(long)]
        source_only: bool,

        /// Only repositories in this language
        #[arg(short, long)]
        language: Option<String>,

        /// Only private repositories
        #[arg(long, conflicts_with = "public")]
        private: bool,

        /// Only public repositories
        #[arg(long)]
        public: bool,
    },

    /// Show repository details
    Show {
        /// Repository as `name` or `owner/name`
        repo: String,
    },

    /// Print a repository's README
    Readme { repo: String },

    /// Create a repository
    Create {
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        private: bool,

        /// Do not create an initial commit
        #[arg(long)]
        no_init: bool,

        /// Create under this organization instead of your account
        #[arg(long)]
        org: Option<String>,
    },

    /// Rename a repository and its local clone
    Rename { repo: String, new_name: String },

    /// Delete a repository on GitHub (local clones are kept)
    Delete {
        repo: String,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Clone a repository into the workspace
    Clone {
        repo: String,

        /// Destination directory
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Branch to check out
        #[arg(short, long)]
        branch: Option<String>,

        /// If the destination exists, repoint its origin instead of failing
        #[arg(long)]
        update_remote: bool,
    },

    /// Clone every repository that is missing locally
    Sync {
        /// Concurrent clones
        #[arg(short, long, default_value_t = repo_manager::tasks::DEFAULT_MAX_WORKERS)]
        workers: usize,
    },

    /// List local branches
    Branches {
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },

    /// Switch branches in a local clone
    Checkout {
        branch: String,

        /// Create the branch first
        #[arg(short, long)]
        create: bool,

        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },

    /// Show commit history
    Commits {
        repo: String,

        /// Branch (defaults to the repository's default branch)
        #[arg(short, long)]
        branch: Option<String>,

        #[arg(long, default_value_t = 30)]
        per_page: u8,

        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Read the local clone instead of the API
        #[arg(long)]
        local: bool,
    },

    /// List pull requests
    Prs {
        repo: String,

        /// open, closed or all
        #[arg(short, long, default_value = "all")]
        state: PrState,

        #[arg(long, default_value_t = 30)]
        per_page: u8,

        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Open a pull request
    PrCreate {
        repo: String,

        #[arg(short, long)]
        title: String,

        /// Branch with the changes
        #[arg(long)]
        head: String,

        /// Target branch (defaults to the repository's default branch)
        #[arg(long)]
        base: Option<String>,

        #[arg(long, default_value = "")]
        body: String,

        #[arg(long)]
        draft: bool,

        /// Let maintainers of the base repository push to the head branch
        #[arg(long)]
        maintainer_can_modify: bool,
    },

    /// Run the local CI pipeline
    Ci {
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check that the host has what the tool needs
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current settings
    Show,
    /// Set the directory new clones go to
    SetClonePath { path: PathBuf },
}

struct AppContext {
    store: ConfigStore,
    config: AppConfig,
    token: Option<String>,
    api_url: String,
}

impl AppContext {
    fn client(&self) -> Result<GitHubClient> {
        let token = self.token.clone().ok_or_else(|| {
            anyhow!(
                "No GitHub token configured; set {} or pass --token",
                PAT_ENV_VAR
            )
        })?;
        GitHubClient::with_enterprise(token, &self.api_url).context("Failed to create GitHub client")
    }

    fn workspace(&self) -> Workspace {
        Workspace::from_config(&self.config)
    }

    fn manager(&self) -> Result<RepoManager> {
        Ok(RepoManager::new(
            self.client()?,
            self.workspace(),
            GitCli::default(),
        ))
    }
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let store = match &cli.config {
        Some(path) => ConfigStore::at(path),
        None => ConfigStore::default_location()?,
    };
    let config = store.load();

    let log_dir = config_dir().ok().map(|dir| dir.join("logs"));
    if logging::init(&config, log_dir.as_deref()).is_err() {
        logging::init(&config, None).context("Failed to initialize logging")?;
    }

    let ctx = AppContext {
        token: cli.token.or_else(load_github_pat),
        api_url: cli.api_url.unwrap_or_else(|| config.api_url.clone()),
        store,
        config,
    };

    match cli.command {
        Commands::List {
            search,
            active,
            source_only,
            language,
            private,
            public,
        } => cmd_list(&ctx, search, active, source_only, language, private, public),
        Commands::Show { repo } => cmd_show(&ctx, &repo),
        Commands::Readme { repo } => cmd_readme(&ctx, &repo),
        Commands::Create {
            name,
            description,
            private,
            no_init,
            org,
        } => cmd_create(&ctx, name, description, private, no_init, org),
        Commands::Rename { repo, new_name } => cmd_rename(&ctx, &repo, &new_name),
        Commands::Delete { repo, yes } => cmd_delete(&ctx, &repo, yes),
        Commands::Clone {
            repo,
            path,
            branch,
            update_remote,
        } => cmd_clone(&ctx, &repo, path, branch, update_remote),
        Commands::Sync { workers } => cmd_sync(&ctx, workers),
        Commands::Branches { path } => cmd_branches(&path),
        Commands::Checkout {
            branch,
            create,
            path,
        } => cmd_checkout(&path, &branch, create),
        Commands::Commits {
            repo,
            branch,
            per_page,
            page,
            local,
        } => cmd_commits(&ctx, &repo, branch, per_page, page, local),
        Commands::Prs {
            repo,
            state,
            per_page,
            page,
        } => cmd_prs(&ctx, &repo, state, per_page, page),
        Commands::PrCreate {
            repo,
            title,
            head,
            base,
            body,
            draft,
            maintainer_can_modify,
        } => {
            let flags = PrFlags {
                draft,
                maintainer_can_modify,
            };
            cmd_pr_create(&ctx, &repo, title, head, base, body, flags)
        }
        Commands::Ci { path } => cmd_ci(&path),
        Commands::Config { action } => cmd_config(&ctx, action),
        Commands::Doctor => cmd_doctor(&ctx),
    }
}

fn parse_repo(repo: &str) -> Result<RepoRef> {
    repo.parse::<RepoRef>()
        .with_context(|| format!("Invalid repository '{}'", repo))
}

fn visibility(repo: &GitHubRepo) -> colored::ColoredString {
    if repo.is_private {
        "private".yellow()
    } else {
        "public".green()
    }
}

fn cmd_list(
    ctx: &AppContext,
    search: Option<String>,
    active: bool,
    source_only: bool,
    language: Option<String>,
    private: bool,
    public: bool,
) -> Result<()> {
    let client = ctx.client()?;
    let mut repos = client
        .list_own_repos()
        .context("Failed to list repositories")?
        .matching(search.as_deref().unwrap_or_default());

    if active {
        repos = repos.active();
    }
    if source_only {
        repos = repos.source_only();
    }
    if let Some(ref lang) = language {
        repos = repos.with_language(lang);
    }
    if private {
        repos = repos.private_only();
    } else if public {
        repos = repos.public_only();
    }

    let workspace = ctx.workspace();
    for repo in &repos {
        let cloned = if workspace.local_repo(&repo.name).is_some() {
            " [cloned]".cyan().to_string()
        } else {
            String::new()
        };
        let archived = if repo.archived {
            " [archived]".dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            "{} ({}){}{} {}",
            repo.full_name.bold(),
            visibility(repo),
            archived,
            cloned,
            repo.language.as_deref().unwrap_or("").dimmed()
        );
        if let Some(ref desc) = repo.description {
            println!("    {}", desc);
        }
    }
    println!("\n{} repositories", repos.len());

    Ok(())
}

fn cmd_show(ctx: &AppContext, repo: &str) -> Result<()> {
    let manager = ctx.manager()?;
    let details = manager
        .details(&parse_repo(repo)?)
        .context("Failed to load repository")?;
    let repo = &details.repo;

    println!("{} ({})", repo.full_name.bold(), visibility(repo));
    if let Some(ref desc) = repo.description {
        println!("{}", desc);
    }
    println!("  URL:            {}", repo.html_url);
    println!("  Clone URL:      {}", repo.clone_url);
    println!(
        "  Default branch: {}",
        repo.default_branch.as_deref().unwrap_or("-")
    );
    println!(
        "  Language:       {}",
        repo.language.as_deref().unwrap_or("-")
    );
    if let Some(created) = repo.created_at {
        println!("  Created:        {}", created.format("%Y-%m-%d %H:%M"));
    }
    if let Some(updated) = repo.updated_at {
        println!("  Updated:        {}", updated.format("%Y-%m-%d %H:%M"));
    }
    if !repo.topics.is_empty() {
        println!("  Topics:         {}", repo.topics.join(", "));
    }
    if repo.archived {
        println!("  {}", "Archived".yellow());
    }
    if repo.fork {
        println!("  {}", "Fork".dimmed());
    }

    match &details.local_path {
        Some(path) => {
            println!("\n  Local clone:    {}", path.display());
            if let Some(ref branches) = details.branches {
                print_branches(branches);
            }
        }
        None => println!("\n  {}", "Not cloned locally".dimmed()),
    }

    match &details.readme {
        Some(_) => println!("\n  README available (repo-manager readme {})", repo.name),
        None => println!("\n  {}", "No README".dimmed()),
    }

    Ok(())
}

fn cmd_readme(ctx: &AppContext, repo: &str) -> Result<()> {
    let client = ctx.client()?;
    match client
        .get_readme(&parse_repo(repo)?)
        .context("Failed to fetch README")?
    {
        Some(text) => println!("{}", text),
        None => println!("{}", "No README found".yellow()),
    }
    Ok(())
}

fn cmd_create(
    ctx: &AppContext,
    name: String,
    description: Option<String>,
    private: bool,
    no_init: bool,
    org: Option<String>,
) -> Result<()> {
    let client = ctx.client()?;
    let mut request = CreateRepo::new(name).private(private).auto_init(!no_init);
    if let Some(desc) = description {
        request = request.description(desc);
    }
    if let Some(org) = org {
        request = request.in_org(org);
    }

    let repo = client
        .create_repo(&request)
        .context("Failed to create repository")?;
    println!("{} {}", "Created".green(), repo.full_name.bold());
    println!("  {}", repo.html_url);
    Ok(())
}

fn cmd_rename(ctx: &AppContext, repo: &str, new_name: &str) -> Result<()> {
    let manager = ctx.manager()?;
    let outcome = manager
        .rename(&parse_repo(repo)?, new_name)
        .context("Rename failed")?;

    println!("{} {}", "Repository is now".green(), outcome.repo.full_name.bold());
    if let Some(path) = outcome.local_path {
        println!("  Local clone: {}", path.display());
    }
    Ok(())
}

fn cmd_delete(ctx: &AppContext, repo: &str, yes: bool) -> Result<()> {
    if !yes {
        bail!(
            "Deleting '{}' cannot be undone; re-run with --yes to confirm",
            repo
        );
    }

    let manager = ctx.manager()?;
    let deleted = manager
        .delete(&parse_repo(repo)?)
        .context("Delete failed")?;
    println!("{} {}", "Deleted".red(), deleted.full_name.bold());
    if let Some(path) = manager.workspace().local_repo(&deleted.name) {
        println!("  Local clone kept at {}", path.display());
    }
    Ok(())
}

fn cmd_clone(
    ctx: &AppContext,
    repo: &str,
    path: Option<PathBuf>,
    branch: Option<String>,
    update_remote: bool,
) -> Result<()> {
    let manager = ctx.manager()?;
    let options = CloneOptions {
        branch,
        target: path,
        update_existing: update_remote,
    };

    match manager
        .clone_repo(&parse_repo(repo)?, options)
        .context("Clone failed")?
    {
        CloneOutcome::Cloned(path) => {
            println!("{} into {}", "Cloned".green(), path.display())
        }
        CloneOutcome::RemoteUpdated(path) => println!(
            "{} origin of existing clone at {}",
            "Updated".yellow(),
            path.display()
        ),
    }
    Ok(())
}

fn cmd_sync(ctx: &AppContext, workers: usize) -> Result<()> {
    let manager = ctx.manager()?;
    let repos = manager
        .client()
        .list_own_repos()
        .context("Failed to list repositories")?;
    println!(
        "Syncing {} repositories into {}",
        repos.len(),
        manager.workspace().base().display()
    );

    let results = manager.sync(repos, workers);
    let mut failed = 0;
    for (name, status) in &results {
        match status {
            SyncStatus::Cloned(path) => {
                println!("  {} {} -> {}", "cloned".green(), name, path.display())
            }
            SyncStatus::AlreadyPresent(_) => println!("  {} {}", "present".dimmed(), name),
            SyncStatus::Failed(e) => {
                failed += 1;
                println!("  {} {}: {}", "failed".red(), name, e)
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} repositories failed to clone", failed, results.len());
    }
    Ok(())
}

fn print_branches(branches: &repo_manager::manager::LocalBranches) {
    for name in &branches.names {
        if branches.current.as_deref() == Some(name.as_str()) {
            println!("  * {}", name.green());
        } else {
            println!("    {}", name);
        }
    }
    if branches.current.is_none() {
        println!("  {}", "(detached HEAD)".yellow());
    }
}

fn cmd_branches(path: &Path) -> Result<()> {
    let branches = local_branches(path)
        .with_context(|| format!("Failed to read branches in {}", path.display()))?;
    print_branches(&branches);
    Ok(())
}

fn cmd_checkout(path: &Path, branch: &str, create: bool) -> Result<()> {
    let git = GitOps::open(path)
        .with_context(|| format!("Failed to open repository at {}", path.display()))?;

    if create {
        git.checkout_new_branch(branch)
            .with_context(|| format!("Failed to create branch '{}'", branch))?;
        println!("Switched to a new branch '{}'", branch.green());
    } else {
        git.checkout_branch(branch)
            .with_context(|| format!("Failed to check out '{}'", branch))?;
        println!("Switched to branch '{}'", branch.green());
    }
    Ok(())
}

fn cmd_commits(
    ctx: &AppContext,
    repo: &str,
    branch: Option<String>,
    per_page: u8,
    page: u32,
    local: bool,
) -> Result<()> {
    let page = PageRequest::new(per_page, page)?;
    let reference = parse_repo(repo)?;

    if local {
        let path = ctx
            .workspace()
            .local_repo(&reference.name)
            .ok_or_else(|| anyhow!("'{}' is not cloned locally", reference.name))?;
        let git = GitOps::open(&path)?;
        if let Some(ref branch) = branch {
            if git.current_branch().ok().as_deref() != Some(branch.as_str()) {
                bail!("--local reads the checked-out branch; '{}' is not checked out", branch);
            }
        }
        let skip = (page.page() as usize - 1) * page.per_page() as usize;
        let commits = git.recent_commits(skip + page.per_page() as usize)?;
        for commit in commits.into_iter().skip(skip) {
            println!(
                "{} {} {} {}",
                commit.short_sha().yellow(),
                commit
                    .time
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_default()
                    .dimmed(),
                commit.author.cyan(),
                commit.summary
            );
        }
        return Ok(());
    }

    let client = ctx.client()?;
    let commits = client
        .list_commits(&reference, branch.as_deref(), page)
        .context("Failed to list commits")?;
    if commits.is_empty() {
        println!("{}", "No commits on this page".dimmed());
    }
    for commit in &commits {
        println!(
            "{} {} {} {}",
            commit.short_sha().yellow(),
            commit
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
                .dimmed(),
            commit.author.cyan(),
            commit.title()
        );
    }
    Ok(())
}

fn cmd_prs(ctx: &AppContext, repo: &str, state: PrState, per_page: u8, page: u32) -> Result<()> {
    let page = PageRequest::new(per_page, page)?;
    let client = ctx.client()?;
    let repo = client.resolve_repo(&parse_repo(repo)?)?;

    let prs = client
        .list_pull_requests(repo.owner(), &repo.name, state, page)
        .context("Failed to list pull requests")?;
    if prs.is_empty() {
        println!("{}", format!("No {} pull requests", state).dimmed());
    }
    for pr in &prs {
        let state = match (pr.state.as_str(), pr.merged) {
            (_, true) => "merged".magenta(),
            ("open", _) => "open".green(),
            (other, _) => other.red(),
        };
        println!(
            "#{} [{}] {} ({} -> {}) by {}",
            pr.number,
            state,
            pr.title.bold(),
            pr.head.ref_name,
            pr.base.ref_name,
            pr.user
        );
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct PrFlags {
    draft: bool,
    maintainer_can_modify: bool,
}

impl PrFlags {
    fn apply(self, mut request: CreatePullRequest) -> CreatePullRequest {
        if self.draft {
            request = request.draft();
        }
        if self.maintainer_can_modify {
            request = request.maintainer_can_modify();
        }
        request
    }
}

fn cmd_pr_create(
    ctx: &AppContext,
    repo: &str,
    title: String,
    head: String,
    base: Option<String>,
    body: String,
    flags: PrFlags,
) -> Result<()> {
    let client = ctx.client()?;
    let repo = client.resolve_repo(&parse_repo(repo)?)?;
    let base = base
        .or_else(|| repo.default_branch.clone())
        .unwrap_or_else(|| ctx.config.default_branch.clone());

    let request = flags.apply(CreatePullRequest::new(title, body, head, base));

    let pr = client
        .create_pull_request(repo.owner(), &repo.name, request)
        .context("Failed to create pull request")?;
    println!("{} #{} {}", "Opened".green(), pr.number, pr.title.bold());
    println!("  {}", pr.html_url);
    Ok(())
}

fn cmd_ci(path: &Path) -> Result<()> {
    let pipeline = Pipeline::load(path).context("Failed to load CI config")?;
    if let Some(ref name) = pipeline.name {
        println!("Pipeline {}", name.bold());
    }

    let report = PipelineRunner::new(path).run(&pipeline, |event| match event {
        StepEvent::Started { index, total, step } => {
            println!("[{}/{}] {}", index + 1, total, step.name.bold());
        }
        StepEvent::Finished { result, .. } => {
            if !result.stdout.is_empty() {
                print!("{}", result.stdout);
            }
            if !result.stderr.is_empty() {
                eprint!("{}", result.stderr);
            }
            let secs = result.duration.as_secs_f64();
            if result.success && result.exit_code == Some(0) {
                println!("  {} ({:.1}s)", "ok".green(), secs);
            } else if result.success {
                println!("  {} ({:.1}s, failure allowed)", "failed".yellow(), secs);
            } else {
                println!("  {} ({:.1}s)", "failed".red(), secs);
            }
        }
    });

    println!(
        "\n{} step(s) in {:.1}s",
        report.steps.len(),
        report.total_duration().as_secs_f64()
    );
    if let Some(step) = report.failed_step() {
        bail!("CI pipeline failed at step '{}'", step.name);
    }
    println!("{}", "CI pipeline passed".green());
    Ok(())
}

fn cmd_config(ctx: &AppContext, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("# {}", ctx.store.path().display());
            println!("{}", serde_json::to_string_pretty(&ctx.config)?);
        }
        ConfigAction::SetClonePath { path } => {
            ctx.store
                .set_clone_base_path(&path)
                .context("Failed to save settings")?;
            println!("Clone path set to {}", path.display());
        }
    }
    Ok(())
}

fn cmd_doctor(ctx: &AppContext) -> Result<()> {
    let report = check_system_requirements(&GitCli::default());
    let mark = |ok: bool| if ok { "ok".green() } else { "missing".red() };

    println!("OS:                  {}", report.os);
    if let Some(ref version) = report.macos_version {
        println!("macOS version:       {}", version);
    }
    println!(
        "git:                 {} {}",
        mark(report.git_version.is_some()),
        report.git_version.as_deref().unwrap_or("")
    );
    println!("Config dir writable: {}", mark(report.config_dir_writable));
    println!("Home writable:       {}", mark(report.home_writable));
    println!("GitHub token:        {}", mark(ctx.token.is_some()));

    if !report.all_requirements_met() {
        bail!("System requirements not met");
    }
    println!("{}", "All requirements met".green());
    Ok(())
}
