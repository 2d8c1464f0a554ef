use std::io::{self, Write};
use std::path::Path;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use tracing::{debug, instrument};

use crate::application::services::{EntryManager, EntryStore, LoadPolicy};
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::EntryId;
use crate::infrastructure::di::ServiceContainer;

/// Resolve settings from config layers plus command line overrides.
pub fn resolve_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.storage_dir {
        settings.storage_dir = dir.clone();
    }
    if cli.skip_malformed {
        settings.load_policy = LoadPolicy::SkipMalformed;
    }
    debug!("settings: {:?}", settings);
    Ok(settings)
}

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    if let Some(Commands::Completion { shell }) = &cli.command {
        _completion(*shell);
        return Ok(());
    }
    let container = ServiceContainer::new(resolve_settings(cli)?);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(cli, &container, &mut out)
}

/// Dispatch a parsed command against `container`, writing listings to `out`.
pub fn run<W: Write>(cli: &Cli, container: &ServiceContainer, out: &mut W) -> CliResult<()> {
    match &cli.command {
        Some(Commands::List) => _list(container, out),
        Some(Commands::Show { title, fancy }) => _show(container, title, *fancy, out),
        Some(Commands::Add { title }) => _add(container, title),
        Some(Commands::Attach { root, child, under }) => {
            _attach(container, root, child, under.as_deref())
        }
        Some(Commands::Import { file }) => _import(container, file),
        Some(Commands::Info) => _info(container, out),
        Some(Commands::Completion { shell }) => {
            _completion(*shell);
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, run with --help for usage".to_string(),
        )),
    }
}

fn stdout_err(e: io::Error) -> CliError {
    ApplicationError::io("write output", e).into()
}

fn print_entry<W: Write>(
    manager: &EntryManager,
    id: EntryId,
    indent: &str,
    fancy: bool,
    out: &mut W,
) -> CliResult<()> {
    let outline = manager.outline();
    if fancy {
        write!(out, "{}", outline.render_tree(id)?).map_err(stdout_err)
    } else {
        outline.entry(id)?.print_tree(0, out, indent).map_err(stdout_err)
    }
}

/// Load the stored tree titled `title` into `manager`.
fn load_stored(manager: &mut EntryManager, title: &str) -> CliResult<EntryId> {
    let path = manager
        .storage_path()
        .join(EntryStore::file_name_for(title)?);
    if !manager.store().fs().exists(&path) {
        return Err(CliError::InvalidArgs(format!(
            "no entry titled '{}' in {}",
            title,
            manager.storage_path().display()
        )));
    }
    Ok(manager.load_file(&path)?)
}

#[instrument(skip(container, out))]
fn _list<W: Write>(container: &ServiceContainer, out: &mut W) -> CliResult<()> {
    let mut manager = container.entry_manager();
    if !manager.store().fs().is_dir(manager.storage_path()) {
        output::warning(&format!(
            "storage directory does not exist: {}",
            manager.storage_path().display()
        ));
        return Ok(());
    }
    let report = manager.load_all()?;
    for skipped in &report.skipped {
        output::warning(&format!("skipped {}: {}", skipped.path.display(), skipped.reason));
    }
    if manager.is_empty() {
        output::warning(&format!("no entries in {}", manager.storage_path().display()));
        return Ok(());
    }
    for &id in manager.roots() {
        print_entry(&manager, id, &container.settings.print_indent, false, out)?;
    }
    Ok(())
}

#[instrument(skip(container, out))]
fn _show<W: Write>(
    container: &ServiceContainer,
    title: &str,
    fancy: bool,
    out: &mut W,
) -> CliResult<()> {
    let mut manager = container.entry_manager();
    let id = load_stored(&mut manager, title)?;
    print_entry(&manager, id, &container.settings.print_indent, fancy, out)
}

#[instrument(skip(container))]
fn _add(container: &ServiceContainer, title: &str) -> CliResult<()> {
    let mut manager = container.entry_manager();
    let path = manager
        .storage_path()
        .join(EntryStore::file_name_for(title)?);
    if container.fs.exists(&path) {
        return Err(CliError::InvalidArgs(format!(
            "entry already exists: {}",
            path.display()
        )));
    }
    manager.add_root(title);
    for written in manager.save_all()? {
        output::success(&format!("created {}", written.display()));
    }
    Ok(())
}

#[instrument(skip(container))]
fn _attach(
    container: &ServiceContainer,
    root: &str,
    child: &str,
    under: Option<&str>,
) -> CliResult<()> {
    let mut manager = container.entry_manager();
    let root_id = load_stored(&mut manager, root)?;

    let parent_id = match under {
        None => root_id,
        Some(target) => manager
            .outline()
            .iter(root_id)
            .find(|(_, node)| node.title == target)
            .map(|(id, _)| id)
            .ok_or_else(|| {
                CliError::InvalidArgs(format!("no entry titled '{}' below '{}'", target, root))
            })?,
    };

    let child_id = manager.outline_mut().create_entry(child);
    manager.attach_child(parent_id, child_id)?;
    let path = manager.save_entry(root_id)?;
    output::success(&format!("attached '{}' in {}", child, path.display()));
    Ok(())
}

#[instrument(skip(container))]
fn _import(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    let mut manager = container.entry_manager();
    let id = manager.load_file(file)?;
    let path = manager.save_entry(id)?;
    output::success(&format!("imported {} to {}", file.display(), path.display()));
    Ok(())
}

fn _info<W: Write>(container: &ServiceContainer, out: &mut W) -> CliResult<()> {
    let global = global_config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<none>".to_string());
    writeln!(out, "# global config: {}", global).map_err(stdout_err)?;
    write!(out, "{}", container.settings.to_toml()?).map_err(stdout_err)
}

fn _completion(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
