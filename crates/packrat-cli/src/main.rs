mod args;
mod handlers;

use anyhow::Result;
use args::{Cli, Command};
use clap::Parser;
use packrat_runtime::{resolve_workspace_path, ConcurrencyProfile, DiscoveryScope, Workspace};
use packrat_types::SessionSource;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = resolve_workspace_path(cli.path.as_deref())?;
    let workspace = Workspace::open(root)?;

    match cli.command {
        Command::Refresh { scope, background } => {
            let profile = if background {
                ConcurrencyProfile::light_background()
            } else {
                ConcurrencyProfile::interactive()
            };
            let sessions = handlers::refresh(&workspace, scope.into(), profile, false).await?;
            eprintln!("{} sessions indexed", sessions.len());
        }

        Command::List {
            source,
            limit,
            json,
            no_refresh,
        } => {
            // --no-refresh still hydrates an empty catalog from the cache;
            // it only skips the rescan.
            let mut sessions = if no_refresh {
                workspace.sessions()
            } else {
                Vec::new()
            };
            if sessions.is_empty() {
                sessions = handlers::refresh(
                    &workspace,
                    DiscoveryScope::Recent,
                    ConcurrencyProfile::interactive(),
                    true,
                )
                .await?;
            }

            if let Some(name) = source {
                let Some(source) = SessionSource::from_name(&name) else {
                    anyhow::bail!("unknown source '{name}'");
                };
                sessions.retain(|s| s.source == source);
            }
            handlers::print_sessions(&sessions, limit, json)?;
        }

        Command::Show { id, json } => {
            handlers::refresh(
                &workspace,
                DiscoveryScope::Recent,
                ConcurrencyProfile::interactive(),
                true,
            )
            .await?;
            let session = handlers::find_session_or_bail(&workspace, &id)?;
            handlers::print_session(&session, json)?;
        }

        Command::Pin { id } => {
            handlers::refresh(
                &workspace,
                DiscoveryScope::Recent,
                ConcurrencyProfile::interactive(),
                true,
            )
            .await?;
            let session = handlers::find_session_or_bail(&workspace, &id)?;
            handlers::pin(&workspace, &session)?;
        }

        Command::Unpin { id, remove } => {
            handlers::unpin(&workspace, &id, remove)?;
        }

        Command::Archives { json } => {
            handlers::archives(&workspace, json)?;
        }

        Command::Sync => {
            handlers::sync(&workspace)?;
        }
    }

    Ok(())
}
