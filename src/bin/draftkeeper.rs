use clap::Parser;
use draftkeeper::cli::{Args, Command, DraftsCommand, SettingsCommand};
use draftkeeper::{
    DraftStore, JsonSettings, Resolution, Session, SessionEvent, SessionResult, TokioFiles,
};
use draftkeeper_watcher::NotifyWatchProvider;
use std::error::Error;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "draftkeeper=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = JsonSettings::new(&args.settings);

    match args.command {
        Command::Drafts { action } => {
            let store = DraftStore::open(&args.database)?;
            drafts(&store, action).await?;
        }
        Command::Settings { action } => match action {
            SettingsCommand::Show => {
                let current = settings.load().await;
                println!("{}", serde_json::to_string_pretty(&current)?);
            }
            SettingsCommand::Reset => {
                settings.reset().await?;
                tracing::info!("Removed {}", settings.path().display());
            }
        },
        Command::Edit { file } => {
            tracing::info!("Using draft database at: {}", args.database.display());
            let store = DraftStore::open(&args.database)?;
            let mut session = Session::new(
                Arc::new(TokioFiles),
                Arc::new(NotifyWatchProvider::new()),
                Arc::new(settings),
                store,
            );
            edit(&mut session, &file).await?;
        }
    }

    Ok(())
}

async fn drafts(store: &DraftStore, action: DraftsCommand) -> Result<(), Box<dyn Error>> {
    match action {
        DraftsCommand::List => {
            for draft in store.list().await? {
                let saved = chrono::DateTime::from_timestamp_millis(draft.timestamp)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| draft.timestamp.to_string());
                println!("{}\t{}\t{} bytes", draft.file_path, saved, draft.content.len());
            }
        }
        DraftsCommand::Show { path } => match store.get(&path).await? {
            Some(draft) => print!("{}", draft.content),
            None => eprintln!("No draft for {}", path),
        },
        DraftsCommand::Discard { path } => {
            store.remove(&path).await?;
            tracing::info!("Discarded draft for {}", path);
        }
    }
    Ok(())
}

async fn edit(session: &mut Session, file: &str) -> Result<(), Box<dyn Error>> {
    let mut events = session.subscribe();
    if session.open_file(file).await? == Resolution::AwaitingUserChoice {
        println!("An unsaved draft of {} differs from the file.", file);
        if let Some(recovery) = session.recovery() {
            println!("  file:  {} bytes", recovery.file_content().len());
            if let Some(draft) = recovery.draft() {
                let saved = chrono::DateTime::from_timestamp_millis(draft.timestamp)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| draft.timestamp.to_string());
                println!("  draft: {} bytes, saved {}", draft.content.len(), saved);
            }
        }
        println!("Type :draft to restore it or :file to discard it.");
    }
    while let Ok(event) = events.try_recv() {
        print_event(&event, session);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.as_str() {
                    ":q" => break,
                    ":q!" => {
                        session.close_discarding().await?;
                        return Ok(());
                    }
                    ":w" => report(session.save().await),
                    ":reload" => report(session.accept_external_change().await),
                    ":keep" => report(session.dismiss_external_change()),
                    ":draft" => report(session.choose_draft().await.map(|_| ())),
                    ":file" => report(session.choose_file().await.map(|_| ())),
                    text => {
                        let Some(path) = session.current_path().map(str::to_string) else {
                            break;
                        };
                        let mut buffer = session.buffer().unwrap_or_default().to_string();
                        if !buffer.is_empty() {
                            buffer.push('\n');
                        }
                        buffer.push_str(text);
                        report(session.on_buffer_changed(&path, &buffer).await);
                    }
                }
            }
            wakeup = session.next_wakeup() => {
                report(session.handle_wakeup(wakeup).await);
            }
        }

        while let Ok(event) = events.try_recv() {
            print_event(&event, session);
        }
    }

    session.close().await?;
    Ok(())
}

fn report(result: SessionResult<()>) {
    if let Err(e) = result {
        eprintln!("error: {}", e);
    }
}

fn print_event(event: &SessionEvent, session: &Session) {
    match event {
        SessionEvent::Opened { .. } | SessionEvent::Recovered { .. } | SessionEvent::Reloaded { .. } => {
            println!("----");
            println!("{}", session.buffer().unwrap_or_default());
            println!("----");
        }
        SessionEvent::Saved { path } => println!("saved {}", path),
        SessionEvent::SaveFailed { path, error } => {
            println!("could not save {} ({}), kept as draft", path, error)
        }
        SessionEvent::ExternalChangePending { path } => {
            println!("{} changed on disk. Type :reload or :keep.", path)
        }
        SessionEvent::WatchFailed { path, error } => {
            println!("not watching {} for changes: {}", path, error)
        }
        SessionEvent::StoreDegraded { error } => {
            println!("drafts are memory-only for this session: {}", error)
        }
        SessionEvent::Renamed { from, to } => println!("{} is now {}", from, to),
        _ => {}
    }
}
