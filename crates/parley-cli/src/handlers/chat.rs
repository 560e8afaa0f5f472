//! Chat command handler.
//!
//! Resumes or starts a conversation, then multiplexes stdin lines and
//! session events until the user quits or ends the conversation.

use std::io::Write;

use anyhow::Result;
use parley_core::{ConversationSession, SessionEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::bootstrap::CliContext;
use crate::presentation::{HELP, Input, format_event, format_message, format_status};
use crate::store::{ConversationStore, SavedConversation};

/// Arguments for the chat command.
#[derive(Debug, Clone)]
pub struct ChatArgs {
    pub character: String,
    pub activity: String,
    /// Ignore the saved conversation.
    pub new: bool,
}

/// Execute the chat command.
pub async fn execute(ctx: CliContext, store: &ConversationStore, args: ChatArgs) -> Result<()> {
    let CliContext {
        session,
        mut events,
    } = ctx;

    let saved = if args.new {
        None
    } else {
        store.load_for(&args.character)
    };
    let conversation_id = session
        .initialize(saved, &args.activity, &args.character)
        .await?;
    store.save(&SavedConversation {
        conversation_id,
        character_id: args.character.clone(),
    })?;

    drain_events(&mut events)?;
    for message in session.messages() {
        println!("{}", format_message(&message));
    }
    println!("Type a message, or /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match Input::parse(&line) {
                    Input::Empty => {}
                    Input::Say(text) => {
                        if let Err(e) = session.send(&text) {
                            eprintln!("{e}");
                        }
                    }
                    Input::Stop => session.stop_playback(),
                    Input::Reset => {
                        session.reset();
                        println!("(reply abandoned)");
                    }
                    Input::Status => print_status(&session),
                    Input::End => {
                        session.end();
                        drain_events(&mut events)?;
                        store.clear()?;
                        break;
                    }
                    Input::Quit => break,
                    Input::Help => println!("{HELP}"),
                    Input::Unknown(command) => eprintln!("Unknown command {command}, try /help"),
                }
            }
            Some(event) = events.recv() => print_event(&event)?,
        }
    }

    Ok(())
}

/// Print whatever the session has queued without waiting.
fn drain_events(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Result<()> {
    while let Ok(event) = events.try_recv() {
        print_event(&event)?;
    }
    Ok(())
}

fn print_event(event: &SessionEvent) -> Result<()> {
    if let Some(text) = format_event(event) {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_status(session: &ConversationSession) {
    let playback = session.scheduler().snapshot();
    println!(
        "{}",
        format_status(
            session.conversation_id().as_ref(),
            session.user_message_count(),
            session.ready_for_assessment(),
            &playback,
        )
    );
}
