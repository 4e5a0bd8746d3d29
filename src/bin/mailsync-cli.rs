#![deny(clippy::all)]

//! CLI exerciser for the mailsync library: list mailboxes, sync one
//! mailbox, and dump a message's part tree.

use clap::{Parser, Subcommand};
use mailsync::{AccountConfig, Mailbox, MessageNode, ServerSession};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailsync-cli")]
#[command(about = "Sync an IMAP mailbox and inspect message structure")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List mailboxes on the server
    Mailboxes,

    /// Sync a mailbox and list its new messages
    Sync {
        /// Mailbox to sync
        #[arg(long, default_value = "INBOX")]
        mailbox: String,
    },

    /// Fetch one message and print its decomposed part tree
    Show {
        /// Message UID
        uid: u32,

        /// Mailbox containing the message
        #[arg(long, default_value = "INBOX")]
        mailbox: String,

        /// Mark the message as read on the server
        #[arg(long)]
        mark_seen: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = AccountConfig::from_env()?;
    let session = ServerSession::new(config);

    match &args.command {
        Command::Mailboxes => cmd_mailboxes(&session).await?,
        Command::Sync { mailbox } => cmd_sync(&session, mailbox).await?,
        Command::Show {
            uid,
            mailbox,
            mark_seen,
        } => cmd_show(&session, mailbox, *uid, *mark_seen).await?,
    }

    session.close().await;
    Ok(())
}

async fn cmd_mailboxes(session: &ServerSession) -> anyhow::Result<()> {
    for name in session.list_mailboxes().await? {
        println!("{name}");
    }
    Ok(())
}

async fn cmd_sync(session: &ServerSession, mailbox: &str) -> anyhow::Result<()> {
    let mut mailbox = Mailbox::new(mailbox);
    let new_mail = mailbox.update(session).await?;

    if new_mail.is_empty() {
        println!("No new messages.");
        return Ok(());
    }

    println!("{:<8} {}", "UID", "Subject");
    println!("{}", "-".repeat(60));
    for message in &new_mail {
        println!(
            "{:<8} {}",
            message.uid(),
            message.headers().get("Subject").unwrap_or("(no subject)")
        );
    }
    println!("\n{} new message(s), cursor at {}", new_mail.len(), mailbox.cursor());

    Ok(())
}

async fn cmd_show(
    session: &ServerSession,
    mailbox: &str,
    uid: u32,
    mark_seen: bool,
) -> anyhow::Result<()> {
    let mut mailbox = Mailbox::new(mailbox);
    mailbox.update(session).await?;

    let Some(message) = mailbox.get(uid) else {
        anyhow::bail!("UID {uid} not found in {}", mailbox.name());
    };

    message.load(session, mark_seen).await?;
    let Some(outcome) = message.parse_body() else {
        anyhow::bail!("body missing after load");
    };

    for (name, value) in message.headers().iter() {
        println!("{name}: {value}");
    }
    println!();

    let (node, error) = outcome.into_parts();
    print_node(&node, 0);

    if let Some(error) = error {
        eprintln!("\nsome parts could not be decomposed:\n{error}");
    }

    Ok(())
}

fn print_node(node: &MessageNode, depth: usize) {
    let indent = "  ".repeat(depth);
    match node.children() {
        Some(children) => {
            println!("{indent}{} ({} parts)", node.content_type, children.len());
            for child in children {
                print_node(child, depth + 1);
            }
        }
        None => {
            let body = node.body();
            let (len, kind) = body.map_or((0, "binary"), |b| {
                (b.as_bytes().len(), if b.is_text() { "text" } else { "binary" })
            });
            println!("{indent}{} ({kind}, {len} bytes)", node.content_type);
            if let Some(body) = body {
                if body.is_text() {
                    for line in String::from_utf8_lossy(body.as_bytes()).lines().take(5) {
                        println!("{indent}  | {line}");
                    }
                }
            }
        }
    }
}
