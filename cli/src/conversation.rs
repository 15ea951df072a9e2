use clap::Subcommand;
use cpe_dialog::DialogStore;

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConversationCommand {
    /// List stored messages, most recent first.
    List,
    /// Print a message's dialog (root to leaf).
    Print { id: String },
    /// Delete one or more messages.
    Delete {
        /// Delete each message's entire subtree instead of failing on children.
        #[arg(long)]
        cascade: bool,
        ids: Vec<String>,
    },
}

pub fn run(store: &DialogStore, command: ConversationCommand) -> Result<(), CliError> {
    match command {
        ConversationCommand::List => {
            for message in store.list_messages(0, false)? {
                let id = message.persisted_id().unwrap_or("?");
                let title = message.title().unwrap_or("");
                println!("{id}\t{}\t{title}", message.role);
            }
            Ok(())
        }
        ConversationCommand::Print { id } => {
            for message in store.get_dialog_for_message(&id)? {
                let mid = message.persisted_id().unwrap_or("?");
                println!("[{mid}] {}", message.role);
                for block in &message.blocks {
                    println!("  ({}) {}", block.block_type, block.content);
                }
            }
            Ok(())
        }
        ConversationCommand::Delete { cascade, ids } => {
            store.delete_messages(&ids, cascade)?;
            println!("deleted {} message(s)", ids.len());
            Ok(())
        }
    }
}
