use anyhow::{Result, bail};
use clap::Subcommand;
use replyflow_core::config::AppConfig;
use replyflow_core::contact::{ContactRemark, ContactRemarkStore};
use replyflow_infrastructure::{JsonContactStore, ReplyflowPaths};

#[derive(Subcommand, Debug)]
pub enum ContactsAction {
    /// List every stored contact
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one contact
    Get { target_id: String },
    /// Create or update a contact
    Set {
        target_id: String,
        display_name: String,
        /// Name used in replies instead of the display name
        #[arg(short, long)]
        remark: Option<String>,
    },
}

pub async fn execute(config: &AppConfig, action: ContactsAction) -> Result<()> {
    let store = JsonContactStore::new(ReplyflowPaths::contacts_file(&config.storage)?);

    match action {
        ContactsAction::List { json } => {
            let contacts = store.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&contacts)?);
            } else if contacts.is_empty() {
                println!("No contacts in {}", store.path().display());
            } else {
                for contact in &contacts {
                    println!("{}", format_contact(contact));
                }
            }
        }
        ContactsAction::Get { target_id } => match store.get(&target_id).await? {
            Some(contact) => println!("{}", format_contact(&contact)),
            None => bail!("No contact with id '{target_id}'"),
        },
        ContactsAction::Set {
            target_id,
            display_name,
            remark,
        } => {
            let contact = store
                .set(&target_id, &display_name, remark.as_deref())
                .await?;
            println!("Saved {}", format_contact(&contact));
        }
    }
    Ok(())
}

fn format_contact(contact: &ContactRemark) -> String {
    match contact.remark.as_deref() {
        Some(remark) if !remark.trim().is_empty() => {
            format!("{}\t{}\t({})", contact.target_id, contact.display_name, remark)
        }
        _ => format!("{}\t{}", contact.target_id, contact.display_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_contact() {
        let mut contact = ContactRemark {
            target_id: "42".into(),
            display_name: "Bob".into(),
            remark: Some("supplier".into()),
        };
        assert_eq!(format_contact(&contact), "42\tBob\t(supplier)");
        contact.remark = None;
        assert_eq!(format_contact(&contact), "42\tBob");
    }
}
