use std::sync::Arc;

use tracing::warn;

use murmur_core::{ChatMessage, Platform};
use murmur_extensions::{ContextProvider, Extension};
use murmur_threads::KnownUsers;

/// Tells the model who it is talking to, and who else it knows.
pub struct KnownUsersContext {
    users: Arc<KnownUsers>,
}

impl KnownUsersContext {
    pub fn new(users: Arc<KnownUsers>) -> Self {
        Self { users }
    }
}

impl Extension for KnownUsersContext {
    fn name(&self) -> &str {
        "known_users_context"
    }

    fn platforms(&self) -> &[Platform] {
        &[]
    }
}

impl ContextProvider for KnownUsersContext {
    fn get_context(&self, user_id: &str) -> Vec<ChatMessage> {
        let display_name = match self.users.display_name(user_id) {
            Ok(name) => name,
            Err(e) => {
                warn!(user_id, error = %e, "user directory lookup failed");
                return vec![];
            }
        };

        let mut context = vec![ChatMessage::system(format!(
            "You are chatting with {display_name} ({user_id}). Refer to this user by \
             their first name unless otherwise instructed."
        ))];

        match self.users.list() {
            Ok(list) if !list.is_empty() => {
                let roster: Vec<String> = list
                    .iter()
                    .map(|(id, u)| format!("{} ({})", u.display_name, id))
                    .collect();
                context.push(ChatMessage::system(format!(
                    "The list of known users on the platform are: {}.",
                    roster.join(", ")
                )));
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "user directory listing failed"),
        }

        context
    }
}
