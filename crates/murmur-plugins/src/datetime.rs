use murmur_core::{ChatMessage, Platform};
use murmur_extensions::{ContextProvider, Extension};

/// Tells the model what day it is.
pub struct DateTimeContext;

impl Extension for DateTimeContext {
    fn name(&self) -> &str {
        "datetime_context"
    }

    fn platforms(&self) -> &[Platform] {
        &[]
    }
}

impl ContextProvider for DateTimeContext {
    fn get_context(&self, _user_id: &str) -> Vec<ChatMessage> {
        let now = chrono::Local::now().format("%A, %Y-%m-%d, %H:%M:%S");
        vec![ChatMessage::system(format!(
            "The day of the week, date, and time are {now}, respectively."
        ))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::Role;

    #[test]
    fn emits_one_system_entry_with_a_weekday() {
        let ctx = DateTimeContext.get_context("@u:host");
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx[0].role, Role::System);
        let weekdays = [
            "Monday",
            "Tuesday",
            "Wednesday",
            "Thursday",
            "Friday",
            "Saturday",
            "Sunday",
        ];
        assert!(weekdays.iter().any(|d| ctx[0].content.contains(d)));
    }
}
