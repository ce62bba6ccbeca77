//! Menu buttons and their canned replies.

use crate::event::Button;

const BUTTONS: [(&str, &str, &str); 3] = [
    ("button1", "📚 Get Info", "Here’s some information for you 📚."),
    ("button2", "📊 Stats", "Here are your stats 📊."),
    ("button3", "💡 Tips", "Here’s a useful tip 💡."),
];

/// Buttons shown by the menu command, in display order.
pub fn menu_buttons() -> Vec<Button> {
    BUTTONS
        .iter()
        .map(|(id, label, _)| Button::new(*id, *label))
        .collect()
}

/// Canned reply for a button id; None for ids not on the menu.
pub fn button_reply(id: &str) -> Option<&'static str> {
    BUTTONS
        .iter()
        .find(|(b, _, _)| *b == id)
        .map(|(_, _, reply)| *reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_menu_button_has_a_reply() {
        for b in menu_buttons() {
            assert!(button_reply(&b.id).is_some(), "{} has no reply", b.id);
        }
    }

    #[test]
    fn known_and_unknown_ids() {
        assert_eq!(button_reply("button2"), Some("Here are your stats 📊."));
        assert_eq!(button_reply("button4"), None);
        assert_eq!(button_reply(""), None);
    }
}
