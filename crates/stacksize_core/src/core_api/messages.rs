use std::fmt::Display;

pub const MESSAGE_PREFIX: &str = "[Stack Size Controller]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    NotEnoughArguments,
    InvalidItemShortnameOrId,
    InvalidCategory,
    InvalidValue,
    OperationSuccessful,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Audience {
    #[default]
    Console,
    Player,
}

pub fn template(key: MessageKey) -> &'static str {
    match key {
        MessageKey::NotEnoughArguments => "This command requires {0} arguments.",
        MessageKey::InvalidItemShortnameOrId => {
            "Item shortname or id is incorrect. Try item-search [partial item name]"
        }
        MessageKey::InvalidCategory => "Category not found. Try list-categories",
        MessageKey::InvalidValue => {
            "'{0}' is not a valid stack size. Use a whole number, or a multiplier such as 2x"
        }
        MessageKey::OperationSuccessful => "Operation completed successfully.",
    }
}

/// Fills `{0}`, `{1}`, ... placeholders in the template for `key`.
pub fn format_message(key: MessageKey, args: &[&dyn Display]) -> String {
    let mut out = template(key).to_string();
    for (position, arg) in args.iter().enumerate() {
        out = out.replace(&format!("{{{position}}}"), &arg.to_string());
    }
    out
}

/// Console replies are never prefixed.
pub fn decorate(text: &str, audience: Audience, hide_prefix: bool) -> String {
    match audience {
        Audience::Player if !hide_prefix => format!("{MESSAGE_PREFIX} {text}"),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Audience, MessageKey, decorate, format_message};

    #[test]
    fn placeholders_are_filled() {
        assert_eq!(
            format_message(MessageKey::NotEnoughArguments, &[&2]),
            "This command requires 2 arguments."
        );
    }

    #[test]
    fn prefix_only_for_players() {
        assert_eq!(decorate("ok", Audience::Console, false), "ok");
        assert_eq!(
            decorate("ok", Audience::Player, false),
            "[Stack Size Controller] ok"
        );
        assert_eq!(decorate("ok", Audience::Player, true), "ok");
    }
}
