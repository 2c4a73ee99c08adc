use crate::category::ItemCategory;

use super::error::CoreError;
use super::messages::{MessageKey, format_message};
use super::types::{CategoryReportRow, ItemReportRow, PassReport};

/// An absolute stack size, or a multiplier when the operator suffixes `x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StackValue {
    Absolute(u32),
    Multiplier(f64),
}

impl StackValue {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        let invalid = || CoreError::invalid_argument(format_message(MessageKey::InvalidValue, &[&raw]));
        if let Some(number) = trimmed
            .strip_suffix('x')
            .or_else(|| trimmed.strip_suffix('X'))
        {
            let multiplier: f64 = number.trim().parse().map_err(|_| invalid())?;
            if !multiplier.is_finite() || multiplier < 0.0 {
                return Err(invalid());
            }
            return Ok(StackValue::Multiplier(multiplier));
        }
        trimmed
            .parse::<u32>()
            .map(StackValue::Absolute)
            .map_err(|_| invalid())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetStack { item: String, value: StackValue },
    SetStackLimit { item: String, limit: u32 },
    ClearStack { item: String },
    SetStackCategory { category: ItemCategory, value: StackValue },
    SetAllStacks { multiplier: f64 },
    IgnoreItem { item: String },
    UnignoreItem { item: String },
    ItemSearch { needle: String },
    ListCategories,
    ListCategoryItems { category: ItemCategory },
    RegenerateIndex,
    RegenerateBaseline,
    Apply,
    Revert,
}

impl Command {
    /// Validates argument count and shape. Item names are checked against
    /// the catalog later, when the command executes.
    pub fn parse(name: &str, args: &[&str]) -> Result<Self, CoreError> {
        let command = match name {
            "set-stack" => {
                expect_args(args, 2)?;
                Command::SetStack {
                    item: args[0].to_string(),
                    value: StackValue::parse(args[1])?,
                }
            }
            "set-stack-limit" => {
                expect_args(args, 2)?;
                match StackValue::parse(args[1])? {
                    StackValue::Absolute(limit) => Command::SetStackLimit {
                        item: args[0].to_string(),
                        limit,
                    },
                    StackValue::Multiplier(_) => {
                        return Err(CoreError::invalid_argument(format_message(
                            MessageKey::InvalidValue,
                            &[&args[1]],
                        )));
                    }
                }
            }
            "clear-stack" => {
                expect_args(args, 1)?;
                Command::ClearStack {
                    item: args[0].to_string(),
                }
            }
            "set-stack-category" => {
                expect_args(args, 2)?;
                Command::SetStackCategory {
                    category: parse_category(args[0])?,
                    value: parse_category_value(args[1])?,
                }
            }
            "set-all-stacks" => {
                expect_args(args, 1)?;
                let multiplier = match StackValue::parse(args[0])? {
                    StackValue::Multiplier(multiplier) => multiplier,
                    StackValue::Absolute(value) => f64::from(value),
                };
                Command::SetAllStacks { multiplier }
            }
            "ignore-item" => {
                expect_args(args, 1)?;
                Command::IgnoreItem {
                    item: args[0].to_string(),
                }
            }
            "unignore-item" => {
                expect_args(args, 1)?;
                Command::UnignoreItem {
                    item: args[0].to_string(),
                }
            }
            "item-search" => {
                expect_args(args, 1)?;
                Command::ItemSearch {
                    needle: args[0].to_string(),
                }
            }
            "list-categories" => Command::ListCategories,
            "list-category-items" => {
                expect_args(args, 1)?;
                Command::ListCategoryItems {
                    category: parse_category(args[0])?,
                }
            }
            "regenerate-index" => Command::RegenerateIndex,
            "regenerate-baseline" => Command::RegenerateBaseline,
            "apply" => Command::Apply,
            "revert" => Command::Revert,
            other => {
                return Err(CoreError::invalid_argument(format!(
                    "unknown command '{other}'"
                )));
            }
        };
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::SetStack { .. } => "set-stack",
            Command::SetStackLimit { .. } => "set-stack-limit",
            Command::ClearStack { .. } => "clear-stack",
            Command::SetStackCategory { .. } => "set-stack-category",
            Command::SetAllStacks { .. } => "set-all-stacks",
            Command::IgnoreItem { .. } => "ignore-item",
            Command::UnignoreItem { .. } => "unignore-item",
            Command::ItemSearch { .. } => "item-search",
            Command::ListCategories => "list-categories",
            Command::ListCategoryItems { .. } => "list-category-items",
            Command::RegenerateIndex => "regenerate-index",
            Command::RegenerateBaseline => "regenerate-baseline",
            Command::Apply => "apply",
            Command::Revert => "revert",
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Command::ItemSearch { .. } | Command::ListCategories | Command::ListCategoryItems { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Done { message: String, report: PassReport },
    Items(Vec<ItemReportRow>),
    Categories(Vec<CategoryReportRow>),
}

fn expect_args(args: &[&str], count: usize) -> Result<(), CoreError> {
    if args.len() != count {
        return Err(CoreError::invalid_argument(format_message(
            MessageKey::NotEnoughArguments,
            &[&count],
        )));
    }
    Ok(())
}

/// Plain numbers and `x` suffixes are multipliers, as in `set-all-stacks`.
/// A hard limit is written `limit=<n>`.
fn parse_category_value(raw: &str) -> Result<StackValue, CoreError> {
    let trimmed = raw.trim();
    if let Some(limit) = trimmed.strip_prefix("limit=") {
        return match StackValue::parse(limit)? {
            StackValue::Absolute(limit) => Ok(StackValue::Absolute(limit)),
            StackValue::Multiplier(_) => Err(CoreError::invalid_argument(format_message(
                MessageKey::InvalidValue,
                &[&raw],
            ))),
        };
    }
    Ok(match StackValue::parse(trimmed)? {
        StackValue::Absolute(value) => StackValue::Multiplier(f64::from(value)),
        multiplier => multiplier,
    })
}

/// `All` is a filter, never a target.
fn parse_category(raw: &str) -> Result<ItemCategory, CoreError> {
    match raw.parse::<ItemCategory>() {
        Ok(category) if category.is_indexed() => Ok(category),
        _ => Err(CoreError::invalid_argument(format_message(
            MessageKey::InvalidCategory,
            &[],
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, StackValue};
    use crate::category::ItemCategory;
    use crate::core_api::error::CoreErrorCode;

    #[test]
    fn stack_values_distinguish_multipliers() {
        assert_eq!(StackValue::parse("1000").ok(), Some(StackValue::Absolute(1000)));
        assert_eq!(StackValue::parse("2.5x").ok(), Some(StackValue::Multiplier(2.5)));
        assert_eq!(StackValue::parse("3X").ok(), Some(StackValue::Multiplier(3.0)));
        assert!(StackValue::parse("lots").is_err());
        assert!(StackValue::parse("-2x").is_err());
        assert!(StackValue::parse("x").is_err());
    }

    #[test]
    fn wrong_argument_count_is_reported() {
        let err = Command::parse("set-stack", &["wood"]).expect_err("one argument is too few");
        assert_eq!(err.code, CoreErrorCode::InvalidCommandArgument);
        assert_eq!(err.message, "This command requires 2 arguments.");
    }

    #[test]
    fn categories_parse_case_insensitively_but_reject_all() {
        assert_eq!(
            Command::parse("set-stack-category", &["resources", "2x"]).ok(),
            Some(Command::SetStackCategory {
                category: ItemCategory::Resources,
                value: StackValue::Multiplier(2.0),
            })
        );
        let err = Command::parse("list-category-items", &["all"]).expect_err("All is not a target");
        assert_eq!(err.message, "Category not found. Try list-categories");
    }

    #[test]
    fn plain_category_values_are_multipliers() {
        assert_eq!(
            Command::parse("set-stack-category", &["resources", "2"]).ok(),
            Some(Command::SetStackCategory {
                category: ItemCategory::Resources,
                value: StackValue::Multiplier(2.0),
            })
        );
        assert_eq!(
            Command::parse("set-stack-category", &["resources", "limit=50"]).ok(),
            Some(Command::SetStackCategory {
                category: ItemCategory::Resources,
                value: StackValue::Absolute(50),
            })
        );
        assert!(Command::parse("set-stack-category", &["resources", "limit=2x"]).is_err());
        assert!(Command::parse("set-stack-category", &["resources", "limit="]).is_err());
    }

    #[test]
    fn hard_limits_must_be_absolute() {
        assert!(Command::parse("set-stack-limit", &["wood", "2x"]).is_err());
        assert_eq!(
            Command::parse("set-stack-limit", &["wood", "100"]).ok(),
            Some(Command::SetStackLimit {
                item: "wood".to_string(),
                limit: 100,
            })
        );
    }
}
