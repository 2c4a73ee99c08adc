//! Split and container-transfer interceptors.
//!
//! Both operations either finish the whole extraction and report
//! [`GuardOutcome::Handled`], or leave every input untouched and report
//! [`GuardOutcome::NotHandled`] so the host falls back to its default
//! behaviour.

use log::debug;

use crate::inventory::{Container, ContainerKind, ItemFactory, ItemStack};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuardOptions {
    /// Operator opted out of stripping weapon state; duplication is accepted.
    pub leave_weapon_state: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotHandledReason {
    GuardDisabled,
    InvalidAmount,
    UnknownItem,
    NotProcessingContainer,
    MissingTarget,
    ContainerFull,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome<T> {
    Handled(T),
    NotHandled(NotHandledReason),
}

impl<T> GuardOutcome<T> {
    pub fn is_handled(&self) -> bool {
        matches!(self, GuardOutcome::Handled(_))
    }

    pub fn handled(self) -> Option<T> {
        match self {
            GuardOutcome::Handled(value) => Some(value),
            GuardOutcome::NotHandled(_) => None,
        }
    }
}

/// Quantities moved out of nested state into the surrounding container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub drained: Vec<(i32, u32)>,
}

impl TransferReport {
    pub fn total_units(&self) -> u64 {
        self.drained.iter().map(|(_, amount)| u64::from(*amount)).sum()
    }
}

/// Splits `amount` units off `item` into a fresh stack with no nested state.
///
/// The new stack is built by the factory, so it arrives with the
/// definition's default magazine, fuel and contents; all of that is
/// stripped from the new stack. The original keeps its own state and is
/// marked dirty.
pub fn split_stack<F: ItemFactory + ?Sized>(
    options: GuardOptions,
    factory: &F,
    item: &mut ItemStack,
    amount: u32,
) -> GuardOutcome<ItemStack> {
    if options.leave_weapon_state {
        return GuardOutcome::NotHandled(NotHandledReason::GuardDisabled);
    }
    if amount == 0 || amount >= item.amount {
        return GuardOutcome::NotHandled(NotHandledReason::InvalidAmount);
    }
    let Some(mut split) = factory.create(item.item_id, amount, item.skin) else {
        return GuardOutcome::NotHandled(NotHandledReason::UnknownItem);
    };

    split.amount = amount;
    split.blueprint_target = item.blueprint_target;

    if split.has_nested_state() {
        debug!(
            "stripping {} nested stacks and loaded state from split of item {}",
            split.contents.len(),
            item.item_id
        );
        split.contents.clear();
        if let Some(held) = split.held.as_mut() {
            held.clear();
        }
    }

    item.amount -= amount;
    item.dirty = true;

    GuardOutcome::Handled(split)
}

/// Drains nested state from `moving` and from the destination stack at
/// `target_slot` into `container` as loose items, ahead of a merge.
///
/// Only processing containers are guarded. Liquid contents stay where they
/// are. Nothing is mutated unless every drained stack can be created and
/// placed.
pub fn transfer_into_container<F: ItemFactory + ?Sized>(
    options: GuardOptions,
    factory: &F,
    moving: &mut ItemStack,
    container: &mut Container,
    target_slot: Option<usize>,
) -> GuardOutcome<TransferReport> {
    if options.leave_weapon_state {
        return GuardOutcome::NotHandled(NotHandledReason::GuardDisabled);
    }
    if container.kind != ContainerKind::Processing {
        return GuardOutcome::NotHandled(NotHandledReason::NotProcessingContainer);
    }
    if let Some(slot) = target_slot
        && slot >= container.items.len()
    {
        return GuardOutcome::NotHandled(NotHandledReason::MissingTarget);
    }

    let mut loose = Vec::new();
    if let Err(reason) = plan_drain(factory, moving, &mut loose) {
        return GuardOutcome::NotHandled(reason);
    }
    if let Some(slot) = target_slot
        && let Err(reason) = plan_drain(factory, &container.items[slot], &mut loose)
    {
        return GuardOutcome::NotHandled(reason);
    }
    if loose.len() > container.free_slots() {
        return GuardOutcome::NotHandled(NotHandledReason::ContainerFull);
    }

    strip_drainable(moving);
    if let Some(slot) = target_slot {
        strip_drainable(&mut container.items[slot]);
    }

    let report = TransferReport {
        drained: loose.iter().map(|stack| (stack.item_id, stack.amount)).collect(),
    };
    container.items.extend(loose);

    GuardOutcome::Handled(report)
}

/// Whether `item` may be merged onto `target` given the item's stack size.
pub fn can_stack(item: &ItemStack, target: &ItemStack, stackable: u32) -> bool {
    if std::ptr::eq(item, target) || stackable <= 1 || item.item_id != target.item_id {
        return false;
    }
    if item.is_blueprint() && item.blueprint_target != target.blueprint_target {
        return false;
    }
    let worn = |stack: &ItemStack| stack.condition.is_some_and(|c| !c.is_full());
    !(worn(item) || worn(target))
}

fn plan_drain<F: ItemFactory + ?Sized>(
    factory: &F,
    stack: &ItemStack,
    loose: &mut Vec<ItemStack>,
) -> Result<(), NotHandledReason> {
    for child in stack.contents.iter().filter(|child| !child.liquid) {
        loose.push(child.clone());
    }
    if let Some((item_id, amount)) = stack.held.and_then(|held| held.loaded()) {
        let mut credited = factory
            .create(item_id, amount, 0)
            .ok_or(NotHandledReason::UnknownItem)?;
        credited.amount = amount;
        loose.push(credited);
    }
    Ok(())
}

fn strip_drainable(stack: &mut ItemStack) {
    stack.contents.retain(|child| child.liquid);
    if let Some(held) = stack.held.as_mut() {
        held.clear();
    }
    stack.dirty = true;
}

#[cfg(test)]
mod tests {
    use super::can_stack;
    use crate::inventory::{Condition, ItemStack};

    #[test]
    fn worn_items_never_stack() {
        let mut worn = ItemStack::new(7, 1);
        worn.condition = Some(Condition {
            current: 40.0,
            max: 100.0,
        });
        let mut fresh = ItemStack::new(7, 1);
        fresh.condition = Some(Condition::full(100.0));

        assert!(!can_stack(&worn, &fresh, 10));
        assert!(can_stack(&fresh, &fresh.clone(), 10));
    }

    #[test]
    fn blueprints_stack_only_with_same_target() {
        let mut a = ItemStack::new(-996920608, 1);
        a.blueprint_target = Some(1545779598);
        let mut b = a.clone();
        assert!(can_stack(&a, &b, 1000));

        b.blueprint_target = Some(-1812555177);
        assert!(!can_stack(&a, &b, 1000));
    }

    #[test]
    fn single_item_stacks_or_different_ids_are_rejected() {
        let a = ItemStack::new(1, 5);
        assert!(!can_stack(&a, &ItemStack::new(1, 5), 1));
        assert!(!can_stack(&a, &ItemStack::new(2, 5), 100));
        assert!(!can_stack(&a, &a, 100));
    }
}
