use std::path::PathBuf;

use stacksize_core::core_api::{
    CONFIG_DOCUMENT, DataStore, Engine, ItemCatalog, MemoryCatalog, MemoryStore, Session,
};
use stacksize_core::guard::{GuardOptions, GuardOutcome, NotHandledReason, split_stack};
use stacksize_core::inventory::{Container, ContainerKind, HeldEntity, ItemFactory, ItemStack};

const LOW_GRADE_FUEL: i32 = -946369541;
const AMMO_RIFLE: i32 = -1211166256;
const RIFLE_AK: i32 = 1545779598;
const FLAMETHROWER: i32 = -1215753368;
const LANTERN: i32 = -1379225193;
const WATER: i32 = -1779180711;
const WATER_JUG: i32 = -119235651;

fn fixture_catalog() -> MemoryCatalog {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures/catalog.json");
    MemoryCatalog::load(&path).unwrap_or_else(|e| panic!("failed to load {:?}: {}", path, e))
}

fn open_session(config_json: &str) -> Session<MemoryCatalog, MemoryStore> {
    let mut store = MemoryStore::new();
    store.write(CONFIG_DOCUMENT, config_json).expect("write");
    Engine::new()
        .open(fixture_catalog(), store)
        .expect("session should open")
}

fn loaded_rifles(amount: u32, rounds: u32) -> ItemStack {
    let mut rifles = ItemStack::new(RIFLE_AK, amount);
    rifles.held = Some(HeldEntity::Magazine {
        ammo_item_id: AMMO_RIFLE,
        contents: rounds,
        capacity: 30,
    });
    rifles
}

fn fueled_flamethrower(fuel: u32) -> ItemStack {
    let mut flamethrower = ItemStack::new(FLAMETHROWER, 1);
    flamethrower.held = Some(HeldEntity::FuelTank {
        fuel_item_id: LOW_GRADE_FUEL,
        fuel,
        capacity: 100,
    });
    flamethrower
}

#[test]
fn split_leaves_original_ammo_and_empties_the_new_stack() {
    let session = open_session("{}");
    let mut rifles = loaded_rifles(10, 5);

    let split = session
        .split_item(&mut rifles, 3)
        .handled()
        .expect("split should be handled");

    assert_eq!(split.amount, 3);
    assert_eq!(split.held.and_then(|held| held.loaded()), None);
    assert_eq!(rifles.amount, 7);
    assert_eq!(rifles.held.and_then(|held| held.loaded()), Some((AMMO_RIFLE, 5)));
    assert!(rifles.dirty);
}

#[test]
fn split_discards_default_contents_of_the_new_stack() {
    let catalog = fixture_catalog();
    let mut lanterns = catalog.create(LANTERN, 4, 0).expect("lantern");
    assert_eq!(lanterns.units_of(LOW_GRADE_FUEL), 10);

    let split = split_stack(GuardOptions::default(), &catalog, &mut lanterns, 2)
        .handled()
        .expect("split should be handled");

    assert!(split.contents.is_empty());
    assert_eq!(lanterns.amount, 2);
    assert_eq!(lanterns.units_of(LOW_GRADE_FUEL), 10);
}

#[test]
fn split_keeps_blueprint_target() {
    let catalog = fixture_catalog();
    let mut blueprints = ItemStack::new(RIFLE_AK, 5);
    blueprints.blueprint_target = Some(RIFLE_AK);

    let split = split_stack(GuardOptions::default(), &catalog, &mut blueprints, 1)
        .handled()
        .expect("split should be handled");
    assert_eq!(split.blueprint_target, Some(RIFLE_AK));
}

#[test]
fn leave_weapon_state_bypasses_both_guards() {
    let session = open_session(r#"{ "leave_weapon_state": true }"#);
    let mut rifles = loaded_rifles(10, 5);
    let before = rifles.clone();

    assert_eq!(
        session.split_item(&mut rifles, 3),
        GuardOutcome::NotHandled(NotHandledReason::GuardDisabled)
    );
    assert_eq!(rifles, before);

    let mut furnace = Container::new(ContainerKind::Processing, 6);
    let mut flamethrower = fueled_flamethrower(40);
    let outcome = session.transfer_into_container(&mut flamethrower, &mut furnace, None);
    assert!(!outcome.is_handled());
    assert!(furnace.items.is_empty());
}

#[test]
fn split_rejects_amounts_outside_the_stack() {
    let session = open_session("{}");
    let mut rifles = loaded_rifles(10, 5);
    for amount in [0, 10, 11] {
        assert_eq!(
            session.split_item(&mut rifles, amount),
            GuardOutcome::NotHandled(NotHandledReason::InvalidAmount)
        );
    }
    assert_eq!(rifles.amount, 10);
}

#[test]
fn transfer_drains_fuel_and_conserves_units() {
    let session = open_session("{}");
    let mut furnace = Container::new(ContainerKind::Processing, 6);
    let mut flamethrower = fueled_flamethrower(40);
    let before = flamethrower.units_of(LOW_GRADE_FUEL) + furnace.units_of(LOW_GRADE_FUEL);

    let report = session
        .transfer_into_container(&mut flamethrower, &mut furnace, None)
        .handled()
        .expect("transfer should be handled");

    assert_eq!(report.drained, vec![(LOW_GRADE_FUEL, 40)]);
    assert_eq!(report.total_units(), 40);
    assert_eq!(flamethrower.held.and_then(|held| held.loaded()), None);
    assert_eq!(furnace.units_of(LOW_GRADE_FUEL), 40);
    let after = flamethrower.units_of(LOW_GRADE_FUEL) + furnace.units_of(LOW_GRADE_FUEL);
    assert_eq!(before, after);
}

#[test]
fn transfer_drains_both_sides_but_keeps_liquids() {
    let session = open_session("{}");
    let mut furnace = Container::new(ContainerKind::Processing, 6);

    let mut jug = ItemStack::new(WATER_JUG, 1);
    let mut water = ItemStack::new(WATER, 250);
    water.liquid = true;
    jug.contents.push(water);
    jug.contents.push(ItemStack::new(LOW_GRADE_FUEL, 5));
    furnace.items.push(jug);

    let mut rifles = loaded_rifles(1, 12);
    let report = session
        .transfer_into_container(&mut rifles, &mut furnace, Some(0))
        .handled()
        .expect("transfer should be handled");

    assert_eq!(report.total_units(), 17);
    assert_eq!(furnace.items[0].units_of(WATER), 250);
    assert_eq!(furnace.items[0].units_of(LOW_GRADE_FUEL), 0);
    assert_eq!(furnace.units_of(LOW_GRADE_FUEL), 5);
    assert_eq!(furnace.units_of(AMMO_RIFLE), 12);
    assert!(furnace.items[0].dirty);
}

#[test]
fn transfer_only_guards_processing_containers() {
    let session = open_session("{}");
    let mut backpack = Container::new(ContainerKind::PlayerInventory, 24);
    let mut flamethrower = fueled_flamethrower(40);

    assert_eq!(
        session.transfer_into_container(&mut flamethrower, &mut backpack, None),
        GuardOutcome::NotHandled(NotHandledReason::NotProcessingContainer)
    );
    assert_eq!(flamethrower.units_of(LOW_GRADE_FUEL), 40);
}

#[test]
fn full_container_or_missing_target_changes_nothing() {
    let session = open_session("{}");
    let mut furnace = Container::new(ContainerKind::Processing, 1);
    furnace.items.push(ItemStack::new(LOW_GRADE_FUEL, 100));
    let mut flamethrower = fueled_flamethrower(40);
    let before = (flamethrower.clone(), furnace.clone());

    assert_eq!(
        session.transfer_into_container(&mut flamethrower, &mut furnace, None),
        GuardOutcome::NotHandled(NotHandledReason::ContainerFull)
    );
    assert_eq!(
        session.transfer_into_container(&mut flamethrower, &mut furnace, Some(3)),
        GuardOutcome::NotHandled(NotHandledReason::MissingTarget)
    );
    assert_eq!((flamethrower, furnace), before);
}

#[test]
fn stacking_follows_the_live_stack_size() {
    let mut session = open_session("{}");
    session.on_world_ready().expect("world ready");
    let a = ItemStack::new(RIFLE_AK, 1);
    let b = ItemStack::new(RIFLE_AK, 1);
    assert!(!session.can_stack(&a, &b));

    session.catalog_mut().set_stack_size(RIFLE_AK, 5);
    assert!(session.can_stack(&a, &b));
}
