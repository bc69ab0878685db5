//! Integration tests for the six concrete scenarios in spec.md §8, plus
//! the component-type capacity boundary, driven entirely through the
//! public `World`/`Query`/`registry` API.

use archetype_ecs::{registry, EcsError, World, WorldConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    x: i32,
    y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity {
    x: i32,
    y: i32,
}

struct Tag;

#[derive(Debug, Clone, Copy, PartialEq)]
struct A;
#[derive(Debug, Clone, Copy, PartialEq)]
struct B;
#[derive(Debug, Clone, Copy, PartialEq)]
struct C;

// S1: a freshly created world has no entities, one archetype (the
// empty one), and no registered component types.
#[test]
fn s1_empty_world_has_only_the_empty_archetype() {
    let world = World::new();
    let info = world.info();
    assert_eq!(info.entity_count, 0);
    assert_eq!(info.free_count, 0);
    assert_eq!(info.archetype_count, 1);
    assert_eq!(info.component_type_count, 0);
}

// S2: a single entity carrying two components lands in an archetype
// distinct from either component alone, and both values round-trip.
#[test]
fn s2_entity_with_two_components_gets_its_own_archetype() {
    let mut world = World::new();
    let e = world.create_entity();
    e.set(Position { x: 1, y: 2 }).unwrap();
    e.set(Velocity { x: 3, y: 4 }).unwrap();

    assert_eq!(*e.get::<Position>().unwrap().unwrap(), Position { x: 1, y: 2 });
    assert_eq!(*e.get::<Velocity>().unwrap().unwrap(), Velocity { x: 3, y: 4 });
    assert_eq!(world.info().archetype_count, 3); // empty, {Position}, {Position,Velocity}
}

// S3: mutating an entity's archetype membership from inside the
// callback of a query iterating over that same archetype does not
// skip or duplicate any entity, and the move is visible immediately
// after `for_each` returns.
#[test]
fn s3_structural_mutation_during_iteration_is_deferred_safely() {
    let mut world = World::new();
    let e1 = world.create_entity();
    e1.set(Position { x: 0, y: 0 }).unwrap();
    let e2 = world.create_entity();
    e2.set(Position { x: 1, y: 1 }).unwrap();

    let mut visited = Vec::new();
    world.create_query::<&Position>().for_each(|e, pos| {
        visited.push(e.id());
        if pos.x == 0 {
            e.set(Tag).unwrap();
        }
    });

    visited.sort();
    let mut expected = [e1.id(), e2.id()];
    expected.sort();
    assert_eq!(visited, expected, "every entity visited exactly once");
    assert!(e1.has::<Tag>().unwrap());
    assert!(!e2.has::<Tag>().unwrap());
}

// S4: destroying and recreating reuses the freed id with a strictly
// greater generation, and the old handle is permanently stale.
#[test]
fn s4_generation_increments_on_id_reuse() {
    let mut world = World::new();
    let e1 = world.create_entity();
    let id1 = e1.id();
    let gen1 = e1.generation();
    e1.destroy().unwrap();

    let e2 = world.create_entity();
    assert_eq!(e2.id(), id1);
    assert_eq!(e2.generation(), gen1 + 1);
    assert!(!e1.is_alive());
    assert_eq!(e1.set(Position { x: 0, y: 0 }), Err(EcsError::StaleEntity));
}

// S5: an event component set via `set_event` is invisible until the
// next `execute_tasks`, visible for exactly one round, then gone.
#[test]
fn s5_event_component_is_visible_for_exactly_one_tick() {
    let mut world = World::new();
    let e = world.create_entity();
    e.set_event(Tag).unwrap();
    assert!(!e.has::<Tag>().unwrap());

    world.execute_tasks();
    assert!(e.has::<Tag>().unwrap());

    world.execute_tasks();
    assert!(!e.has::<Tag>().unwrap());
}

// S6: `without::<T>()` excludes every entity carrying `T`, regardless
// of what else they carry.
#[test]
fn s6_query_without_excludes_matching_component() {
    let mut world = World::new();
    let ea = world.create_entity();
    ea.set(A).unwrap();
    let eb = world.create_entity();
    eb.set(A).unwrap();
    eb.set(B).unwrap();
    let ec = world.create_entity();
    ec.set(A).unwrap();
    ec.set(C).unwrap();

    let mut visited = Vec::new();
    let mut query = world.create_query::<()>();
    query.with::<A>().unwrap();
    query.without::<B>().unwrap();
    query.for_each(|e, ()| visited.push(e.id()));
    visited.sort();

    let mut expected = [ea.id(), ec.id()];
    expected.sort();
    assert_eq!(visited, expected);
}

// Capacity boundary: the entity table grows past its configured
// initial size without invalidating ids already handed out, and the
// component-type capacity is enforced as a hard cap.
#[test]
fn entity_table_grows_past_initial_capacity() {
    let mut world = World::with_config(WorldConfig {
        initial_entities: 64,
        ..WorldConfig::default()
    });
    let first = world.create_entity();
    for _ in 0..64 {
        world.create_entity();
    }
    assert!(first.is_alive());
    assert_eq!(world.info().entity_count, 65);
}

#[test]
fn component_type_capacity_boundary_rejects_past_the_configured_cap() {
    struct OverCap;
    let mut world = World::with_config(WorldConfig {
        initial_component_types: 0,
        ..WorldConfig::default()
    });
    let e = world.create_entity();
    assert_eq!(
        e.set(OverCap {}).map(|_| ()),
        Err(EcsError::CapacityExceeded { capacity: 0 })
    );
}

// The process-local world registry: create/get/destroy by name, with
// destroyed worlds reporting failure rather than dangling.
#[test]
fn world_registry_create_get_destroy_roundtrip() {
    let name = "scenarios_registry_roundtrip";
    let world = registry::create(name, WorldConfig::default()).unwrap();
    let e = world.create_entity();
    assert_eq!(registry::get(name).unwrap().info().entity_count, 1);

    registry::destroy(name).unwrap();
    assert!(!e.is_alive());
    assert_eq!(
        registry::get(name).err(),
        Some(EcsError::NoSuchWorld(name.to_string()))
    );
}
