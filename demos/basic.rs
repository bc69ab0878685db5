//! Basic entity/component usage: create entities, attach components,
//! read them back, and watch an archetype move happen on removal.

use archetype_ecs::World;

#[derive(Debug)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug)]
struct Velocity {
    x: f32,
    y: f32,
}

#[derive(Debug)]
struct Health(u32);

fn main() {
    let mut world = World::new();

    let entity1 = world.create_entity();
    entity1
        .set(Position { x: 0.0, y: 0.0 })
        .expect("set Position on entity1");
    entity1
        .set(Velocity { x: 1.0, y: 0.5 })
        .expect("set Velocity on entity1");
    println!("Created entity {:?}", entity1);

    let entity2 = world.create_entity();
    entity2.set(Position { x: 10.0, y: 20.0 }).unwrap();
    entity2.set(Velocity { x: -1.0, y: 2.0 }).unwrap();
    entity2.set(Health(100)).unwrap();
    println!("Created entity {:?}", entity2);

    let entity3 = world.create_entity();
    entity3.set(Position { x: 5.0, y: 5.0 }).unwrap();
    println!("Created entity {:?}", entity3);

    if let Some(pos) = entity1.get::<Position>().unwrap() {
        println!("entity1 position: {pos:?}");
    }

    entity2.destroy().expect("destroy entity2");
    println!("Destroyed {:?}; is_alive = {}", entity2, entity2.is_alive());

    // Removing Position doesn't recycle entity3: it has no other
    // components, so this is actually its last one and it IS recycled.
    entity3.remove::<Position>().unwrap();
    println!(
        "entity3 after removing its last component: alive = {}",
        entity3.is_alive()
    );

    let info = world.info();
    println!(
        "\nworld summary: {} entities, {} free slots, {} archetypes, {} component types",
        info.entity_count, info.free_count, info.archetype_count, info.component_type_count
    );
}
