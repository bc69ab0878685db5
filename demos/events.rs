//! One-tick event components and the process-local named-world registry.

use archetype_ecs::{registry, World, WorldConfig};

struct DamageTaken {
    amount: u32,
}

fn main() {
    let world = registry::create("combat", WorldConfig::default()).expect("register world");

    let attacker = world.create_entity();
    attacker.set_event(DamageTaken { amount: 12 }).unwrap();
    println!("right after set_event: has DamageTaken = {}", attacker.has::<DamageTaken>().unwrap());

    world.execute_tasks();
    println!(
        "after one execute_tasks: has DamageTaken = {}",
        attacker.has::<DamageTaken>().unwrap()
    );

    world.execute_tasks();
    println!(
        "after a second execute_tasks: has DamageTaken = {}",
        attacker.has::<DamageTaken>().unwrap()
    );

    // Other parts of the process can look the world up by name rather
    // than threading a `&mut World` through everything.
    let same_world = registry::get("combat").unwrap();
    println!("looked-up world entity count: {}", same_world.info().entity_count);

    registry::destroy("combat").unwrap();
    println!("destroyed; attacker still alive = {}", attacker.is_alive());
}
