//! Structural queries: fetch components, filter with `with`/`without`,
//! and mutate entities from inside `for_each` without corrupting the
//! iteration in progress.

use archetype_ecs::World;

#[derive(Debug, Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy)]
struct Velocity {
    x: f32,
    y: f32,
}

struct Stunned;

fn main() {
    let mut world = World::new();

    for i in 0..5 {
        let e = world.create_entity();
        e.set(Position { x: i as f32, y: 0.0 }).unwrap();
        if i % 2 == 0 {
            e.set(Velocity { x: 1.0, y: 0.0 }).unwrap();
        }
    }

    println!("Entities with Position and Velocity:");
    world
        .create_query::<(&Position, &Velocity)>()
        .for_each(|e, (pos, vel)| {
            println!("  {:?}: pos={pos:?} vel={vel:?}", e.id());
        });

    // Integrate velocity into position in place.
    world
        .create_query::<(&mut Position, &Velocity)>()
        .for_each(|_e, (pos, vel)| {
            pos.x += vel.x;
            pos.y += vel.y;
        });

    // Entities without a Velocity get stunned; this mutates archetype
    // membership from inside the callback that's driving the outer scan,
    // which is safe because the archetype being walked defers the move
    // until its own loop finishes.
    let mut query = world.create_query::<()>();
    query.without::<Velocity>().unwrap();
    query.for_each(|e, ()| {
        e.set(Stunned).unwrap();
    });

    let mut stunned_count = 0;
    world.create_query::<()>().for_each(|e, ()| {
        if e.has::<Stunned>().unwrap() {
            stunned_count += 1;
        }
    });
    println!("\nstunned entities: {stunned_count}");
}
