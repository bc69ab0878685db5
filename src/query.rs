// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Structural queries: `include`/`exclude` signatures plus a re-entrant
//! `for_each` iteration driver (spec.md §4.8).
//!
//! A [`Query`] does not borrow its `World` the way a plain `&mut World`
//! would. It holds a raw, non-owning pointer instead — the same trick
//! `Entity` uses (see `entity.rs`) — specifically so that a callback
//! passed to `for_each` can itself create and drive another query on the
//! same world (spec.md §4.8/§5's re-entrant iteration requirement would
//! otherwise be unexpressable: the borrow checker cannot see that the
//! lock-depth bookkeeping makes it safe). Component references handed to
//! the callback are manufactured from raw pointers into the relevant
//! `ComponentStore<T>` for the same reason; callers must not retain them
//! past the single callback invocation they were fetched for.

use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::archetype::ArchetypeId;
use crate::bitset::BitSignature;
use crate::component::{component_type_id, Component};
use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::world::World;

/// What a query extracts for each matching entity.
///
/// Implemented for `&T`/`&mut T` (single component), for tuples of those
/// (multiple components), and for `()` (no components — a pure
/// existence query). Each implementation also contributes its component
/// type(s) to the query's `include` signature: a query can only fetch
/// components whose presence the archetype match already guarantees.
///
/// # Safety
/// `fetch` must only be called with an `entity_id` that is alive in
/// `world` and whose signature is a superset of the bits `add_includes`
/// registers. Implementations may assume distinct `T`s never alias (two
/// different `ComponentStore<T>`s are always disjoint allocations), but
/// must not be instantiated twice for the *same* `T` within one query
/// (e.g. `(&mut Position, &mut Position)`), which would hand out two
/// live mutable references to the same value.
pub unsafe trait Fetch {
    /// Borrowed for lifetime `'a`, one item per callback invocation.
    type Item<'a>;

    fn add_includes(signature: &mut BitSignature);

    /// # Safety
    /// See the trait-level safety note.
    unsafe fn fetch<'a>(world: &mut World, entity_id: u32) -> Self::Item<'a>;
}

unsafe impl<T: Component> Fetch for &T {
    type Item<'a> = &'a T;

    fn add_includes(signature: &mut BitSignature) {
        signature.set(component_type_id::<T>().index());
    }

    unsafe fn fetch<'a>(world: &mut World, entity_id: u32) -> Self::Item<'a> {
        let ptr = world
            .component_value_ptr::<T>(entity_id)
            .expect("archetype match guarantees component presence");
        // SAFETY: caller (`Query::for_each`) guarantees `entity_id` is
        // alive and carries `T`; the reference is used only for the
        // duration of one callback invocation (see module docs).
        unsafe { &*ptr }
    }
}

unsafe impl<T: Component> Fetch for &mut T {
    type Item<'a> = &'a mut T;

    fn add_includes(signature: &mut BitSignature) {
        signature.set(component_type_id::<T>().index());
    }

    unsafe fn fetch<'a>(world: &mut World, entity_id: u32) -> Self::Item<'a> {
        let ptr = world
            .component_value_ptr::<T>(entity_id)
            .expect("archetype match guarantees component presence");
        // SAFETY: see the `&T` impl above.
        unsafe { &mut *ptr }
    }
}

unsafe impl Fetch for () {
    type Item<'a> = ();

    fn add_includes(_signature: &mut BitSignature) {}

    unsafe fn fetch<'a>(_world: &mut World, _entity_id: u32) -> Self::Item<'a> {}
}

macro_rules! impl_fetch_tuple {
    ($($T:ident),+) => {
        unsafe impl<$($T: Fetch),+> Fetch for ($($T,)+) {
            type Item<'a> = ($($T::Item<'a>,)+);

            fn add_includes(signature: &mut BitSignature) {
                $($T::add_includes(signature);)+
            }

            unsafe fn fetch<'a>(world: &mut World, entity_id: u32) -> Self::Item<'a> {
                // SAFETY: each `$T::fetch` addresses a distinct
                // `ComponentStore<U>` (the caller promises no repeated
                // component type across the tuple), so the raw-pointer
                // derefs below never alias one another.
                ($(unsafe { $T::fetch::<'a>(world, entity_id) },)+)
            }
        }
    };
}

impl_fetch_tuple!(A);
impl_fetch_tuple!(A, B);
impl_fetch_tuple!(A, B, C);
impl_fetch_tuple!(A, B, C, D);
impl_fetch_tuple!(A, B, C, D, E);
impl_fetch_tuple!(A, B, C, D, E, F);
impl_fetch_tuple!(A, B, C, D, E, F, G);
impl_fetch_tuple!(A, B, C, D, E, F, G, H);
impl_fetch_tuple!(A, B, C, D, E, F, G, H, I);
impl_fetch_tuple!(A, B, C, D, E, F, G, H, I, J);

/// A structural query: `include`/`exclude` component-type signatures
/// plus the components `F` extracts from each matching entity.
///
/// Built with [`World::create_query`], refined with [`Query::with`] /
/// [`Query::without`], and driven with [`Query::for_each`]. A `Query` is
/// cheap to keep around and re-run (spec.md §4.8 "recycle the query
/// object for reuse") — it holds no allocation beyond two small
/// bitsets.
pub struct Query<F: Fetch> {
    world: NonNull<World>,
    include: BitSignature,
    exclude: BitSignature,
    _marker: PhantomData<fn() -> F>,
}

impl<F: Fetch> Query<F> {
    pub(crate) fn new(world: &mut World) -> Self {
        let mut include = BitSignature::default();
        F::add_includes(&mut include);
        Self {
            world: NonNull::from(world),
            include,
            exclude: BitSignature::default(),
            _marker: PhantomData,
        }
    }

    /// Require component `T` to be present, without fetching it.
    ///
    /// Fails with [`EcsError::QueryConflict`] if `T` is already asserted
    /// absent via `without::<T>()` (or, since a fetched component is
    /// implicitly required, if `T` is one of the components `F` fetches
    /// and was separately excluded).
    pub fn with<T: Component>(&mut self) -> Result<&mut Self> {
        let idx = component_type_id::<T>().index();
        if self.exclude.test(idx) {
            return Err(EcsError::QueryConflict);
        }
        self.include.set(idx);
        Ok(self)
    }

    /// Require component `T` to be absent.
    ///
    /// Fails with [`EcsError::QueryConflict`] if `T` is already required
    /// present, whether via `with::<T>()` or because `F` fetches it.
    pub fn without<T: Component>(&mut self) -> Result<&mut Self> {
        let idx = component_type_id::<T>().index();
        if self.include.test(idx) {
            return Err(EcsError::QueryConflict);
        }
        self.exclude.set(idx);
        Ok(self)
    }

    fn world_mut(&mut self) -> &mut World {
        // SAFETY: `World` is not moved once entities/queries reference
        // it (see world.rs), and the core is single-threaded, so no
        // other live borrow of it can exist while this call runs.
        unsafe { self.world.as_mut() }
    }

    /// Visit every live entity in every archetype matching this query's
    /// `include`/`exclude` signatures exactly once, in archetype
    /// insertion order and dense-index order within each archetype
    /// (spec.md §4.8).
    ///
    /// The callback may mutate the visited entity — including removing
    /// or adding components, which can change its archetype — without
    /// corrupting this iteration: the archetype being walked is locked
    /// for the duration of its loop, so membership changes triggered
    /// from inside the callback are deferred and replayed only after
    /// this archetype's loop finishes (spec.md §4.5/§5, scenario S3).
    /// Archetypes created by the callback during iteration are not
    /// visited by this call (only the archetypes that existed when
    /// `for_each` began are scanned); they become visible to the next
    /// `for_each` that runs after this one.
    pub fn for_each<Cb>(&mut self, mut callback: Cb)
    where
        Cb: FnMut(Entity, F::Item<'_>),
    {
        self.world_mut().enter_lock();

        let archetype_count = self.world_mut().archetypes().len();
        for index in 0..archetype_count {
            let id = ArchetypeId::from_index(index);
            let matches = {
                let archetype = &self.world_mut().archetypes()[index];
                !archetype.is_empty()
                    && archetype.signature().contains(&self.include)
                    && (self.exclude.is_empty() || !archetype.signature().intersects(&self.exclude))
            };
            if !matches {
                continue;
            }

            self.world_mut().archetypes_mut()[index].lock();
            let len = self.world_mut().archetypes()[index].len();
            for row in 0..len {
                let entity_id = self.world_mut().archetypes()[index].entities()[row];
                let Some(generation) = self.world_mut().generation_of(entity_id) else {
                    continue;
                };
                if !self.world_mut().is_alive_id(entity_id, generation) {
                    continue;
                }
                let entity = self
                    .world_mut()
                    .entity_handle(entity_id, generation)
                    .expect("just checked is_alive_id");

                // SAFETY: the archetype at `id` matched `self.include`,
                // so every bit `F::add_includes` set is present on this
                // entity; `entity_id` was just confirmed alive.
                let item = unsafe { F::fetch(self.world_mut(), entity_id) };
                callback(entity, item);
            }
            self.world_mut().archetypes_mut()[id.index()].unlock();
        }

        self.world_mut().exit_lock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;

    #[derive(Debug, PartialEq, Clone, Copy)]
    struct Position {
        x: i32,
        y: i32,
    }
    #[derive(Debug, PartialEq, Clone, Copy)]
    struct Velocity {
        x: i32,
        y: i32,
    }
    struct Tag;
    struct A;
    struct B;
    struct C;

    #[test]
    fn empty_query_visits_every_live_entity_once() {
        let mut world = World::new();
        let e1 = world.create_entity();
        let e2 = world.create_entity();
        e1.set(Position { x: 0, y: 0 }).unwrap();

        let mut visited = Vec::new();
        world
            .create_query::<()>()
            .for_each(|e, ()| visited.push(e.id()));
        visited.sort();
        let mut expected = [e1.id(), e2.id()];
        expected.sort();
        assert_eq!(visited, expected);
    }

    #[test]
    fn with_filters_to_matching_archetypes() {
        let mut world = World::new();
        let e1 = world.create_entity();
        e1.set(Position { x: 1, y: 1 }).unwrap();
        let e2 = world.create_entity();
        e2.set(Position { x: 2, y: 2 }).unwrap();
        e2.set(Velocity { x: 0, y: 0 }).unwrap();
        let _e3 = world.create_entity(); // no Position, must not match

        let mut visited = Vec::new();
        world
            .create_query::<&Position>()
            .for_each(|e, pos| visited.push((e.id(), *pos)));
        visited.sort_by_key(|(id, _)| *id);

        let mut expected = vec![(e1.id(), Position { x: 1, y: 1 }), (e2.id(), Position { x: 2, y: 2 })];
        expected.sort_by_key(|(id, _)| *id);
        assert_eq!(visited, expected);
    }

    #[test]
    fn s6_query_exclusion() {
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

    #[test]
    fn conflicting_with_and_without_is_an_error() {
        let mut world = World::new();
        let mut query = world.create_query::<()>();
        query.with::<A>().unwrap();
        assert_eq!(query.without::<A>().err(), Some(EcsError::QueryConflict));
    }

    #[test]
    fn fetched_component_excluded_is_also_a_conflict() {
        let mut world = World::new();
        let mut query = world.create_query::<&Position>();
        assert_eq!(query.without::<Position>().err(), Some(EcsError::QueryConflict));
    }

    #[test]
    fn s3_structural_mutation_during_iteration() {
        let mut world = World::new();
        let e_a = world.create_entity();
        e_a.set(Position { x: 0, y: 0 }).unwrap();
        let e_b = world.create_entity();
        e_b.set(Position { x: 1, y: 1 }).unwrap();
        e_b.set(Velocity { x: 0, y: 0 }).unwrap();

        let mut visited = Vec::new();
        world.create_query::<&Position>().for_each(|e, pos| {
            visited.push(e.id());
            if pos.x == 0 {
                e.set(Tag).unwrap();
            }
        });

        assert_eq!(visited.len(), 2);
        assert!(e_a.has::<Tag>().unwrap());
        assert!(!e_b.has::<Tag>().unwrap());
        // {Position}, {Position,Velocity}, {Position,Tag} plus the empty
        // archetype that always exists at index 0.
        assert_eq!(world.info().archetype_count, 4);
    }

    #[test]
    fn mutable_fetch_allows_in_place_writes() {
        let mut world = World::new();
        let e = world.create_entity();
        e.set(Position { x: 1, y: 2 }).unwrap();

        world
            .create_query::<&mut Position>()
            .for_each(|_e, pos| pos.x += 10);

        assert_eq!(*e.get::<Position>().unwrap().unwrap(), Position { x: 11, y: 2 });
    }

    #[test]
    fn multi_component_fetch_returns_tuple() {
        let mut world = World::new();
        let e = world.create_entity();
        e.set(Position { x: 1, y: 2 }).unwrap();
        e.set(Velocity { x: 3, y: 4 }).unwrap();

        let mut seen = None;
        world
            .create_query::<(&Position, &Velocity)>()
            .for_each(|_e, (pos, vel)| seen = Some((*pos, *vel)));

        assert_eq!(seen, Some((Position { x: 1, y: 2 }, Velocity { x: 3, y: 4 })));
    }

    #[test]
    fn query_object_can_be_reused_across_for_each_calls() {
        let mut world = World::new();
        world.create_entity().set(Position { x: 0, y: 0 }).unwrap();

        let mut query = world.create_query::<&Position>();
        let mut first = 0;
        query.for_each(|_, _| first += 1);
        let mut second = 0;
        query.for_each(|_, _| second += 1);
        assert_eq!((first, second), (1, 1));
    }

    #[test]
    fn nested_query_inside_callback_is_allowed() {
        let mut world = World::new();
        let outer = world.create_entity();
        outer.set(Position { x: 0, y: 0 }).unwrap();
        let inner = world.create_entity();
        inner.set(Velocity { x: 0, y: 0 }).unwrap();

        let mut inner_visits = 0;
        world.create_query::<&Position>().for_each(|_e, _pos| {
            world
                .create_query::<&Velocity>()
                .for_each(|_, _| inner_visits += 1);
        });
        assert_eq!(inner_visits, 1);
    }
}
