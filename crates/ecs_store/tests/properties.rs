//! End-to-end behaviour of the storage engine through the `Ecs` surface.

use ecs_store::{ComponentId, Ecs, Entity};

fn setup() -> Ecs {
    let mut ecs = Ecs::new();
    ecs.create_world();
    ecs
}

#[test]
fn fresh_entities_have_no_components() {
    let mut ecs = setup();
    let ids: Vec<ComponentId> = (0..3).map(|_| ecs.register_component(4)).collect();
    let e = ecs.create_entity();
    for &c in &ids {
        assert!(!ecs.has(e, c));
        assert!(ecs.get(e, c).is_none());
    }
}

#[test]
fn attach_yields_zeroed_instance_of_registered_size() {
    let mut ecs = setup();
    let c = ecs.register_component(24);
    let e = ecs.create_entity();
    ecs.attach(e, c);
    assert!(ecs.has(e, c));
    assert_eq!(ecs.get(e, c).unwrap(), &[0u8; 24][..]);
}

#[test]
fn attach_twice_does_not_duplicate_storage() {
    let mut ecs = setup();
    let c = ecs.register_component(4);
    let e = ecs.create_entity();
    ecs.attach(e, c);
    ecs.attach(e, c);
    let store = ecs.world().unwrap().components().store(c).unwrap();
    assert_eq!(store.len(), 1);
}

#[test]
fn detach_removes_exactly_one_instance() {
    let mut ecs = setup();
    let c = ecs.register_component(4);
    let e1 = ecs.create_entity();
    let e2 = ecs.create_entity();
    ecs.attach(e1, c);
    ecs.attach(e2, c);

    ecs.detach(e1, c);
    assert!(!ecs.has(e1, c));
    assert!(ecs.get(e1, c).is_none());
    let store = ecs.world().unwrap().components().store(c).unwrap();
    assert_eq!(store.len(), 1);
}

#[test]
fn value_follows_entity_across_swap_remove() {
    let mut ecs = setup();
    let c = ecs.register_component(8);
    let e1 = ecs.create_entity();
    let e2 = ecs.create_entity();
    let e3 = ecs.create_entity();
    ecs.insert(e1, c, &11u64);
    ecs.insert(e2, c, &22u64);
    ecs.insert(e3, c, &33u64);

    ecs.detach(e1, c);
    assert!(ecs.get(e1, c).is_none());
    assert_eq!(ecs.read::<u64>(e2, c), Some(22));
    assert_eq!(ecs.read::<u64>(e3, c), Some(33));

    ecs.detach(e3, c);
    assert_eq!(ecs.read::<u64>(e2, c), Some(22));
}

#[test]
fn ids_are_never_reused() {
    let mut ecs = setup();
    let mut issued = Vec::new();
    for _ in 0..4 {
        let e = ecs.create_entity();
        issued.push(e);
        ecs.destroy_entity(e);
        ecs.update();
    }
    let next = ecs.create_entity();
    assert!(!issued.contains(&next));
    assert_eq!(ecs.world().unwrap().entities().capacity(), 1);
}

#[test]
fn destruction_is_deferred_until_update() {
    let mut ecs = setup();
    let c = ecs.register_component(4);
    let e = ecs.create_entity();
    ecs.attach(e, c);

    ecs.destroy_entity(e);
    assert!(!ecs.has(e, c));
    let world = ecs.world().unwrap();
    assert_eq!(world.entity_count(), 1);
    assert_eq!(world.components().store(c).unwrap().len(), 1);

    let report = ecs.update();
    assert_eq!(report.entities_destroyed, 1);
    assert_eq!(ecs.world().unwrap().entity_count(), 0);
    assert!(ecs.world().unwrap().components().store(c).unwrap().is_empty());

    assert!(ecs.update().is_empty());
}

#[test]
fn query_matches_all_requested_types() {
    let mut ecs = setup();
    let a = ecs.register_component(4);
    let b = ecs.register_component(4);
    let e1 = ecs.create_entity();
    let e2 = ecs.create_entity();
    let e3 = ecs.create_entity();
    ecs.attach(e1, a);
    ecs.attach(e2, a);
    ecs.attach(e2, b);
    ecs.attach(e3, b);

    assert_eq!(ecs.query(&[a, b]).unwrap().entities(), &[e2]);
    assert_eq!(ecs.query(&[b, a]).unwrap().entities(), &[e2]);
    assert_eq!(ecs.query(&[a]).unwrap().entities(), &[e1, e2]);
    assert_eq!(ecs.query(&[b]).unwrap().entities(), &[e2, e3]);
    assert_eq!(ecs.query(&[]).unwrap().entities(), &[e1, e2, e3]);
}

#[test]
fn query_columns_follow_request_order() {
    let mut ecs = setup();
    let a = ecs.register_component(4);
    let b = ecs.register_component(2);
    let e = ecs.create_entity();
    ecs.insert(e, a, &7u32);
    ecs.insert(e, b, &9u16);

    let result = ecs.query(&[b, ComponentId::INVALID, a, b]).unwrap();
    assert_eq!(result.component_ids(), &[b, a]);
    let row = result.row(0).unwrap();
    assert_eq!(row.entity(), e);
    assert_eq!(row.read::<u16>(0), Some(9));
    assert_eq!(row.read::<u32>(1), Some(7));
    assert_eq!(row.columns().count(), 2);
    assert!(result.row(1).is_none());
}

#[test]
fn query_excludes_dead_entities() {
    let mut ecs = setup();
    let a = ecs.register_component(4);
    let e1 = ecs.create_entity();
    let e2 = ecs.create_entity();
    ecs.attach(e1, a);
    ecs.attach(e2, a);
    ecs.destroy_entity(e1);

    assert_eq!(ecs.query(&[a]).unwrap().entities(), &[e2]);
    assert_eq!(ecs.query(&[]).unwrap().entities(), &[e2]);
}

#[test]
fn query_rows_follow_slot_order() {
    let mut ecs = setup();
    let e1 = ecs.create_entity();
    let e2 = ecs.create_entity();
    ecs.destroy_entity(e1);
    ecs.update();
    let e3 = ecs.create_entity();
    assert_eq!(ecs.query(&[]).unwrap().entities(), &[e3, e2]);
}

#[test]
fn requery_reflects_latest_state() {
    let mut ecs = setup();
    let a = ecs.register_component(4);
    let e1 = ecs.create_entity();
    let e2 = ecs.create_entity();
    ecs.insert(e1, a, &1u32);
    ecs.insert(e2, a, &2u32);

    let before: Vec<u32> = ecs
        .query(&[a])
        .unwrap()
        .iter()
        .filter_map(|row| row.read::<u32>(0))
        .collect();
    assert_eq!(before, vec![1, 2]);

    ecs.detach(e1, a);
    ecs.write(e2, a, &5u32);
    let e3 = ecs.create_entity();
    ecs.insert(e3, a, &3u32);

    let result = ecs.query(&[a]).unwrap();
    assert_eq!(result.entities(), &[e2, e3]);
    let after: Vec<u32> = result.iter().filter_map(|row| row.read::<u32>(0)).collect();
    assert_eq!(after, vec![5, 3]);
}

#[test]
fn query_mut_writes_through() {
    let mut ecs = setup();
    let pos = ecs.register_component(4);
    let vel = ecs.register_component(4);
    let moving = ecs.create_entity();
    let still = ecs.create_entity();
    ecs.insert(moving, pos, &10u32);
    ecs.insert(moving, vel, &3u32);
    ecs.insert(still, pos, &1u32);

    let mut result = ecs.query_mut(&[pos, vel]).unwrap();
    assert_eq!(result.len(), 1);
    result.for_each(|_, columns| {
        let p = u32::from_le_bytes(columns[0][..4].try_into().unwrap());
        let v = u32::from_le_bytes(columns[1][..4].try_into().unwrap());
        columns[0].copy_from_slice(&(p + v).to_le_bytes());
    });

    assert_eq!(ecs.read::<u32>(moving, pos), Some(13));
    assert_eq!(ecs.read::<u32>(still, pos), Some(1));
}

#[test]
fn zero_size_registration_is_rejected() {
    let mut ecs = setup();
    assert_eq!(ecs.register_component(0), ComponentId::INVALID);
    assert_eq!(ecs.world().unwrap().component_count(), 0);
    let next = ecs.register_component(1);
    assert_eq!(next, ComponentId(1));
}

#[test]
fn unknown_handles_are_ignored() {
    let mut ecs = setup();
    let c = ecs.register_component(4);
    let ghost = Entity(99);
    ecs.attach(ghost, c);
    ecs.detach(ghost, c);
    ecs.destroy_entity(ghost);
    ecs.unregister_component(ComponentId(42));
    assert!(ecs.get(ghost, c).is_none());
    assert!(ecs.world().unwrap().components().store(c).unwrap().is_empty());
}

#[test]
fn many_component_types_span_mask_words() {
    let mut ecs = setup();
    let ids: Vec<ComponentId> = (0..130).map(|_| ecs.register_component(1)).collect();
    let e = ecs.create_entity();
    ecs.attach(e, ids[0]);
    ecs.attach(e, ids[64]);
    ecs.attach(e, ids[129]);

    let mask = &ecs.world().unwrap().entities().get(e).unwrap().mask;
    assert_eq!(mask.word_count(), 3);
    assert!(ecs.has(e, ids[129]));
    assert!(!ecs.has(e, ids[128]));
    assert_eq!(ecs.query(&[ids[0], ids[64], ids[129]]).unwrap().len(), 1);
}

#[test]
fn failed_growth_is_reported_as_absent() {
    let mut ecs = setup();
    let small = ecs.register_component(4);
    let huge = ecs.register_component(isize::MAX as usize + 1);
    let e = ecs.create_entity();
    ecs.insert(e, small, &5u32);

    ecs.attach(e, huge);
    assert!(!ecs.has(e, huge));
    assert!(ecs.get(e, huge).is_none());
    assert_eq!(ecs.read::<u32>(e, small), Some(5));
}
