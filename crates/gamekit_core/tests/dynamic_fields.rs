use gamekit_core::ecs::{
    Component, ComponentDescriptor, Entity, ExecutionGroup, SystemDescriptor, World,
};
use gamekit_core::script::{
    bind_dynamic_field, ComponentExpressionDescriptor, Expression, ExpressionState,
    ScriptableInterface, Value, Variable,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

const SPRITE: u32 = 40;

#[derive(Default)]
struct Sprite {
    opacity: f64,
}

fn opacity(component: &Component) -> f64 {
    component.read(|sprite: &Sprite| sprite.opacity).unwrap()
}

/// World with a render system owning sprites and a script binding that
/// writes numeric values into a sprite's opacity.
fn world(applied: Arc<AtomicUsize>) -> (World, Arc<ScriptableInterface>) {
    let world = World::new();
    world
        .components()
        .register(ComponentDescriptor::typed::<Sprite>(SPRITE).with_name("sprite"));
    world.expressions().register(
        "sprite",
        ComponentExpressionDescriptor::new(SPRITE, move |component, value, _| {
            if let Some(opacity) = value.as_float() {
                component.write(|sprite: &mut Sprite| sprite.opacity = opacity);
                applied.fetch_add(1, Ordering::SeqCst);
            }
        }),
    );
    world
        .scheduler()
        .register(
            SystemDescriptor::new(1, ExecutionGroup::Render)
                .handles_ids([SPRITE])
                .on_update(|tick| {
                    tick.removed_components();
                    tick.added_components();
                }),
        )
        .unwrap();
    let interface = ScriptableInterface::register(&world).unwrap();
    (world, interface)
}

fn opacity_expression() -> Arc<dyn Expression> {
    Arc::new(Variable::new("opacity"))
}

#[test]
fn field_reaches_target_after_update_then_render() {
    let applied = Arc::new(AtomicUsize::new(0));
    let (world, interface) = world(applied.clone());

    let sprite = world.components().create(SPRITE).unwrap();
    world.scheduler().add_component(&sprite);
    world.run_group(ExecutionGroup::Render);

    let mut state = ExpressionState::new();
    state.set("opacity", Value::Float(0.25));
    let state = state.shared();
    let field = bind_dynamic_field(&world, &sprite, opacity_expression(), state.clone()).unwrap();

    world.run_group(ExecutionGroup::Update);
    assert_eq!(interface.bound_group(&field), Some(ExecutionGroup::Render));
    world.run_group(ExecutionGroup::Render);
    assert_eq!(opacity(&sprite), 0.25);
    assert_eq!(applied.load(Ordering::SeqCst), 1);

    state.write().set("opacity", Value::Float(0.75));
    world.run_group(ExecutionGroup::Update);
    world.run_group(ExecutionGroup::Render);
    assert_eq!(opacity(&sprite), 0.75);
    assert_eq!(applied.load(Ordering::SeqCst), 2);
}

#[test]
fn field_is_reapplied_on_every_target_tick() {
    let applied = Arc::new(AtomicUsize::new(0));
    let (world, _interface) = world(applied.clone());

    let sprite = world.components().create(SPRITE).unwrap();
    world.scheduler().add_component(&sprite);
    world.run_group(ExecutionGroup::Render);

    let mut state = ExpressionState::new();
    state.set("opacity", Value::Float(0.25));
    bind_dynamic_field(&world, &sprite, opacity_expression(), state.shared()).unwrap();

    world.run_group(ExecutionGroup::Update);
    world.run_group(ExecutionGroup::Render);
    assert_eq!(opacity(&sprite), 0.25);

    // The render side overwrites the field; the next render tick restores
    // it from the last published state without another update tick.
    for _ in 0..3 {
        sprite.write(|sprite: &mut Sprite| sprite.opacity = 0.0).unwrap();
        world.run_group(ExecutionGroup::Render);
        assert_eq!(opacity(&sprite), 0.25);
    }
    assert_eq!(applied.load(Ordering::SeqCst), 4);
}

#[test]
fn deregistering_the_interface_releases_bound_fields() {
    let (world, interface) = world(Arc::new(AtomicUsize::new(0)));
    let sprite = world.components().create(SPRITE).unwrap();
    world.scheduler().add_component(&sprite);
    world.run_group(ExecutionGroup::Render);

    let field = bind_dynamic_field(
        &world,
        &sprite,
        opacity_expression(),
        ExpressionState::new().shared(),
    )
    .unwrap();
    world.run_group(ExecutionGroup::Update);
    assert_eq!(interface.bound_count(ExecutionGroup::Render), 1);

    interface.deregister(&world);
    assert_eq!(interface.bound_count(ExecutionGroup::Render), 0);
    assert_eq!(field.ref_count(), 1);

    // The target is released by the field along with it.
    let target_refs = sprite.ref_count();
    drop(field);
    assert_eq!(sprite.ref_count(), target_refs - 1);
}

#[test]
fn unowned_targets_are_not_bound() {
    let (world, interface) = world(Arc::new(AtomicUsize::new(0)));
    world
        .components()
        .register(ComponentDescriptor::typed::<Sprite>(SPRITE + 1));
    let loose = world.components().create(SPRITE + 1).unwrap();

    let field = bind_dynamic_field(
        &world,
        &loose,
        opacity_expression(),
        ExpressionState::new().shared(),
    )
    .unwrap();
    world.run_group(ExecutionGroup::Update);

    assert!(field.is_managed());
    assert_eq!(interface.bound_group(&field), None);
}

#[test]
fn field_follows_its_entity_out() {
    let (world, interface) = world(Arc::new(AtomicUsize::new(0)));
    let entity = Entity::new();
    let sprite = world.components().create(SPRITE).unwrap();
    entity.attach_component(&sprite);
    world.scheduler().add_component(&sprite);
    world.entities().add_entity(&entity);

    let field = bind_dynamic_field(
        &world,
        &sprite,
        opacity_expression(),
        ExpressionState::new().shared(),
    )
    .unwrap();
    assert_eq!(field.entity(), Some(entity.clone()));

    world.update_entities();
    world.run_group(ExecutionGroup::Render);
    world.run_group(ExecutionGroup::Update);
    assert_eq!(interface.bound_count(ExecutionGroup::Render), 1);

    world.entities().remove_entity(&entity);
    for _ in 0..3 {
        world.update_entities();
        world.run_group(ExecutionGroup::Update);
        world.run_group(ExecutionGroup::Render);
    }

    assert_eq!(world.entities().pending_destruction(), 0);
    assert_eq!(interface.bound_count(ExecutionGroup::Render), 0);
    assert!(!field.is_managed());
    assert!(!sprite.is_managed());
}

#[test]
fn orphaned_field_removes_itself() {
    let (world, interface) = world(Arc::new(AtomicUsize::new(0)));
    let sprite = world.components().create(SPRITE).unwrap();
    world.scheduler().add_component(&sprite);
    world.run_group(ExecutionGroup::Render);

    let field = bind_dynamic_field(
        &world,
        &sprite,
        opacity_expression(),
        ExpressionState::new().shared(),
    )
    .unwrap();
    world.run_group(ExecutionGroup::Update);
    assert_eq!(interface.bound_group(&field), Some(ExecutionGroup::Render));

    world.scheduler().remove_component(&sprite);
    world.run_group(ExecutionGroup::Render);
    world.run_group(ExecutionGroup::Render);
    drop(sprite);

    // The field now holds the only reference to its unmanaged target.
    world.run_group(ExecutionGroup::Render);
    assert_eq!(
        world
            .scheduler()
            .system(ScriptableInterface::system_id(ExecutionGroup::Update))
            .unwrap()
            .pending_removals(),
        1
    );

    world.run_group(ExecutionGroup::Update);
    world.run_group(ExecutionGroup::Update);
    assert_eq!(interface.bound_group(&field), None);
    assert!(!field.is_managed());
}

#[test]
fn render_lane_applies_while_update_lane_publishes() {
    let applied = Arc::new(AtomicUsize::new(0));
    let (world, _interface) = world(applied.clone());
    let world = Arc::new(world);

    let sprite = world.components().create(SPRITE).unwrap();
    world.scheduler().add_component(&sprite);
    world.run_group(ExecutionGroup::Render);

    let mut state = ExpressionState::new();
    state.set("opacity", Value::Float(1.0));
    bind_dynamic_field(&world, &sprite, opacity_expression(), state.shared()).unwrap();

    let lanes: Vec<_> = [ExecutionGroup::Update, ExecutionGroup::Render]
        .into_iter()
        .map(|group| {
            let world = Arc::clone(&world);
            thread::spawn(move || {
                for _ in 0..500 {
                    world.run_group(group);
                }
            })
        })
        .collect();
    for lane in lanes {
        lane.join().unwrap();
    }

    world.run_group(ExecutionGroup::Update);
    world.run_group(ExecutionGroup::Render);
    assert_eq!(opacity(&sprite), 1.0);
    assert!(applied.load(Ordering::SeqCst) >= 1);
}
