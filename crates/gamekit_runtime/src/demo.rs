//! Demo scene: moving bodies whose sprites fade under script control.

use anyhow::{Context, Result};
use gamekit_core::ecs::{
    Component, ComponentDescriptor, Entity, ExecutionGroup, SystemDescriptor, World,
};
use gamekit_core::message::{Message, SystemRouter};
use gamekit_core::script::{
    bind_dynamic_field, ComponentExpressionDescriptor, ExpressionState, ScriptableInterface,
    SharedState, Value, Variable,
};
use std::sync::Arc;
use tracing::{debug, info};

pub const BODY: u32 = 100;
pub const SPRITE: u32 = 101;

pub const PHYSICS_SYSTEM: u32 = 1;
pub const RENDER_SYSTEM: u32 = 2;
pub const SCRIPT_SYSTEM: u32 = 3;

/// Message asking the render system to log what it draws.
pub const REPORT_MESSAGE: u32 = 1;

#[derive(Debug, Default, Clone, Copy)]
pub struct Body {
    pub position: f64,
    pub velocity: f64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Sprite {
    pub opacity: f64,
}

pub struct Demo {
    interface: Arc<ScriptableInterface>,
    entities: Vec<Entity>,
}

impl Demo {
    pub fn setup(world: &World, count: usize) -> Result<Self> {
        world
            .components()
            .register(ComponentDescriptor::typed::<Body>(BODY).with_name("body"));
        world
            .components()
            .register(ComponentDescriptor::typed::<Sprite>(SPRITE).with_name("sprite"));
        world.expressions().register(
            "sprite",
            ComponentExpressionDescriptor::new(SPRITE, |component, value, _| {
                if let Some(opacity) = value.as_float() {
                    component.write(|sprite: &mut Sprite| sprite.opacity = opacity.clamp(0.0, 1.0));
                }
            })
            .with_serializer(|component| {
                component.read(|sprite: &Sprite| Value::field("opacity", Value::Float(sprite.opacity)))
            }),
        );

        Self::register_systems(world)?;
        let interface =
            ScriptableInterface::register(world).context("failed to register scriptable interface")?;

        let fade = ExpressionState::new().shared();
        let mut entities = Vec::with_capacity(count);
        for index in 0..count {
            entities.push(Self::spawn(world, index, &fade)?);
        }

        Self::register_script(world, fade)?;
        info!(entities = count, "demo scene ready");
        Ok(Self {
            interface,
            entities,
        })
    }

    fn register_systems(world: &World) -> Result<()> {
        world.scheduler().register(
            SystemDescriptor::new(PHYSICS_SYSTEM, ExecutionGroup::Physics)
                .handles_ids([BODY])
                .on_update(|tick| {
                    tick.removed_components();
                    tick.added_components();
                    let dt = tick.delta().unwrap_or_default().as_secs_f64();
                    for body in tick.components() {
                        body.write(|body: &mut Body| body.position += body.velocity * dt);
                    }
                }),
        )?;

        world.scheduler().register(
            SystemDescriptor::new(RENDER_SYSTEM, ExecutionGroup::Render)
                .handles_ids([SPRITE])
                .on_update(|tick| {
                    tick.removed_components();
                    tick.added_components();
                })
                .on_message(|tick, message| {
                    let visible = tick
                        .components()
                        .iter()
                        .filter(|sprite| {
                            sprite
                                .read(|sprite: &Sprite| sprite.opacity > 0.0)
                                .unwrap_or(false)
                        })
                        .count();
                    info!(
                        message = message.id(),
                        sprites = tick.components().len(),
                        visible,
                        "render report"
                    );
                }),
        )?;
        Ok(())
    }

    /// Update-lane system that animates the shared fade variable.
    fn register_script(world: &World, fade: SharedState) -> Result<()> {
        world.scheduler().register(
            SystemDescriptor::new(SCRIPT_SYSTEM, ExecutionGroup::Update).on_update(move |tick| {
                let elapsed = tick.delta().unwrap_or_default().as_secs_f64();
                let mut state = fade.write();
                let time = state.get("time").and_then(Value::as_float).unwrap_or(0.0) + elapsed;
                state.set("time", Value::Float(time));
                state.set("fade", Value::Float((time.sin() + 1.0) / 2.0));
            }),
        )?;
        Ok(())
    }

    fn spawn(world: &World, index: usize, fade: &SharedState) -> Result<Entity> {
        let entity = Entity::with_id(format!("body-{index}"));
        let body = Self::create(world, BODY)?;
        body.write(|body: &mut Body| body.velocity = 1.0 + index as f64);
        let sprite = Self::create(world, SPRITE)?;

        for component in [&body, &sprite] {
            entity.attach_component(component);
            world.scheduler().add_component(component);
        }
        bind_dynamic_field(world, &sprite, Arc::new(Variable::new("fade")), Arc::clone(fade))
            .context("failed to bind sprite fade")?;

        world.entities().add_entity(&entity);
        debug!(entity = ?entity.id(), "spawned");
        Ok(entity)
    }

    fn create(world: &World, id: u32) -> Result<Component> {
        world
            .components()
            .create(id)
            .with_context(|| format!("failed to create component {id}"))
    }

    /// Ask the render lane for a report on its next tick.
    pub fn request_report(world: &World) {
        Message::new(REPORT_MESSAGE, SystemRouter::new(RENDER_SYSTEM)).post(world);
    }

    pub fn summary(&self, world: &World) {
        for entity in &self.entities {
            let position = entity
                .component(BODY)
                .and_then(|body| body.read(|body: &Body| body.position));
            let sprite = entity
                .component(SPRITE)
                .and_then(|sprite| world.expressions().serialize(&sprite));
            info!(entity = ?entity.id(), ?position, ?sprite, "final state");
        }
    }

    /// Remove every entity and drain the lanes until all are freed, then
    /// take the scriptable interface down. Lane threads must be stopped.
    pub fn teardown(self, world: &World) {
        for entity in &self.entities {
            world.entities().remove_entity(entity);
        }

        let mut cycles = 0;
        loop {
            world.update_entities();
            for group in ExecutionGroup::ALL {
                world.run_group(group);
            }
            cycles += 1;
            if world.entities().pending_destruction() == 0 || cycles >= 16 {
                break;
            }
        }
        info!(
            cycles,
            pending = world.entities().pending_destruction(),
            "demo entities released"
        );

        self.interface.deregister(world);
    }
}
