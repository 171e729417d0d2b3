//! Playable demo scene: a ship, orbiting asteroids and shots that
//! carry their own point lights.

use std::convert::Infallible;

use glam::{Vec2, Vec3};
use winit::keyboard::KeyCode;

use crate::asset::{load_obj, Handle, ResourceStore};
use crate::engine::Engine;
use crate::render::primitives::cube_vertices;
use crate::render::{Mesh, Shader, ShadowError, Texture};
use crate::scene::{Collider, Light, Model, Scene, SceneId, SceneOutcome};

pub const SPACE_SCENE: SceneId = 0;

const SHIP_SPEED: f32 = 6.0;
const SHOT_SPEED: f32 = 18.0;
const SHOT_LIFETIME: f32 = 2.5;
const FIRE_COOLDOWN: f32 = 0.3;

fn create<T>(
    store: &mut ResourceStore<T>,
    name: &str,
    build: impl FnOnce() -> T,
) -> Handle<T> {
    match store.create(name, || Ok::<_, Infallible>(build())) {
        Ok(handle) => handle,
        Err(never) => match never {},
    }
}

struct Orbit {
    model: u32,
    radius: f32,
    speed: f32,
    phase: f32,
}

struct Shot {
    model: u32,
    light: Option<u32>,
    velocity: Vec3,
    age: f32,
}

pub struct SpaceScene {
    ship: u32,
    asteroids: Vec<Orbit>,
    shots: Vec<Shot>,
    lights: Vec<u32>,
    cooldown: f32,
    shot_counter: u32,
    hits: u32,
    time: f32,
}

impl SpaceScene {
    pub fn new() -> Self {
        Self {
            ship: 0,
            asteroids: Vec::new(),
            shots: Vec::new(),
            lights: Vec::new(),
            cooldown: 0.0,
            shot_counter: 0,
            hits: 0,
            time: 0.0,
        }
    }

    fn spawn_shot(&mut self, engine: &mut Engine, origin: Vec3) {
        let mesh = engine
            .meshes
            .get("cube")
            .expect("demo meshes registered in init");
        let texture = engine
            .textures
            .get("shot")
            .expect("demo textures registered in init");
        let shader = engine
            .shaders
            .get("lit")
            .expect("demo shader registered in init");

        let mut model = Model::new("shot", mesh, texture, shader)
            .with_collider(Collider::sphere(1.0));
        model.set_scale(Vec3::splat(0.2));
        model.set_position(origin);
        let model_id = engine.models.register(model);

        self.shot_counter += 1;
        let light = if engine.shot_lights {
            self.attach_light(engine, origin)
        } else {
            None
        };

        self.shots.push(Shot {
            model: model_id,
            light,
            velocity: Vec3::NEG_Z * SHOT_SPEED,
            age: 0.0,
        });
    }

    fn attach_light(&mut self, engine: &mut Engine, position: Vec3) -> Option<u32> {
        let name = format!("shot-{}", self.shot_counter);
        match engine.add_light(Light::point(
            position,
            Vec3::new(1.0, 0.6, 0.2),
            2.0,
            0.1,
            20.0,
            name,
        )) {
            Ok(id) => Some(id),
            Err(ShadowError::Exhausted(kind, cap)) => {
                log::debug!("No free {kind:?} shadow layer (cap {cap}); shot stays unlit");
                None
            }
        }
    }
}

impl Default for SpaceScene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene<Engine> for SpaceScene {
    fn id(&self) -> SceneId {
        SPACE_SCENE
    }

    fn name(&self) -> &str {
        "space"
    }

    fn init(&mut self, engine: &mut Engine) {
        let Engine {
            context,
            meshes,
            textures,
            shaders,
            pipeline,
            ..
        } = engine;
        let device = &context.device;
        let queue = &context.queue;
        let layout = pipeline.diffuse_layout();

        let shader = create(shaders, "lit", || {
            Shader::from_source(device, Some("lit"), include_str!("shader/lit.wgsl"))
        });

        let cube = create(meshes, "cube", || {
            Mesh::from_vertices(device, "Cube", &cube_vertices())
        });
        let ship_mesh = create(meshes, "ship", || match load_obj("assets/ship.obj") {
            Ok(obj) => Mesh::from_obj(device, "Ship", &obj),
            Err(err) => {
                log::warn!("Ship mesh unavailable ({err}); using cube");
                Mesh::from_vertices(device, "Ship", &cube_vertices())
            }
        });

        let floor_tex = create(textures, "floor", || {
            Texture::checkerboard(
                device,
                queue,
                layout,
                256,
                32,
                [40, 40, 60, 255],
                [25, 25, 35, 255],
            )
        });
        let ship_tex = create(textures, "ship", || {
            match Texture::from_path(device, queue, layout, "assets/ship.bmp") {
                Ok(tex) => tex,
                Err(err) => {
                    log::warn!("Ship texture unavailable ({err}); using checkerboard");
                    Texture::checkerboard(
                        device,
                        queue,
                        layout,
                        64,
                        8,
                        [200, 200, 210, 255],
                        [90, 90, 110, 255],
                    )
                }
            }
        });
        let rock_tex = create(textures, "asteroid", || {
            Texture::checkerboard(
                device,
                queue,
                layout,
                64,
                16,
                [120, 90, 70, 255],
                [70, 55, 45, 255],
            )
        });
        let shot_tex = create(textures, "shot", || Texture::white(device, queue, layout));

        let mut floor = Model::new("floor", cube, floor_tex, shader);
        floor.set_scale(Vec3::new(40.0, 1.0, 40.0));
        floor.set_position(Vec3::new(0.0, -2.5, 0.0));
        engine.models.register(floor);

        let ship_points = engine
            .meshes
            .resource(ship_mesh)
            .map(|mesh| mesh.positions().to_vec())
            .unwrap_or_default();
        let mut ship = Model::new("ship", ship_mesh, ship_tex, shader);
        if let Some(collider) = Collider::from_mesh_points(&ship_points) {
            ship = ship.with_collider(collider);
        }
        ship.set_position(Vec3::new(0.0, 0.0, 4.0));
        self.ship = engine.models.register(ship);

        for (i, radius) in [4.0f32, 6.5, 9.0].into_iter().enumerate() {
            let mut rock = Model::new("asteroid", cube, rock_tex, shader)
                .with_collider(Collider::sphere(1.0));
            rock.set_position(Vec3::new(radius, 0.0, -6.0));
            let model = engine.models.register(rock);
            self.asteroids.push(Orbit {
                model,
                radius,
                speed: 0.4 + i as f32 * 0.25,
                phase: i as f32 * 2.1,
            });
        }

        match engine.add_light(Light::cone(
            Vec3::new(6.0, 10.0, 6.0),
            Vec3::new(-0.5, -1.0, -0.5).normalize(),
            Vec3::new(1.0, 0.95, 0.85),
            3.0,
            0.5,
            60.0,
            "sun",
        )) {
            Ok(id) => self.lights.push(id),
            Err(err) => log::error!("Could not light the scene: {err}"),
        }
        match engine.add_light(Light::point(
            Vec3::new(-4.0, 1.5, -4.0),
            Vec3::new(0.3, 0.5, 1.0),
            2.5,
            0.1,
            30.0,
            "glow",
        )) {
            Ok(id) => self.lights.push(id),
            Err(err) => log::error!("Could not place the glow light: {err}"),
        }
    }

    fn execute(&mut self, engine: &mut Engine, dt: f32) -> SceneOutcome {
        self.time += dt;
        self.cooldown = (self.cooldown - dt).max(0.0);

        let mut steer = Vec3::ZERO;
        if engine.input.key_down(KeyCode::KeyA) || engine.input.key_down(KeyCode::ArrowLeft) {
            steer.x -= 1.0;
        }
        if engine.input.key_down(KeyCode::KeyD) || engine.input.key_down(KeyCode::ArrowRight) {
            steer.x += 1.0;
        }
        if engine.input.key_down(KeyCode::KeyW) || engine.input.key_down(KeyCode::ArrowUp) {
            steer.z -= 1.0;
        }
        if engine.input.key_down(KeyCode::KeyS) || engine.input.key_down(KeyCode::ArrowDown) {
            steer.z += 1.0;
        }

        let mut ship_pos = Vec3::ZERO;
        if let Some(ship) = engine.models.get_mut(self.ship) {
            if steer != Vec3::ZERO {
                ship.translate(steer.normalize() * SHIP_SPEED * dt);
            }
            ship_pos = ship.position();
        }

        for orbit in &self.asteroids {
            if let Some(rock) = engine.models.get_mut(orbit.model) {
                let angle = self.time * orbit.speed + orbit.phase;
                rock.set_position(Vec3::new(
                    angle.cos() * orbit.radius,
                    0.0,
                    angle.sin() * orbit.radius - 6.0,
                ));
                rock.set_rotation(Vec3::new(angle, angle * 0.7, 0.0));
            }
        }

        if engine.input.key_down(KeyCode::Space) && self.cooldown == 0.0 {
            self.cooldown = FIRE_COOLDOWN;
            self.spawn_shot(engine, ship_pos + Vec3::new(0.0, 0.0, -1.5));
        }

        let mut expired = Vec::new();
        for (index, shot) in self.shots.iter_mut().enumerate() {
            shot.age += dt;

            let mut pos = Vec3::ZERO;
            if let Some(model) = engine.models.get_mut(shot.model) {
                model.translate(shot.velocity * dt);
                pos = model.position();
            }

            // Shots observe the light toggle every update.
            match (engine.shot_lights, shot.light) {
                (false, Some(id)) => {
                    engine.remove_light(id);
                    shot.light = None;
                }
                (true, Some(id)) => {
                    if let Some(light) = engine.lights.get_mut(id) {
                        light.position = pos;
                    }
                }
                _ => {}
            }

            let mut hit = false;
            for orbit in &self.asteroids {
                let (Some(a), Some(b)) =
                    (engine.models.get(shot.model), engine.models.get(orbit.model))
                else {
                    continue;
                };
                if a.collides_with(b, true) {
                    hit = true;
                    break;
                }
            }
            if hit {
                self.hits += 1;
            }
            if hit || shot.age > SHOT_LIFETIME {
                expired.push(index);
            }
        }

        for index in expired.into_iter().rev() {
            let shot = self.shots.remove(index);
            engine.models.deregister(shot.model);
            if let Some(light) = shot.light {
                engine.remove_light(light);
            }
        }

        // Relight shots that lost their light while the toggle was off.
        if engine.shot_lights {
            let mut relight = Vec::new();
            for (index, shot) in self.shots.iter().enumerate() {
                if shot.light.is_none() {
                    if let Some(model) = engine.models.get(shot.model) {
                        relight.push((index, model.position()));
                    }
                }
            }
            for (index, pos) in relight {
                self.shot_counter += 1;
                self.shots[index].light = self.attach_light(engine, pos);
            }
        }

        if let Some(text) = &mut engine.text {
            text.enqueue("VOIDSTRIKE", Vec2::new(0.0, 25.0), 1.0);
            text.enqueue(format!("hits {}", self.hits), Vec2::new(0.0, 24.0), 1.0);
        }

        SceneOutcome::Running
    }

    fn deinit(&mut self, engine: &mut Engine) {
        for shot in self.shots.drain(..) {
            engine.models.deregister(shot.model);
            if let Some(light) = shot.light {
                engine.remove_light(light);
            }
        }
        for id in self.lights.drain(..) {
            engine.remove_light(id);
        }
        engine.models.clear();
        self.asteroids.clear();
    }
}
