//! Scene state machine.
//!
//! Scenes are the only states; transitions happen solely through the
//! value a scene returns from `execute`. The machine is driven once
//! per frame by the event loop: activation runs `init`, a transition
//! runs `deinit` on the old scene and `init` on the new one, and a
//! scene returning no successor ends the program.

pub type SceneId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneOutcome {
    /// Keep executing this scene next frame.
    Running,
    /// Leave this scene; `Some` activates the named scene, `None`
    /// terminates the machine.
    Transition(Option<SceneId>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MachineStep {
    Continue,
    Exit,
}

pub trait Scene<C> {
    fn id(&self) -> SceneId;
    fn name(&self) -> &str;

    fn init(&mut self, _ctx: &mut C) {}
    fn execute(&mut self, ctx: &mut C, dt: f32) -> SceneOutcome;
    fn deinit(&mut self, _ctx: &mut C) {}
}

pub struct SceneMachine<C> {
    scenes: Vec<Box<dyn Scene<C>>>,
    active: Option<SceneId>,
    initialized: bool,
}

impl<C> Default for SceneMachine<C> {
    fn default() -> Self {
        Self {
            scenes: Vec::new(),
            active: None,
            initialized: false,
        }
    }
}

impl<C> SceneMachine<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, scene: Box<dyn Scene<C>>) {
        debug_assert!(
            self.find(scene.id()).is_none(),
            "scene id {} registered twice",
            scene.id()
        );
        self.scenes.push(scene);
    }

    pub fn set_active(&mut self, id: SceneId) {
        self.active = Some(id);
        self.initialized = false;
    }

    pub fn active(&self) -> Option<SceneId> {
        self.active
    }

    pub fn scene_names(&self) -> impl Iterator<Item = &str> {
        self.scenes.iter().map(|s| s.name())
    }

    fn find(&self, id: SceneId) -> Option<usize> {
        self.scenes.iter().position(|s| s.id() == id)
    }

    /// Run one frame of the active scene. Returns `Exit` when there is
    /// no active scene or the active scene ends without a successor.
    pub fn advance(&mut self, ctx: &mut C, dt: f32) -> MachineStep {
        let Some(active_id) = self.active else {
            return MachineStep::Exit;
        };
        let Some(index) = self.find(active_id) else {
            log::error!("Active scene {active_id} is not registered");
            self.active = None;
            return MachineStep::Exit;
        };

        if !self.initialized {
            log::info!("Entering scene '{}'", self.scenes[index].name());
            self.scenes[index].init(ctx);
            self.initialized = true;
        }

        match self.scenes[index].execute(ctx, dt) {
            SceneOutcome::Running => MachineStep::Continue,
            SceneOutcome::Transition(next) => {
                log::info!("Leaving scene '{}'", self.scenes[index].name());
                self.scenes[index].deinit(ctx);
                self.initialized = false;
                self.active = next;
                match next {
                    Some(_) => MachineStep::Continue,
                    None => MachineStep::Exit,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Trace {
        events: Vec<String>,
    }

    struct Countdown {
        id: SceneId,
        frames: u32,
        next: Option<SceneId>,
    }

    impl Scene<Trace> for Countdown {
        fn id(&self) -> SceneId {
            self.id
        }
        fn name(&self) -> &str {
            "countdown"
        }
        fn init(&mut self, ctx: &mut Trace) {
            ctx.events.push(format!("init {}", self.id));
        }
        fn execute(&mut self, ctx: &mut Trace, _dt: f32) -> SceneOutcome {
            ctx.events.push(format!("exec {}", self.id));
            if self.frames == 0 {
                SceneOutcome::Transition(self.next)
            } else {
                self.frames -= 1;
                SceneOutcome::Running
            }
        }
        fn deinit(&mut self, ctx: &mut Trace) {
            ctx.events.push(format!("deinit {}", self.id));
        }
    }

    #[test]
    fn runs_init_once_then_executes_each_frame() {
        let mut machine = SceneMachine::new();
        machine.register(Box::new(Countdown {
            id: 0,
            frames: 2,
            next: None,
        }));
        machine.set_active(0);

        let mut trace = Trace::default();
        assert_eq!(machine.advance(&mut trace, 0.016), MachineStep::Continue);
        assert_eq!(machine.advance(&mut trace, 0.016), MachineStep::Continue);
        assert_eq!(machine.advance(&mut trace, 0.016), MachineStep::Exit);
        assert_eq!(
            trace.events,
            vec!["init 0", "exec 0", "exec 0", "exec 0", "deinit 0"]
        );
    }

    #[test]
    fn transition_deinits_old_and_inits_new() {
        let mut machine = SceneMachine::new();
        machine.register(Box::new(Countdown {
            id: 0,
            frames: 0,
            next: Some(1),
        }));
        machine.register(Box::new(Countdown {
            id: 1,
            frames: 0,
            next: None,
        }));
        machine.set_active(0);

        let mut trace = Trace::default();
        assert_eq!(machine.advance(&mut trace, 0.0), MachineStep::Continue);
        assert_eq!(machine.active(), Some(1));
        assert_eq!(machine.advance(&mut trace, 0.0), MachineStep::Exit);
        assert_eq!(machine.active(), None);
        assert_eq!(
            trace.events,
            vec!["init 0", "exec 0", "deinit 0", "init 1", "exec 1", "deinit 1"]
        );
    }

    #[test]
    fn no_active_scene_exits_immediately() {
        let mut machine: SceneMachine<Trace> = SceneMachine::new();
        machine.register(Box::new(Countdown {
            id: 0,
            frames: 0,
            next: None,
        }));
        let mut trace = Trace::default();
        assert_eq!(machine.advance(&mut trace, 0.0), MachineStep::Exit);
        assert!(trace.events.is_empty());
    }

    #[test]
    fn registration_order_is_preserved() {
        let mut machine: SceneMachine<Trace> = SceneMachine::new();
        for id in [3, 1, 2] {
            machine.register(Box::new(Countdown {
                id,
                frames: 0,
                next: None,
            }));
        }
        let names: Vec<&str> = machine.scene_names().collect();
        assert_eq!(names.len(), 3);
    }
}
