//! Worker-backed browser and page handles
//!
//! Each page is a task that owns the page state (current URL, host mode,
//! mounted form) and executes commands sent from driver code. The page's
//! global scope ([`Globals`]) is the only state shared with the driver
//! directly.

use std::sync::Arc;

use log::{debug, error, info, trace};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use url::Url;

use crate::channel::{ExposedFn, FormEvents, Globals};
use crate::dom::{self, Element, Role, Selector, Snapshot};
use crate::gate::ReadinessGate;
use crate::host::{self, HostMode};
use crate::launcher::{LaunchConfig, LaunchTarget, Launcher};
use crate::locator::Locator;
use crate::renderer::{Action, FormRenderer, MountedForm};
use crate::{Error, HarnessConfig, Result};

/// Result of resolving a selector chain against the current tree.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    pub element: Option<Element>,
    /// Element and all of its ancestors are visible
    pub visible: bool,
    pub count: usize,
}

enum Command {
    Goto(String, oneshot::Sender<Result<()>>),
    Mount(u64, Arc<LaunchConfig>),
    Probe(Vec<Selector>, oneshot::Sender<Result<Probe>>),
    Dispatch(Vec<Selector>, Action, oneshot::Sender<Result<()>>),
    Snapshot(oneshot::Sender<Result<Snapshot>>),
    MouseMove(f64, f64, u32, oneshot::Sender<Result<()>>),
    Pointer(oneshot::Sender<Result<(f64, f64)>>),
    Close(oneshot::Sender<Result<()>>),
}

/// Creates pages that share a configuration and a renderer.
#[derive(Clone)]
pub struct Browser {
    config: Arc<HarnessConfig>,
    renderer: Arc<dyn FormRenderer>,
}

impl Browser {
    /// Create a browser backed by the built-in headless renderer.
    #[cfg(feature = "headless")]
    pub async fn new(config: Option<HarnessConfig>) -> Result<Self> {
        Self::with_renderer(config, Arc::new(crate::renderer::HeadlessOne::new())).await
    }

    pub async fn with_renderer(
        config: Option<HarnessConfig>,
        renderer: Arc<dyn FormRenderer>,
    ) -> Result<Self> {
        let config = config.unwrap_or_default();
        config
            .validate()
            .map_err(|e| Error::InitializationError(e.to_string()))?;
        Ok(Self {
            config: Arc::new(config),
            renderer,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Open a new blank page with its own worker task.
    pub async fn new_page(&self) -> Result<Page> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        let globals = Arc::new(Globals::new());
        let state = PageState {
            config: self.config.clone(),
            renderer: self.renderer.clone(),
            globals: globals.clone(),
            cmd_tx: cmd_tx.downgrade(),
            url: self.config.blank_url.clone(),
            mode: HostMode::Blank,
            generation: 0,
            entry: None,
            form: None,
            pointer: (0.0, 0.0),
        };
        tokio::spawn(state.run(cmd_rx));
        Ok(Page {
            cmd_tx,
            globals,
            config: self.config.clone(),
        })
    }
}

/// Handle to one page. Cheap to clone; all clones drive the same page.
#[derive(Clone)]
pub struct Page {
    cmd_tx: mpsc::UnboundedSender<Command>,
    globals: Arc<Globals>,
    config: Arc<HarnessConfig>,
}

impl Page {
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<Result<T>>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx.send(make(tx)).map_err(|_| Error::PageClosed)?;
        rx.await.map_err(|_| Error::PageClosed)?
    }

    /// Navigate, resetting the page's launch target and mounted form.
    pub async fn goto(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        self.request(|tx| Command::Goto(url, tx)).await
    }

    /// Expose `f` in the page's global scope under `name`. Registrations
    /// survive navigation; registering a name again replaces it.
    pub fn expose_function<F>(&self, name: &str, f: F)
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.globals.expose(name, Arc::new(f));
    }

    pub fn expose_shared(&self, name: &str, f: ExposedFn) {
        self.globals.expose(name, f);
    }

    /// The launch target the host attached for the current load, if any.
    pub fn launch_target(&self) -> Option<LaunchTarget> {
        self.globals.launch_target()
    }

    pub async fn probe(&self, chain: &[Selector]) -> Result<Probe> {
        let chain = chain.to_vec();
        self.request(|tx| Command::Probe(chain, tx)).await
    }

    pub async fn dispatch(&self, chain: &[Selector], action: Action) -> Result<()> {
        let chain = chain.to_vec();
        self.request(|tx| Command::Dispatch(chain, action, tx)).await
    }

    pub async fn snapshot(&self) -> Result<Snapshot> {
        self.request(Command::Snapshot).await
    }

    /// Move the pointer to `(x, y)` in `steps` interpolated steps.
    pub async fn mouse_move(&self, x: f64, y: f64, steps: u32) -> Result<()> {
        self.request(|tx| Command::MouseMove(x, y, steps, tx)).await
    }

    pub async fn pointer(&self) -> Result<(f64, f64)> {
        self.request(Command::Pointer).await
    }

    pub fn get_by_test_id(&self, test_id: &str) -> Locator {
        Locator::new(self.clone(), vec![Selector::TestId(test_id.to_string())])
    }

    pub fn get_by_role(&self, role: Role) -> Locator {
        Locator::new(self.clone(), vec![Selector::Role(role)])
    }

    pub fn get_by_label(&self, label: &str) -> Locator {
        Locator::new(self.clone(), vec![Selector::Label(label.to_string())])
    }

    pub fn get_by_text(&self, text: &str) -> Locator {
        Locator::new(self.clone(), vec![Selector::Text(text.to_string())])
    }

    /// Shut down the page worker. Exposed functions are dropped with it.
    pub async fn close(self) -> Result<()> {
        self.request(Command::Close).await
    }
}

struct PageState {
    config: Arc<HarnessConfig>,
    renderer: Arc<dyn FormRenderer>,
    globals: Arc<Globals>,
    cmd_tx: mpsc::WeakUnboundedSender<Command>,
    url: String,
    mode: HostMode,
    /// Bumped on every navigation so late mounts from an old entry are dropped
    generation: u64,
    entry: Option<JoinHandle<()>>,
    form: Option<Box<dyn MountedForm>>,
    pointer: (f64, f64),
}

impl PageState {
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                Command::Goto(url, resp) => {
                    let res = self.navigate(&url);
                    let _ = resp.send(res);
                }
                Command::Mount(generation, config) => {
                    if generation == self.generation {
                        self.mount(config);
                    } else {
                        debug!("dropping stale mount from load #{}", generation);
                    }
                }
                Command::Probe(chain, resp) => {
                    let _ = resp.send(Ok(self.probe(&chain)));
                }
                Command::Dispatch(chain, action, resp) => {
                    let res = self.dispatch(&chain, action);
                    let _ = resp.send(res);
                }
                Command::Snapshot(resp) => {
                    let snapshot = Snapshot::capture(&self.url, &self.tree());
                    let _ = resp.send(Ok(snapshot));
                }
                Command::MouseMove(x, y, steps, resp) => {
                    self.move_pointer(x, y, steps);
                    let _ = resp.send(Ok(()));
                }
                Command::Pointer(resp) => {
                    let _ = resp.send(Ok(self.pointer));
                }
                Command::Close(resp) => {
                    self.reset();
                    let _ = resp.send(Ok(()));
                    break;
                }
            }
        }
        self.reset();
        debug!("page worker for {} stopped", self.url);
    }

    fn reset(&mut self) {
        if let Some(entry) = self.entry.take() {
            entry.abort();
        }
        self.form = None;
        self.globals.detach_launch_target();
    }

    fn navigate(&mut self, url: &str) -> Result<()> {
        let parsed = Url::parse(url)?;
        self.reset();
        self.generation += 1;
        self.url = parsed.to_string();
        self.mode = HostMode::detect(&parsed, &self.config);
        info!("navigated to {} ({:?})", self.url, self.mode);

        match self.mode {
            HostMode::Blank => {}
            HostMode::Standalone => self.mount(Arc::new(host::standalone_config())),
            HostMode::Harness => {
                let launcher = Launcher::new();
                self.globals
                    .attach_launch_target(LaunchTarget::new(launcher.clone()));
                let globals = self.globals.clone();
                let gate = ReadinessGate::from_config(&self.config);
                let cmd_tx = self.cmd_tx.clone();
                let generation = self.generation;
                self.entry = Some(tokio::spawn(async move {
                    if let Some(config) = host::run_entry(launcher, globals, gate).await {
                        if let Some(tx) = cmd_tx.upgrade() {
                            let _ = tx.send(Command::Mount(generation, config));
                        }
                    }
                }));
            }
        }
        Ok(())
    }

    fn mount(&mut self, config: Arc<LaunchConfig>) {
        match self
            .renderer
            .mount(config, FormEvents::new(self.globals.clone()))
        {
            Ok(form) => {
                debug!("form mounted on {}", self.url);
                self.form = Some(form);
            }
            Err(e) => error!("mount failed on {}: {}", self.url, e),
        }
    }

    fn tree(&self) -> Element {
        match (&self.form, self.mode) {
            (Some(form), _) => form.tree(),
            (None, HostMode::Harness) => {
                let mut root = Element::new(Role::Root);
                root.children.push(Element::new(Role::Progress));
                root
            }
            (None, _) => Element::new(Role::Root),
        }
    }

    fn probe(&self, chain: &[Selector]) -> Probe {
        let tree = self.tree();
        Probe {
            element: dom::resolve(&tree, chain).cloned(),
            visible: dom::is_effectively_visible(&tree, chain),
            count: dom::count(&tree, chain),
        }
    }

    fn dispatch(&mut self, chain: &[Selector], action: Action) -> Result<()> {
        let tree = self.tree();
        let describe = || {
            chain
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" >> ")
        };
        let element = dom::resolve(&tree, chain).ok_or_else(|| Error::ElementNotFound(describe()))?;
        let key = element
            .key
            .ok_or_else(|| Error::RenderError(format!("{} is not a form field", describe())))?;
        let form = self
            .form
            .as_mut()
            .ok_or_else(|| Error::RenderError("no form mounted".into()))?;
        form.dispatch(key, action)
    }

    fn move_pointer(&mut self, x: f64, y: f64, steps: u32) {
        let (from_x, from_y) = self.pointer;
        let steps = steps.max(1);
        for i in 1..steps {
            let t = f64::from(i) / f64::from(steps);
            trace!(
                "pointer step {}/{} at ({}, {})",
                i,
                steps,
                from_x + (x - from_x) * t,
                from_y + (y - from_y) * t
            );
        }
        self.pointer = (x, y);
        debug!("pointer at {:?}", self.pointer);
    }
}
