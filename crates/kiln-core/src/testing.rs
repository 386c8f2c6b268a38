//! Test doubles for the collaborator traits.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use crate::environment::EnvironmentHook;
use crate::error::{Error, Result};
use crate::invocation::ResolvedTarget;
use crate::replace::{Exec, ExecRequest};
use crate::resolve::Resolver;
use crate::runtime::{ScriptContext, ScriptError, ScriptFailure, ScriptRuntime};
use crate::settings::Settings;
use crate::signals::SignalTable;
use crate::ui::{Ui, UiHandle};

#[derive(Clone, Default)]
pub struct RecordingUi {
    errors: Rc<RefCell<Vec<String>>>,
    warnings: Rc<RefCell<Vec<String>>>,
}

impl RecordingUi {
    pub fn errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }
}

impl Ui for RecordingUi {
    fn error(&self, message: &str) {
        self.errors.borrow_mut().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }
}

#[derive(Clone, Default)]
pub struct FakeResolver {
    known: HashMap<String, PathBuf>,
    calls: Rc<Cell<usize>>,
}

impl FakeResolver {
    pub fn with(mut self, command: &str, path: impl Into<PathBuf>) -> Self {
        self.known.insert(command.to_string(), path.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Resolver for FakeResolver {
    fn resolve(&self, command: &str) -> ResolvedTarget {
        self.calls.set(self.calls.get() + 1);
        ResolvedTarget {
            path: self.known.get(command).cloned(),
        }
    }
}

#[derive(Default)]
struct ExecState {
    requests: Vec<ExecRequest>,
    ui: Option<UiHandle>,
    ui_suppressed: Option<bool>,
}

#[derive(Clone)]
pub struct FakeExec {
    result: std::result::Result<i32, i32>,
    state: Rc<RefCell<ExecState>>,
}

impl FakeExec {
    /// Pretends the image was replaced by a target exiting with `code`.
    pub fn succeeding(code: i32) -> Self {
        Self {
            result: Ok(code),
            state: Rc::default(),
        }
    }

    /// Fails every exec with the given errno.
    pub fn failing(errno: i32) -> Self {
        Self {
            result: Err(errno),
            state: Rc::default(),
        }
    }

    pub fn observe_ui(&self, ui: &UiHandle) {
        self.state.borrow_mut().ui = Some(ui.clone());
    }

    pub fn ui_suppressed_during_exec(&self) -> Option<bool> {
        self.state.borrow().ui_suppressed
    }

    pub fn requests(&self) -> Vec<ExecRequest> {
        self.state.borrow().requests.clone()
    }

    pub fn last_request(&self) -> Option<ExecRequest> {
        self.state.borrow().requests.last().cloned()
    }
}

impl Exec for FakeExec {
    fn exec(&self, request: &ExecRequest) -> io::Result<i32> {
        let mut state = self.state.borrow_mut();
        state.requests.push(request.clone());
        state.ui_suppressed = state.ui.as_ref().map(UiHandle::is_suppressed);
        self.result.map_err(io::Error::from_raw_os_error)
    }
}

#[derive(Clone)]
pub enum Behavior {
    Complete,
    Exit(i32),
    Fail(ScriptFailure),
    Panic(&'static str),
}

#[derive(Default)]
struct RuntimeState {
    contexts: Vec<ScriptContext>,
    ui: Option<UiHandle>,
    signals: Option<FakeSignals>,
    ui_suppressed: Option<bool>,
    signals_reset: Option<bool>,
}

#[derive(Clone)]
pub struct FakeRuntime {
    behavior: Behavior,
    state: Rc<RefCell<RuntimeState>>,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new(Behavior::Complete)
    }
}

impl FakeRuntime {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            state: Rc::default(),
        }
    }

    pub fn observe(&self, ui: &UiHandle, signals: &FakeSignals) {
        let mut state = self.state.borrow_mut();
        state.ui = Some(ui.clone());
        state.signals = Some(signals.clone());
    }

    pub fn contexts(&self) -> Vec<ScriptContext> {
        self.state.borrow().contexts.clone()
    }

    pub fn ui_suppressed_during_run(&self) -> Option<bool> {
        self.state.borrow().ui_suppressed
    }

    pub fn signals_reset_before_run(&self) -> Option<bool> {
        self.state.borrow().signals_reset
    }
}

impl ScriptRuntime for FakeRuntime {
    fn names(&self) -> Vec<String> {
        vec!["fake".to_string()]
    }

    fn interpreter_path(&self) -> Option<PathBuf> {
        Some(PathBuf::from("/usr/local/bin/fake"))
    }

    fn run(&self, ctx: &ScriptContext) -> std::result::Result<(), ScriptError> {
        {
            let mut state = self.state.borrow_mut();
            state.contexts.push(ctx.clone());
            state.ui_suppressed = state.ui.as_ref().map(UiHandle::is_suppressed);
            state.signals_reset = state
                .signals
                .as_ref()
                .map(|signals| signals.was_reset(libc::SIGINT));
        }

        match &self.behavior {
            Behavior::Complete => Ok(()),
            Behavior::Exit(code) => Err(ScriptError::Exit(*code)),
            Behavior::Fail(failure) => Err(ScriptError::Failure(failure.clone())),
            Behavior::Panic(message) => panic!("{}", message),
        }
    }
}

#[derive(Clone)]
pub struct FakeSignals {
    signals: Vec<i32>,
    refused: BTreeSet<i32>,
    reset: Rc<RefCell<BTreeSet<i32>>>,
}

impl FakeSignals {
    pub fn new(signals: impl IntoIterator<Item = i32>) -> Self {
        Self {
            signals: signals.into_iter().collect(),
            refused: BTreeSet::new(),
            reset: Rc::default(),
        }
    }

    pub fn refusing(mut self, signal: i32) -> Self {
        self.refused.insert(signal);
        self
    }

    pub fn was_reset(&self, signal: i32) -> bool {
        self.reset.borrow().contains(&signal)
    }

    pub fn reset_count(&self) -> usize {
        self.reset.borrow().len()
    }
}

impl SignalTable for FakeSignals {
    fn signals(&self) -> Vec<i32> {
        self.signals.clone()
    }

    fn reset(&self, signal: i32) -> io::Result<()> {
        if self.refused.contains(&signal) {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        self.reset.borrow_mut().insert(signal);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingEnvironment {
    fail: bool,
    seen_disable_shared_path: Rc<RefCell<Vec<bool>>>,
}

impl RecordingEnvironment {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `disable_shared_path` as seen by each `configure` call.
    pub fn seen(&self) -> Vec<bool> {
        self.seen_disable_shared_path.borrow().clone()
    }
}

impl EnvironmentHook for RecordingEnvironment {
    fn configure(&self, settings: &Settings) -> Result<()> {
        self.seen_disable_shared_path
            .borrow_mut()
            .push(settings.disable_shared_path);
        if self.fail {
            return Err(Error::Settings("environment-bin is not a directory".to_string()));
        }
        Ok(())
    }
}
