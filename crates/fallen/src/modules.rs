//! Process-wide module registry.
//!
//! Modules are keyed by canonical path and move through two states:
//! `Loading` while their body executes and `Loaded` afterwards. A re-import
//! in either state never re-executes the body; importing a module that is
//! still loading observes its partially populated exports, which is what
//! makes import cycles terminate.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};

use crate::bytecode::vm::Env;
use crate::value::Value;

pub type PublicSet = Rc<RefCell<AHashSet<Rc<str>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Loading,
    Loaded,
}

#[derive(Debug)]
pub struct Module {
    pub state: ModuleState,
    pub env: Env,
    pub public: PublicSet,
}

#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: AHashMap<PathBuf, Module>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<&Module> {
        self.modules.get(path)
    }

    pub fn insert_loading(&mut self, path: PathBuf, env: Env, public: PublicSet) {
        self.modules.insert(
            path,
            Module {
                state: ModuleState::Loading,
                env,
                public,
            },
        );
    }

    pub fn mark_loaded(&mut self, path: &Path) {
        if let Some(module) = self.modules.get_mut(path) {
            module.state = ModuleState::Loaded;
        }
    }

    pub fn remove(&mut self, path: &Path) {
        self.modules.remove(path);
    }

    /// The module's visible names right now: the names it has `export`ed, or
    /// every non-underscore name in its environment if it has exported
    /// nothing.
    pub fn exports_of(&self, path: &Path) -> Vec<(Rc<str>, Value)> {
        let Some(module) = self.modules.get(path) else {
            return Vec::new();
        };
        let public = module.public.borrow();
        let env = module.env.borrow();
        if public.is_empty() {
            env.iter()
                .filter(|(name, _)| !name.starts_with('_'))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect()
        } else {
            public
                .iter()
                .filter_map(|name| env.get(name).map(|value| (name.clone(), value.clone())))
                .collect()
        }
    }
}
