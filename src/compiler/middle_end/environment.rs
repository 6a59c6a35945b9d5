//! Lexical scopes for variables, functions and mixins
//!
//! Frame 0 is the global scope of the stylesheet being evaluated. Style
//! rules, mixins and functions push ordinary frames; control-flow rules
//! push semi-global frames so that assignments at the top level of an
//! `@if`/`@each` body still reach existing globals.

use crate::compiler::frontend::ast::ParameterList;
use crate::compiler::value::Value;
use crate::preprocessor::Node;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

/// A user-defined `@function` or `@mixin`
#[derive(Debug)]
pub struct Callable {
    pub name: String,
    pub params: ParameterList,
    pub body: Vec<Node>,
    /// Number of frames visible where the callable was defined
    pub depth: usize,
    pub file: String,
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Clone)]
pub struct Frame {
    variables: HashMap<String, Value>,
    functions: HashMap<String, Rc<Callable>>,
    mixins: HashMap<String, Rc<Callable>>,
    semi_global: bool,
}

/// Members of an evaluated `@use`/`@forward` target
#[derive(Debug, Default)]
pub struct Module {
    pub url: String,
    pub variables: HashMap<String, Value>,
    pub functions: HashMap<String, Rc<Callable>>,
    pub mixins: HashMap<String, Rc<Callable>>,
    /// Modules whose members this one re-exports
    pub forwarded: Vec<Rc<Module>>,
    namespaces: HashMap<String, Namespace>,
    global_modules: Vec<Rc<Module>>,
}

#[derive(Debug, Clone)]
pub enum Namespace {
    Builtin(String),
    Module(Rc<Module>),
}

impl Module {
    pub fn variable(&self, name: &str) -> Option<Value> {
        let name = normalize(name);
        self.variables
            .get(&name)
            .cloned()
            .or_else(|| self.forwarded.iter().find_map(|m| m.variable(&name)))
    }

    /// The function and the module it must run in
    pub fn function(self: &Rc<Self>, name: &str) -> Option<(Rc<Callable>, Rc<Module>)> {
        let name = normalize(name);
        match self.functions.get(&name) {
            Some(f) => Some((f.clone(), self.clone())),
            None => self.forwarded.iter().find_map(|m| m.function(&name)),
        }
    }

    pub fn mixin(self: &Rc<Self>, name: &str) -> Option<(Rc<Callable>, Rc<Module>)> {
        let name = normalize(name);
        match self.mixins.get(&name) {
            Some(m) => Some((m.clone(), self.clone())),
            None => self.forwarded.iter().find_map(|m| m.mixin(&name)),
        }
    }
}

/// Sass treats `-` and `_` in names as the same character
pub fn normalize(name: &str) -> String {
    name.replace('_', "-")
}

#[derive(Debug, Clone)]
pub struct Environment {
    frames: Vec<Frame>,
    namespaces: HashMap<String, Namespace>,
    global_modules: Vec<Rc<Module>>,
    forwarded: Vec<Rc<Module>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
            namespaces: HashMap::new(),
            global_modules: Vec::new(),
            forwarded: Vec::new(),
        }
    }

    /// A fresh environment seeded with `with (...)` configuration
    pub fn configured(configuration: HashMap<String, Value>) -> Self {
        let mut env = Self::new();
        for (name, value) in configuration {
            env.frames[0].variables.insert(normalize(&name), value);
        }
        env
    }

    /// The global scope of a module, for running its callables
    pub fn for_module(module: &Module) -> Self {
        Self {
            frames: vec![Frame {
                variables: module.variables.clone(),
                functions: module.functions.clone(),
                mixins: module.mixins.clone(),
                semi_global: false,
            }],
            namespaces: module.namespaces.clone(),
            global_modules: module.global_modules.clone(),
            forwarded: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn at_root(&self) -> bool {
        self.frames.len() == 1
    }

    pub fn push_scope(&mut self, semi_global: bool) {
        self.frames.push(Frame {
            semi_global,
            ..Frame::default()
        });
    }

    pub fn pop_scope(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Hide the frames above `depth` while a callable defined there runs
    pub fn enter_closure(&mut self, depth: usize) -> Vec<Frame> {
        let keep = depth.clamp(1, self.frames.len());
        self.frames.split_off(keep)
    }

    pub fn exit_closure(&mut self, hidden: Vec<Frame>, depth: usize) {
        self.frames.truncate(depth.max(1));
        self.frames.extend(hidden);
    }

    fn in_semi_global_scope(&self) -> bool {
        self.frames[1..].iter().all(|f| f.semi_global)
    }

    pub fn get_variable(&self, name: &str) -> Option<Value> {
        let name = normalize(name);
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.variables.get(&name).cloned())
            .or_else(|| self.global_modules.iter().find_map(|m| m.variable(&name)))
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.frames[0].variables.get(&normalize(name)).cloned()
    }

    /// Assign following Sass scoping: `!global` writes the global frame,
    /// otherwise the innermost frame that already defines the name, creating
    /// a local when the name only exists globally and we are in a real
    /// (non control-flow) nested scope.
    pub fn set_variable(&mut self, name: &str, value: Value, global: bool) {
        let name = normalize(name);
        if global || self.at_root() {
            self.frames[0].variables.insert(name, value);
            return;
        }

        let last = self.frames.len() - 1;
        let index = match self.frames.iter().rposition(|f| f.variables.contains_key(&name)) {
            Some(0) if !self.in_semi_global_scope() => last,
            Some(index) => index,
            None => last,
        };
        self.frames[index].variables.insert(name, value);
    }

    /// Assign to the current frame only (parameters, loop variables)
    pub fn declare_local(&mut self, name: &str, value: Value) {
        let last = self.frames.len() - 1;
        self.frames[last].variables.insert(normalize(name), value);
    }

    pub fn define_function(&mut self, callable: Callable) {
        let last = self.frames.len() - 1;
        self.frames[last]
            .functions
            .insert(normalize(&callable.name), Rc::new(callable));
    }

    pub fn define_mixin(&mut self, callable: Callable) {
        let last = self.frames.len() - 1;
        self.frames[last]
            .mixins
            .insert(normalize(&callable.name), Rc::new(callable));
    }

    /// A function in scope, plus the module it must run in when it came
    /// from a `@use ... as *`
    pub fn get_function(&self, name: &str) -> Option<(Rc<Callable>, Option<Rc<Module>>)> {
        let name = normalize(name);
        if let Some(f) = self.frames.iter().rev().find_map(|f| f.functions.get(&name)) {
            return Some((f.clone(), None));
        }
        self.global_modules
            .iter()
            .find_map(|m| m.function(&name))
            .map(|(f, m)| (f, Some(m)))
    }

    pub fn get_mixin(&self, name: &str) -> Option<(Rc<Callable>, Option<Rc<Module>>)> {
        let name = normalize(name);
        if let Some(m) = self.frames.iter().rev().find_map(|f| f.mixins.get(&name)) {
            return Some((m.clone(), None));
        }
        self.global_modules
            .iter()
            .find_map(|m| m.mixin(&name))
            .map(|(f, m)| (f, Some(m)))
    }

    pub fn add_namespace(&mut self, name: String, namespace: Namespace) {
        self.namespaces.insert(name, namespace);
    }

    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.get(name)
    }

    pub fn add_global_module(&mut self, module: Rc<Module>) {
        self.global_modules.push(module);
    }

    pub fn add_forwarded(&mut self, module: Rc<Module>) {
        self.forwarded.push(module);
    }

    /// Snapshot the global scope as a module
    pub fn into_module(self, url: String) -> Module {
        let global = self.frames.into_iter().next().unwrap_or_default();
        Module {
            url,
            variables: global.variables,
            functions: global.functions,
            mixins: global.mixins,
            forwarded: self.forwarded,
            namespaces: self.namespaces,
            global_modules: self.global_modules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callable(name: &str, depth: usize) -> Callable {
        Callable {
            name: name.to_string(),
            params: ParameterList::default(),
            body: Vec::new(),
            depth,
            file: "test.scss".to_string(),
            base_dir: None,
        }
    }

    #[test]
    fn test_global_assignment_and_lookup() {
        let mut env = Environment::new();
        env.set_variable("primary_color", Value::number(1.0), false);
        assert_eq!(env.get_variable("primary-color"), Some(Value::number(1.0)));
        assert!(env.get_variable("missing").is_none());
    }

    #[test]
    fn test_nested_scope_shadows_global() {
        let mut env = Environment::new();
        env.set_variable("a", Value::number(1.0), false);

        env.push_scope(false);
        env.set_variable("a", Value::number(2.0), false);
        assert_eq!(env.get_variable("a"), Some(Value::number(2.0)));
        env.pop_scope();

        assert_eq!(env.get_variable("a"), Some(Value::number(1.0)));
    }

    #[test]
    fn test_semi_global_scope_updates_global() {
        let mut env = Environment::new();
        env.set_variable("a", Value::number(1.0), false);

        env.push_scope(true);
        env.set_variable("a", Value::number(2.0), false);
        env.set_variable("b", Value::number(3.0), false);
        env.pop_scope();

        assert_eq!(env.get_variable("a"), Some(Value::number(2.0)));
        assert!(env.get_variable("b").is_none());
    }

    #[test]
    fn test_global_flag() {
        let mut env = Environment::new();
        env.push_scope(false);
        env.set_variable("a", Value::number(5.0), true);
        env.pop_scope();
        assert_eq!(env.get_global("a"), Some(Value::number(5.0)));
    }

    #[test]
    fn test_closure_hides_caller_frames() {
        let mut env = Environment::new();
        env.define_function(callable("f", 1));
        env.push_scope(false);
        env.declare_local("caller", Value::Bool(true));

        let hidden = env.enter_closure(1);
        assert!(env.get_variable("caller").is_none());
        assert!(env.get_function("f").is_some());
        env.exit_closure(hidden, 1);

        assert_eq!(env.get_variable("caller"), Some(Value::Bool(true)));
        assert_eq!(env.depth(), 2);
    }

    #[test]
    fn test_module_snapshot() {
        let mut env = Environment::new();
        env.set_variable("radius", Value::number_with_unit(4.0, "px"), false);
        env.define_mixin(callable("rounded", 1));

        let module = Rc::new(env.into_module("theme".to_string()));
        assert_eq!(module.variable("radius"), Some(Value::number_with_unit(4.0, "px")));
        assert!(module.mixin("rounded").is_some());

        let mut user = Environment::new();
        user.add_global_module(module);
        assert!(user.get_variable("radius").is_some());
        assert!(matches!(user.get_mixin("rounded"), Some((_, Some(_)))));
    }
}
