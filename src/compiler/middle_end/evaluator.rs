//! Tree-walking evaluator
//!
//! Runs the pre-processor tree of a stylesheet: assigns variables, expands
//! control flow, mixins and imports, calls functions, and builds the CSS
//! output tree.

use super::builtins;
use super::environment::{normalize, Callable, Environment, Frame, Module, Namespace};
use super::operators;
use crate::compiler::backend::CssNode;
use crate::compiler::frontend::ast::{ArgumentList, BinaryOp, Expression, ParameterList};
use crate::compiler::frontend::{self, UseNamespace};
use crate::compiler::value::{ListSeparator, SassColor, SassFunction, SassList, SassMap, SassNumber, Value};
use crate::config::{CompilerConfig, CustomFunction, PreprocessorConfig};
use crate::error::{ExtractError, Result};
use crate::importer::{self, Importer, ImporterResult};
use crate::preprocessor::{self, AtRule, Comment, Declaration, Node, Rule};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

/// Outcome of running a block of statements
#[derive(Debug)]
pub enum Flow {
    Continue,
    Return(Value),
}

/// State shared by every stylesheet of one compilation
pub struct Context {
    functions: IndexMap<String, (ParameterList, CustomFunction)>,
    importers: Vec<Arc<dyn Importer>>,
    load_paths: Vec<PathBuf>,
    quiet: bool,
    modules: RefCell<HashMap<PathBuf, Rc<Module>>>,
    loaded_urls: RefCell<Vec<PathBuf>>,
    import_stack: RefCell<Vec<PathBuf>>,
}

impl Context {
    pub fn new(config: &CompilerConfig) -> Result<Self> {
        let mut functions = IndexMap::new();
        for (signature, function) in &config.functions {
            let (name, params) = frontend::parse_signature(signature, "<function>", 0)?;
            functions.insert(normalize(&name), (params, function.clone()));
        }

        let mut import_stack = Vec::new();
        if let Some(url) = &config.url {
            import_stack.push(fs::canonicalize(url).unwrap_or_else(|_| url.clone()));
        }

        Ok(Self {
            functions,
            importers: config.importers.clone(),
            load_paths: config.load_paths.clone(),
            quiet: config.quiet.unwrap_or(false),
            modules: RefCell::new(HashMap::new()),
            loaded_urls: RefCell::new(Vec::new()),
            import_stack: RefCell::new(import_stack),
        })
    }

    pub fn loaded_urls(&self) -> Vec<PathBuf> {
        self.loaded_urls.borrow().clone()
    }

    fn record(&self, canonical: &Path) {
        let mut urls = self.loaded_urls.borrow_mut();
        if !urls.iter().any(|u| u == canonical) {
            urls.push(canonical.to_path_buf());
        }
    }
}

/// Scopes a callable replaced, to be swapped back when it returns
enum Caller {
    Frames(Vec<Frame>),
    Env(Environment),
}

struct ContentBlock {
    nodes: Option<Vec<Node>>,
    caller: Caller,
    depth: usize,
    file: String,
}

pub struct Evaluator<'a> {
    ctx: &'a Context,
    env: Environment,
    file: String,
    /// Directory of the current stylesheet when it was loaded from disk
    base_dir: Option<PathBuf>,
    line: usize,
    out: Vec<Vec<CssNode>>,
    /// Position of the style rule receiving declarations
    style: Option<(usize, usize)>,
    selectors: Vec<Vec<String>>,
    property_prefix: Vec<String>,
    content: Vec<ContentBlock>,
    function_depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(ctx: &'a Context, file: String, base_dir: Option<PathBuf>, env: Environment) -> Self {
        Self {
            ctx,
            env,
            file,
            base_dir,
            line: 0,
            out: vec![Vec::new()],
            style: None,
            selectors: Vec::new(),
            property_prefix: Vec::new(),
            content: Vec::new(),
            function_depth: 0,
        }
    }

    /// The CSS produced and the final global scope
    pub fn finish(self) -> (Vec<CssNode>, Environment) {
        let css = self.out.into_iter().next().unwrap_or_default();
        (css, self.env)
    }

    pub fn run_nodes(&mut self, nodes: &[Node]) -> Result<Flow> {
        let mut index = 0;
        while index < nodes.len() {
            let node = &nodes[index];
            let line = node_line(node);
            self.line = line;

            let flow = match node {
                Node::AtRule(rule) if rule.name == "if" => {
                    let mut end = index + 1;
                    while matches!(nodes.get(end), Some(Node::AtRule(next)) if next.name == "else") {
                        end += 1;
                    }
                    let flow = self.if_chain(&nodes[index..end]);
                    index = end - 1;
                    flow
                }
                Node::AtRule(rule) if rule.name == "else" => Err(ExtractError::eval("@else must come after @if.")),
                Node::AtRule(rule) => self.at_rule(rule),
                Node::Rule(rule) => self.style_rule(rule),
                Node::Declaration(decl) => self.declaration(decl).map(|_| Flow::Continue),
                Node::Comment(comment) => {
                    self.comment(comment);
                    Ok(Flow::Continue)
                }
            }
            .map_err(|e| e.at(&self.file, line))?;

            if let Flow::Return(_) = flow {
                return Ok(flow);
            }
            index += 1;
        }
        Ok(Flow::Continue)
    }

    fn run_block(&mut self, nodes: &[Node], semi_global: bool) -> Result<Flow> {
        self.env.push_scope(semi_global);
        let flow = self.run_nodes(nodes);
        self.env.pop_scope();
        flow
    }

    fn current(&mut self) -> &mut Vec<CssNode> {
        let last = self.out.len() - 1;
        &mut self.out[last]
    }

    // Statements

    fn declaration(&mut self, decl: &Declaration) -> Result<()> {
        if let Some(name) = decl.prop.strip_prefix('$') {
            return self.assign(name, &decl.value);
        }
        if self.function_depth > 0 {
            return Err(ExtractError::eval("Declarations may not be used within functions."));
        }

        let mut prop = self.interpolate(&decl.prop, false)?;
        if !self.property_prefix.is_empty() {
            prop = format!("{}-{}", self.property_prefix.join("-"), prop);
        }
        let value = if prop.starts_with("--") {
            self.interpolate(&decl.value, false)?
        } else {
            self.property_value(&decl.value)?
        };
        if value.is_empty() {
            return Ok(());
        }
        self.emit_declaration(prop, value)
    }

    fn assign(&mut self, name: &str, text: &str) -> Result<()> {
        let (expression, flags) = frontend::parse_value_with_flags(text, &self.file, self.line)?;
        let global = flags.iter().any(|f| f == "global");

        if flags.iter().any(|f| f == "default") {
            let existing = if global {
                self.env.get_global(name)
            } else {
                self.env.get_variable(name)
            };
            if existing.map_or(false, |v| !v.is_null()) {
                return Ok(());
            }
        }

        let value = self.eval(&expression)?;
        self.env.set_variable(name, value, global);
        Ok(())
    }

    fn property_value(&mut self, text: &str) -> Result<String> {
        match frontend::parse_value_with_flags(text, &self.file, self.line) {
            Ok((expression, flags)) => {
                let mut css = self.eval_css_value(&expression)?.to_css(true)?;
                if flags.iter().any(|f| f == "important") {
                    css.push_str(" !important");
                }
                Ok(css)
            }
            Err(error) => {
                log::trace!("Passing through unparsed value '{}': {}", text, error);
                self.interpolate(text, true)
            }
        }
    }

    fn emit_declaration(&mut self, prop: String, value: String) -> Result<()> {
        if let Some((container, index)) = self.style {
            if let Some(CssNode::Style { declarations, .. }) = self.out[container].get_mut(index) {
                declarations.push((prop, value));
                return Ok(());
            }
        }
        if self.out.len() > 1 {
            self.current().push(CssNode::Declaration { prop, value });
            return Ok(());
        }
        Err(ExtractError::eval("Declarations may only be used within style rules."))
    }

    fn comment(&mut self, comment: &Comment) {
        if comment.silent || self.function_depth > 0 || self.style.is_some() {
            return;
        }
        self.current().push(CssNode::Comment(comment.text.clone()));
    }

    fn style_rule(&mut self, rule: &Rule) -> Result<Flow> {
        let text = self.interpolate(&rule.selector, false)?;

        // `font: { family: serif }`
        if let Some(prefix) = text.trim().strip_suffix(':') {
            if self.style.is_some() {
                self.property_prefix.push(prefix.trim().to_string());
                let flow = self.run_block(&rule.nodes, false);
                self.property_prefix.pop();
                return flow;
            }
        }
        if self.function_depth > 0 {
            return Err(ExtractError::eval("Style rules may not be used within functions."));
        }

        let selectors = self.resolve_selectors(&text);
        let container = self.out.len() - 1;
        let index = self.out[container].len();
        self.out[container].push(CssNode::Style {
            selectors: selectors.clone(),
            declarations: Vec::new(),
        });

        let saved = self.style.replace((container, index));
        self.selectors.push(selectors);
        let flow = self.run_block(&rule.nodes, false);
        self.selectors.pop();
        self.style = saved;
        flow
    }

    fn resolve_selectors(&self, text: &str) -> Vec<String> {
        let children: Vec<String> = split_top_level(text, ',')
            .iter()
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|s| !s.is_empty())
            .collect();

        match self.selectors.last() {
            None => children,
            Some(parents) => {
                let mut resolved = Vec::with_capacity(parents.len() * children.len());
                for parent in parents {
                    for child in &children {
                        if child.contains('&') {
                            resolved.push(child.replace('&', parent));
                        } else {
                            resolved.push(format!("{} {}", parent, child));
                        }
                    }
                }
                resolved
            }
        }
    }

    fn if_chain(&mut self, branches: &[Node]) -> Result<Flow> {
        for node in branches {
            let Node::AtRule(rule) = node else { continue };
            self.line = rule.line;
            let condition = if rule.name == "if" {
                Some(rule.params.trim())
            } else {
                rule.params.trim().strip_prefix("if").map(str::trim)
            };

            let taken = match condition {
                None => true,
                Some(text) => {
                    let expression = frontend::parse_expression(text, &self.file, rule.line)?;
                    self.eval(&expression)?.is_truthy()
                }
            };
            if taken {
                return self.run_block(rule.nodes.as_deref().unwrap_or(&[]), true);
            }
        }
        Ok(Flow::Continue)
    }

    fn at_rule(&mut self, rule: &AtRule) -> Result<Flow> {
        match rule.name.as_str() {
            "use" => self.use_rule(rule)?,
            "forward" => self.forward_rule(rule)?,
            "import" => self.import_rule(rule)?,
            "mixin" => self.define(rule, false)?,
            "function" => self.define(rule, true)?,
            "include" => return self.include(rule),
            "content" => return self.content_rule(),
            "return" => {
                if self.function_depth == 0 {
                    return Err(ExtractError::eval("@return may only be used within a function."));
                }
                let expression = frontend::parse_expression(&rule.params, &self.file, rule.line)?;
                return Ok(Flow::Return(self.eval(&expression)?));
            }
            "each" => return self.each_rule(rule),
            "for" => return self.for_rule(rule),
            "while" => return self.while_rule(rule),
            "debug" | "warn" | "error" => self.message_rule(rule)?,
            "at-root" => return self.at_root(rule),
            "extend" => log::debug!("{}:{}: @extend {} is not supported, ignoring", self.file, rule.line, rule.params),
            "charset" => {}
            _ => return self.css_at_rule(rule),
        }
        Ok(Flow::Continue)
    }

    fn define(&mut self, rule: &AtRule, is_function: bool) -> Result<()> {
        let (name, params) = frontend::parse_signature(&rule.params, &self.file, rule.line)?;
        let callable = Callable {
            name,
            params,
            body: rule.nodes.clone().unwrap_or_default(),
            depth: self.env.depth(),
            file: self.file.clone(),
            base_dir: self.base_dir.clone(),
        };
        if is_function {
            self.env.define_function(callable);
        } else {
            self.env.define_mixin(callable);
        }
        Ok(())
    }

    fn include(&mut self, rule: &AtRule) -> Result<Flow> {
        let include = frontend::parse_include(&rule.params, &self.file, rule.line)?;
        let (mixin, module) = match &include.namespace {
            Some(namespace) => match self.env.namespace(namespace) {
                Some(Namespace::Module(module)) => {
                    let (mixin, owner) = module
                        .mixin(&include.name)
                        .ok_or_else(|| ExtractError::eval(format!("Undefined mixin {}.{}.", namespace, include.name)))?;
                    (mixin, Some(owner))
                }
                _ => return Err(no_module(namespace)),
            },
            None => self
                .env
                .get_mixin(&include.name)
                .ok_or_else(|| ExtractError::eval(format!("Undefined mixin {}.", include.name)))?,
        };
        if self.function_depth > 0 {
            return Err(ExtractError::eval("Mixins may not be included within functions."));
        }

        let (positional, named) = self.eval_arguments(&include.args)?;
        let (caller, depth) = self.enter_callable(&mixin, module);
        self.content.push(ContentBlock {
            nodes: rule.nodes.clone(),
            caller,
            depth,
            file: self.file.clone(),
        });
        let saved_file = std::mem::replace(&mut self.file, mixin.file.clone());
        let saved_dir = std::mem::replace(&mut self.base_dir, mixin.base_dir.clone());

        self.env.push_scope(false);
        let result = self
            .bind_arguments(&mixin.params, positional, named, true)
            .and_then(|_| self.run_nodes(&mixin.body));
        self.env.pop_scope();

        self.file = saved_file;
        self.base_dir = saved_dir;
        if let Some(block) = self.content.pop() {
            self.swap_caller(block.caller, block.depth);
        }
        result.map(|_| Flow::Continue)
    }

    fn content_rule(&mut self) -> Result<Flow> {
        let Some(mut block) = self.content.pop() else {
            return Ok(Flow::Continue);
        };
        let Some(nodes) = block.nodes.take() else {
            self.content.push(block);
            return Ok(Flow::Continue);
        };

        let callee = self.swap_caller(block.caller, block.depth);
        let callee_file = std::mem::replace(&mut self.file, block.file.clone());
        let result = self.run_block(&nodes, false);
        self.file = callee_file;
        block.caller = self.swap_caller(callee, block.depth);
        block.nodes = Some(nodes);
        self.content.push(block);
        result.map(|_| Flow::Continue)
    }

    fn enter_callable(&mut self, callable: &Callable, module: Option<Rc<Module>>) -> (Caller, usize) {
        match module {
            Some(module) => {
                let env = std::mem::replace(&mut self.env, Environment::for_module(&module));
                (Caller::Env(env), 1)
            }
            None => (Caller::Frames(self.env.enter_closure(callable.depth)), callable.depth),
        }
    }

    /// Make `other` the active scopes, returning the ones it replaced
    fn swap_caller(&mut self, other: Caller, depth: usize) -> Caller {
        match other {
            Caller::Frames(hidden) => {
                let current = self.env.enter_closure(depth);
                self.env.exit_closure(hidden, depth);
                Caller::Frames(current)
            }
            Caller::Env(env) => Caller::Env(std::mem::replace(&mut self.env, env)),
        }
    }

    fn each_rule(&mut self, rule: &AtRule) -> Result<Flow> {
        let (variables, list) = frontend::parse_each(&rule.params, &self.file, rule.line)?;
        let items = self.eval(&list)?.as_list();
        let body = rule.nodes.as_deref().unwrap_or(&[]);

        for item in items {
            self.env.push_scope(true);
            if let [variable] = variables.as_slice() {
                self.env.declare_local(variable, item);
            } else {
                let parts = item.as_list();
                for (i, variable) in variables.iter().enumerate() {
                    self.env.declare_local(variable, parts.get(i).cloned().unwrap_or(Value::Null));
                }
            }
            let flow = self.run_nodes(body);
            self.env.pop_scope();
            if let Flow::Return(value) = flow? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Continue)
    }

    fn for_rule(&mut self, rule: &AtRule) -> Result<Flow> {
        let parsed = frontend::parse_for(&rule.params, &self.file, rule.line)?;
        let from = self.eval(&parsed.from)?.assert_number("from")?.clone();
        let to = self.eval(&parsed.to)?.assert_number("to")?.clone();
        let to_value = to
            .value_in_units_of(&from)
            .ok_or_else(|| ExtractError::eval(format!("{} and {} have incompatible units.", from, to)))?;

        let start = from.value.round() as i64;
        let target = to_value.round() as i64;
        let step = if start <= target { 1 } else { -1 };
        let end = if parsed.inclusive { target + step } else { target };
        let body = rule.nodes.as_deref().unwrap_or(&[]);

        let mut i = start;
        while i != end {
            self.env.push_scope(true);
            self.env.declare_local(
                &parsed.variable,
                Value::Number(SassNumber {
                    value: i as f64,
                    ..from.clone()
                }),
            );
            let flow = self.run_nodes(body);
            self.env.pop_scope();
            if let Flow::Return(value) = flow? {
                return Ok(Flow::Return(value));
            }
            i += step;
        }
        Ok(Flow::Continue)
    }

    fn while_rule(&mut self, rule: &AtRule) -> Result<Flow> {
        let condition = frontend::parse_expression(&rule.params, &self.file, rule.line)?;
        let body = rule.nodes.as_deref().unwrap_or(&[]);
        while self.eval(&condition)?.is_truthy() {
            if let Flow::Return(value) = self.run_block(body, true)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Continue)
    }

    fn message_rule(&mut self, rule: &AtRule) -> Result<()> {
        let expression = frontend::parse_expression(&rule.params, &self.file, rule.line)?;
        let message = match self.eval(&expression)? {
            Value::String(s) => s.text,
            other => other.to_string(),
        };
        match rule.name.as_str() {
            "error" => Err(ExtractError::compile(&self.file, rule.line, message)),
            "warn" if !self.ctx.quiet => {
                log::warn!("{}:{}: {}", self.file, rule.line, message);
                Ok(())
            }
            "debug" if !self.ctx.quiet => {
                log::debug!("{}:{} DEBUG: {}", self.file, rule.line, message);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn at_root(&mut self, rule: &AtRule) -> Result<Flow> {
        let Some(children) = &rule.nodes else {
            return Ok(Flow::Continue);
        };
        let saved_selectors = std::mem::take(&mut self.selectors);
        let saved_style = self.style.take();
        let nested = self.out.split_off(1);

        let flow = if rule.params.trim().is_empty() {
            self.run_block(children, false)
        } else {
            self.style_rule(&Rule {
                selector: rule.params.clone(),
                nodes: children.clone(),
                line: rule.line,
            })
        };

        self.out.extend(nested);
        self.style = saved_style;
        self.selectors = saved_selectors;
        flow
    }

    fn css_at_rule(&mut self, rule: &AtRule) -> Result<Flow> {
        if self.function_depth > 0 {
            return Err(ExtractError::eval(format!("@{} may not be used within functions.", rule.name)));
        }
        let substitute = matches!(rule.name.as_str(), "media" | "supports");
        let params = self.interpolate(&rule.params, substitute)?.trim().to_string();

        let Some(children) = &rule.nodes else {
            self.current().push(CssNode::AtRule {
                name: rule.name.clone(),
                params,
                children: None,
            });
            return Ok(Flow::Continue);
        };

        self.out.push(Vec::new());
        let saved = self.style.take();
        if saved.is_some() {
            if let Some(selectors) = self.selectors.last().cloned() {
                self.current().push(CssNode::Style {
                    selectors,
                    declarations: Vec::new(),
                });
                self.style = Some((self.out.len() - 1, 0));
            }
        }

        let flow = self.run_block(children, false);
        self.style = saved;
        let body = if self.out.len() > 1 { self.out.pop().unwrap_or_default() } else { Vec::new() };
        self.current().push(CssNode::AtRule {
            name: rule.name.clone(),
            params,
            children: Some(body),
        });
        flow
    }

    // Loading

    fn import_rule(&mut self, rule: &AtRule) -> Result<()> {
        for item in split_top_level(&rule.params, ',') {
            let item = item.trim();
            let url = unquote(item);
            if is_plain_css_import(item, url) {
                self.current().push(CssNode::Import(item.to_string()));
                continue;
            }
            self.import_file(url)?;
        }
        Ok(())
    }

    fn import_file(&mut self, url: &str) -> Result<()> {
        let (canonical, loaded) = self.load(url)?;
        let root = self.enter_file(&canonical, &loaded)?;

        let saved_file = std::mem::replace(&mut self.file, root.file.clone());
        let saved_dir = std::mem::replace(&mut self.base_dir, canonical.parent().map(Path::to_path_buf));
        let saved_line = self.line;
        let result = self.run_nodes(&root.nodes);
        self.file = saved_file;
        self.base_dir = saved_dir;
        self.line = saved_line;
        self.ctx.import_stack.borrow_mut().pop();

        result.map(|_| ())
    }

    fn use_rule(&mut self, rule: &AtRule) -> Result<()> {
        let parsed = frontend::parse_use(&rule.params, &self.file, rule.line)?;

        if let Some(module) = parsed.url.strip_prefix("sass:") {
            if !builtins::is_module(module) {
                return Err(ExtractError::eval(format!("Invalid internal module sass:{}.", module)));
            }
            match parsed.namespace {
                UseNamespace::Named(namespace) => {
                    self.env.add_namespace(namespace, Namespace::Builtin(module.to_string()))
                }
                // Built-in functions are global already
                UseNamespace::Global => {}
            }
            return Ok(());
        }

        let mut configuration = HashMap::new();
        for (name, expression) in &parsed.configuration {
            configuration.insert(name.clone(), self.eval(expression)?);
        }
        let module = self.load_module(&parsed.url, configuration)?;
        match parsed.namespace {
            UseNamespace::Named(namespace) => self.env.add_namespace(namespace, Namespace::Module(module)),
            UseNamespace::Global => self.env.add_global_module(module),
        }
        Ok(())
    }

    fn forward_rule(&mut self, rule: &AtRule) -> Result<()> {
        let url = rule.params.split_whitespace().next().map(unquote).unwrap_or_default();
        if url.is_empty() {
            return Err(ExtractError::eval("Expected a URL after @forward."));
        }
        if url.starts_with("sass:") {
            return Ok(());
        }
        let module = self.load_module(url, HashMap::new())?;
        self.env.add_forwarded(module);
        Ok(())
    }

    fn load_module(&mut self, url: &str, configuration: HashMap<String, Value>) -> Result<Rc<Module>> {
        let (canonical, loaded) = self.load(url)?;

        let cached = self.ctx.modules.borrow().get(&canonical).cloned();
        if let Some(module) = cached {
            if !configuration.is_empty() {
                return Err(ExtractError::eval(format!(
                    "{} was already loaded, so it can't be configured using \"with\".",
                    url
                )));
            }
            return Ok(module);
        }

        let root = self.enter_file(&canonical, &loaded)?;
        let mut evaluator = Evaluator::new(
            self.ctx,
            root.file.clone(),
            canonical.parent().map(Path::to_path_buf),
            Environment::configured(configuration),
        );
        let result = evaluator.run_nodes(&root.nodes);
        self.ctx.import_stack.borrow_mut().pop();
        result?;

        let (css, env) = evaluator.finish();
        self.out[0].extend(css);
        let module = Rc::new(env.into_module(url.to_string()));
        self.ctx.modules.borrow_mut().insert(canonical, module.clone());
        Ok(module)
    }

    /// Resolve `url` through the importers, then next to the current
    /// stylesheet, then in the load paths
    fn load(&self, url: &str) -> Result<(PathBuf, ImporterResult)> {
        for importer in &self.ctx.importers {
            if let Some(canonical) = importer.canonicalize(url, self.base_dir.as_deref())? {
                if let Some(result) = importer.load(&canonical)? {
                    self.ctx.record(&canonical);
                    return Ok((canonical, result));
                }
            }
        }

        let found = self
            .base_dir
            .as_deref()
            .and_then(|dir| importer::find_in_directory(dir, url))
            .or_else(|| {
                self.ctx
                    .load_paths
                    .iter()
                    .find_map(|dir| importer::find_in_directory(dir, url))
            });

        match found {
            Some(path) => {
                log::debug!("Loading '{}' from {}", url, path.display());
                let result = importer::load_file(&path)?;
                self.ctx.record(&path);
                Ok((path, result))
            }
            None => Err(ExtractError::import(url, "no importer or load path could resolve it")),
        }
    }

    fn enter_file(&self, canonical: &Path, loaded: &ImporterResult) -> Result<preprocessor::Root> {
        if self.ctx.import_stack.borrow().iter().any(|p| p == canonical) {
            return Err(ExtractError::eval(format!(
                "{} is already being loaded.",
                canonical.display()
            )));
        }
        let config = PreprocessorConfig {
            syntax: Some(loaded.syntax),
            from: Some(canonical.to_path_buf()),
        };
        let root = preprocessor::parse(&loaded.contents, &config)?;
        self.ctx.import_stack.borrow_mut().push(canonical.to_path_buf());
        Ok(root)
    }

    // Expressions

    pub fn eval(&mut self, expression: &Expression) -> Result<Value> {
        match expression {
            Expression::Number { value, unit } => Ok(Value::number_with_unit(*value, unit)),
            Expression::String { text, quoted: true } => {
                let text = if text.contains("#{") {
                    self.interpolate(text, false)?
                } else {
                    text.clone()
                };
                Ok(Value::quoted(text))
            }
            Expression::String { text, quoted: false } => Ok(self.identifier(text)),
            Expression::Color(hex) => SassColor::from_hex(hex)
                .map(Value::Color)
                .ok_or_else(|| ExtractError::eval(format!("Invalid color {}.", hex))),
            Expression::Boolean(b) => Ok(Value::Bool(*b)),
            Expression::Null => Ok(Value::Null),
            Expression::Variable { namespace, name } => self.variable(namespace.as_deref(), name),
            Expression::List {
                items,
                separator,
                bracketed,
            } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Ok(Value::List(SassList {
                    items: values,
                    separator: *separator,
                    bracketed: *bracketed,
                }))
            }
            Expression::Map(entries) => {
                let mut map = SassMap::new();
                for (key, value) in entries {
                    let key = self.eval(key)?;
                    if map.contains_key(&key) {
                        return Err(ExtractError::eval(format!("Duplicate key {}.", key)));
                    }
                    let value = self.eval(value)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
            Expression::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => {
                let left = self.eval(left)?;
                if !left.is_truthy() {
                    return Ok(left);
                }
                self.eval(right)
            }
            Expression::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    return Ok(left);
                }
                self.eval(right)
            }
            Expression::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                operators::binary(*op, left, right)
            }
            Expression::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                operators::unary(*op, operand)
            }
            Expression::Paren(inner) => self.eval(inner),
            Expression::FunctionCall { namespace, name, args } => {
                self.call_function(namespace.as_deref(), name, args)
            }
            Expression::Interpolation(inner) => {
                let value = self.eval(inner)?;
                Ok(Value::unquoted(value.to_css(false)?))
            }
            Expression::Concat(parts) => {
                let mut text = String::new();
                for part in parts {
                    text.push_str(&self.eval(part)?.to_css(false)?);
                }
                Ok(Value::unquoted(text))
            }
            Expression::Raw(text) => Ok(Value::unquoted(self.interpolate(text, true)?)),
        }
    }

    /// Evaluate a property value, keeping `/` between literal numbers as a
    /// separator (`font: 12px/1.5`)
    fn eval_css_value(&mut self, expression: &Expression) -> Result<Value> {
        match expression {
            Expression::Binary {
                op: BinaryOp::Divide,
                left,
                right,
            } if is_slash_literal(left) && is_slash_literal(right) => {
                let left = self.eval_css_value(left)?;
                let right = self.eval(right)?;
                Ok(Value::unquoted(format!("{}/{}", left, right)))
            }
            Expression::List {
                items,
                separator,
                bracketed,
            } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_css_value(item)?);
                }
                Ok(Value::List(SassList {
                    items: values,
                    separator: *separator,
                    bracketed: *bracketed,
                }))
            }
            other => self.eval(other),
        }
    }

    fn identifier(&self, text: &str) -> Value {
        if text == "&" {
            return match self.selectors.last() {
                Some(selectors) => Value::unquoted(selectors.join(", ")),
                None => Value::Null,
            };
        }
        match SassColor::from_name(text) {
            Some(color) => Value::Color(color),
            None => Value::unquoted(text),
        }
    }

    fn variable(&self, namespace: Option<&str>, name: &str) -> Result<Value> {
        let undefined = || ExtractError::eval(format!("Undefined variable: ${}.", name));
        match namespace {
            None => self.env.get_variable(name).ok_or_else(undefined),
            Some(namespace) => match self.env.namespace(namespace) {
                Some(Namespace::Builtin(module)) => builtins::module_variable(module, name).ok_or_else(undefined),
                Some(Namespace::Module(module)) => module.variable(name).ok_or_else(undefined),
                None => Err(no_module(namespace)),
            },
        }
    }

    /// Replace `#{...}` in raw text, and bare `$variables` when `substitute`
    /// is set (media queries, `calc()` and other pass-through text)
    fn interpolate(&mut self, text: &str, substitute: bool) -> Result<String> {
        if !text.contains("#{") && !(substitute && text.contains('$')) {
            return Ok(text.to_string());
        }

        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut quote: Option<char> = None;
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            if ch == '#' && chars.get(i + 1) == Some(&'{') {
                let end = closing_brace(&chars, i + 2).ok_or_else(|| {
                    ExtractError::parse(&self.file, self.line, "Expected '}' to close interpolation")
                })?;
                let inner: String = chars[i + 2..end].iter().collect();
                let expression = frontend::parse_expression(&inner, &self.file, self.line)?;
                out.push_str(&self.eval(&expression)?.to_css(false)?);
                i = end + 1;
                continue;
            }

            match quote {
                Some(q) if ch == q => quote = None,
                None if ch == '"' || ch == '\'' => quote = Some(ch),
                None if substitute && ch == '$' => {
                    let name: String = chars[i + 1..]
                        .iter()
                        .take_while(|c| c.is_alphanumeric() || **c == '-' || **c == '_')
                        .collect();
                    if let Some(value) = self.env.get_variable(&name).filter(|_| !name.is_empty()) {
                        out.push_str(&value.to_css(true)?);
                        i += 1 + name.chars().count();
                        continue;
                    }
                }
                _ => {}
            }
            out.push(ch);
            i += 1;
        }

        Ok(out)
    }

    // Calls

    fn eval_arguments(&mut self, args: &ArgumentList) -> Result<(Vec<Value>, Vec<(String, Value)>)> {
        let mut positional = Vec::with_capacity(args.positional.len());
        for arg in &args.positional {
            positional.push(self.eval(arg)?);
        }
        let mut named = Vec::with_capacity(args.named.len());
        for (name, arg) in &args.named {
            named.push((name.clone(), self.eval(arg)?));
        }

        if let Some(rest) = &args.rest {
            match self.eval(rest)? {
                Value::Map(map) => {
                    for (key, value) in map.iter() {
                        let name = match key {
                            Value::String(s) => s.text.clone(),
                            other => other.to_string(),
                        };
                        named.push((name, value.clone()));
                    }
                }
                Value::List(list) => positional.extend(list.items),
                other => positional.push(other),
            }
        }
        Ok((positional, named))
    }

    /// Bind call arguments to declared parameters. With `declare` each
    /// parameter also becomes a local of the current scope, so defaults can
    /// refer to earlier parameters.
    fn bind_arguments(
        &mut self,
        params: &ParameterList,
        mut positional: Vec<Value>,
        named: Vec<(String, Value)>,
        declare: bool,
    ) -> Result<Vec<Value>> {
        let fixed = params.params.len();
        if params.rest.is_none() && positional.len() > fixed {
            return Err(ExtractError::eval(format!(
                "Only {} argument(s) allowed, but {} were passed.",
                fixed,
                positional.len()
            )));
        }

        let extra = if positional.len() > fixed {
            positional.split_off(fixed)
        } else {
            Vec::new()
        };
        let mut named: Vec<(String, Value)> = named.into_iter().map(|(n, v)| (normalize(&n), v)).collect();
        let mut positional = positional.into_iter();
        let mut values = Vec::with_capacity(fixed + 1);

        for param in &params.params {
            let key = normalize(&param.name);
            let value = if let Some(value) = positional.next() {
                value
            } else if let Some(index) = named.iter().position(|(n, _)| *n == key) {
                named.remove(index).1
            } else if let Some(default) = &param.default {
                self.eval(default)?
            } else {
                return Err(ExtractError::eval(format!("Missing argument ${}.", param.name)));
            };
            if declare {
                self.env.declare_local(&param.name, value.clone());
            }
            values.push(value);
        }

        if let Some(rest) = &params.rest {
            let list = Value::List(SassList::new(extra, ListSeparator::Comma));
            if declare {
                self.env.declare_local(rest, list.clone());
            }
            values.push(list);
        } else if let Some((name, _)) = named.first() {
            return Err(ExtractError::eval(format!("No argument named ${}.", name)));
        }

        Ok(values)
    }

    fn call_function(&mut self, namespace: Option<&str>, name: &str, args: &ArgumentList) -> Result<Value> {
        if namespace.is_none() && name == "if" {
            return self.call_if(args);
        }
        let (positional, named) = self.eval_arguments(args)?;
        self.invoke(namespace, name, positional, named)
    }

    /// `if()` only evaluates the branch it returns
    fn call_if(&mut self, args: &ArgumentList) -> Result<Value> {
        let condition = pick(&args.positional, &args.named, 0, "condition")
            .ok_or_else(|| ExtractError::eval("Missing argument $condition."))?;
        let branch = if self.eval(condition)?.is_truthy() {
            pick(&args.positional, &args.named, 1, "if-true")
        } else {
            pick(&args.positional, &args.named, 2, "if-false")
        };
        match branch {
            Some(expression) => self.eval(expression),
            None => Ok(Value::Null),
        }
    }

    fn invoke(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        positional: Vec<Value>,
        named: Vec<(String, Value)>,
    ) -> Result<Value> {
        if let Some(namespace) = namespace {
            return match self.env.namespace(namespace).cloned() {
                Some(Namespace::Builtin(module)) => {
                    if module == "meta" {
                        if let Some(value) = self.meta_function(name, &positional, &named)? {
                            return Ok(value);
                        }
                    }
                    let builtin = builtins::module_function(&module, name).ok_or_else(|| {
                        ExtractError::eval(format!("Undefined function {}.{}.", namespace, name))
                    })?;
                    builtin
                        .call(positional, named)
                        .map_err(|e| ExtractError::function(name, e.message()))
                }
                Some(Namespace::Module(module)) => {
                    let (function, owner) = module.function(name).ok_or_else(|| {
                        ExtractError::eval(format!("Undefined function {}.{}.", namespace, name))
                    })?;
                    self.invoke_function(function, Some(owner), positional, named)
                }
                None => Err(no_module(namespace)),
            };
        }

        if let Some(value) = self.meta_function(name, &positional, &named)? {
            return Ok(value);
        }
        if let Some((function, module)) = self.env.get_function(name) {
            return self.invoke_function(function, module, positional, named);
        }
        if let Some((params, function)) = self.ctx.functions.get(&normalize(name)).cloned() {
            let args = self
                .bind_arguments(&params, positional, named, false)
                .map_err(|e| ExtractError::function(name, e.message()))?;
            log::trace!("Calling custom function {}() with {} argument(s)", name, args.len());
            return (*function)(&args).map_err(|e| ExtractError::function(name, e.message()));
        }
        if let Some(builtin) = builtins::global(name) {
            return builtin
                .call(positional, named)
                .map_err(|e| ExtractError::function(name, e.message()));
        }
        builtins::plain_css_call(name, &positional)
    }

    fn invoke_function(
        &mut self,
        function: Rc<Callable>,
        module: Option<Rc<Module>>,
        positional: Vec<Value>,
        named: Vec<(String, Value)>,
    ) -> Result<Value> {
        let (caller, depth) = self.enter_callable(&function, module);
        let saved_file = std::mem::replace(&mut self.file, function.file.clone());
        let saved_line = self.line;
        self.env.push_scope(false);
        self.function_depth += 1;

        let result = self
            .bind_arguments(&function.params, positional, named, true)
            .and_then(|_| self.run_nodes(&function.body));

        self.function_depth -= 1;
        self.env.pop_scope();
        self.swap_caller(caller, depth);
        self.file = saved_file;
        self.line = saved_line;

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Continue => Err(ExtractError::eval(format!(
                "Function {} finished without @return.",
                function.name
            ))),
        }
    }

    /// Functions that inspect the evaluator's own state
    fn meta_function(
        &mut self,
        name: &str,
        positional: &[Value],
        named: &[(String, Value)],
    ) -> Result<Option<Value>> {
        let text = |index: usize, key: &str| -> Result<String> {
            match pick(positional, named, index, key) {
                Some(Value::String(s)) => Ok(s.text.clone()),
                Some(other) => Err(ExtractError::eval(format!("${}: {} is not a string.", key, other))),
                None => Err(ExtractError::eval(format!("Missing argument ${}.", key))),
            }
        };

        let value = match name {
            "variable-exists" => Value::Bool(self.env.get_variable(&text(0, "name")?).is_some()),
            "global-variable-exists" => Value::Bool(self.env.get_global(&text(0, "name")?).is_some()),
            "function-exists" => {
                let function = text(0, "name")?;
                Value::Bool(
                    self.env.get_function(&function).is_some()
                        || self.ctx.functions.contains_key(&normalize(&function))
                        || builtins::global(&function).is_some(),
                )
            }
            "mixin-exists" => Value::Bool(self.env.get_mixin(&text(0, "name")?).is_some()),
            "get-function" => Value::Function(SassFunction {
                name: text(0, "name")?,
            }),
            "call" => {
                let function = match pick(positional, named, 0, "function") {
                    Some(Value::Function(f)) => f.name.clone(),
                    Some(Value::String(s)) => s.text.clone(),
                    Some(other) => {
                        return Err(ExtractError::eval(format!("$function: {} is not a function reference.", other)))
                    }
                    None => return Err(ExtractError::eval("Missing argument $function.")),
                };
                let rest = positional.get(1..).map(<[Value]>::to_vec).unwrap_or_default();
                let named = named
                    .iter()
                    .filter(|(n, _)| normalize(n) != "function")
                    .cloned()
                    .collect();
                self.invoke(None, &function, rest, named)?
            }
            _ => return Ok(None),
        };
        Ok(Some(value))
    }
}

fn node_line(node: &Node) -> usize {
    match node {
        Node::Declaration(decl) => decl.line,
        Node::Rule(rule) => rule.line,
        Node::AtRule(rule) => rule.line,
        Node::Comment(comment) => comment.line,
    }
}

fn no_module(namespace: &str) -> ExtractError {
    ExtractError::eval(format!("There is no module with the namespace \"{}\".", namespace))
}

/// Positional argument `index`, or the named argument `key`
fn pick<'v, T>(positional: &'v [T], named: &'v [(String, T)], index: usize, key: &str) -> Option<&'v T> {
    positional
        .get(index)
        .or_else(|| named.iter().find(|(n, _)| normalize(n) == key).map(|(_, v)| v))
}

fn is_slash_literal(expression: &Expression) -> bool {
    match expression {
        Expression::Number { .. } => true,
        Expression::Binary {
            op: BinaryOp::Divide,
            left,
            right,
        } => is_slash_literal(left) && is_slash_literal(right),
        _ => false,
    }
}

fn closing_brace(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 1;
    let mut quote: Option<char> = None;
    for (offset, &ch) in chars.get(start..)?.iter().enumerate() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(start + offset);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// Split on `separator` outside of strings and parentheses
fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in text.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                c if c == separator && depth == 0 => {
                    parts.push(std::mem::take(&mut current));
                    continue;
                }
                _ => {}
            },
        }
        current.push(ch);
    }
    parts.push(current);
    parts
}

fn unquote(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') && bytes[bytes.len() - 1] == bytes[0] {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

fn is_plain_css_import(raw: &str, url: &str) -> bool {
    raw.starts_with("url(")
        || url.ends_with(".css")
        || url.starts_with("http://")
        || url.starts_with("https://")
        || url.starts_with("//")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn run_with(source: &str, config: &CompilerConfig) -> Result<(Vec<CssNode>, Environment)> {
        let root = preprocessor::parse(source, &PreprocessorConfig::default())?;
        let ctx = Context::new(config)?;
        let mut evaluator = Evaluator::new(&ctx, root.file.clone(), None, Environment::new());
        evaluator.run_nodes(&root.nodes)?;
        Ok(evaluator.finish())
    }

    fn globals(source: &str) -> Environment {
        run_with(source, &CompilerConfig::default()).unwrap().1
    }

    fn css(source: &str) -> String {
        let (nodes, _) = run_with(source, &CompilerConfig::default()).unwrap();
        crate::compiler::backend::codegen::CodeGenerator::new(Default::default()).generate(&nodes)
    }

    #[test]
    fn test_variables_and_arithmetic() {
        let env = globals("$a: 10px;\n$b: $a * 2;\n$c: $b - 5px;");
        assert_eq!(env.get_global("b"), Some(Value::number_with_unit(20.0, "px")));
        assert_eq!(env.get_global("c"), Some(Value::number_with_unit(15.0, "px")));
    }

    #[test]
    fn test_default_flag() {
        let env = globals("$a: 1;\n$a: 2 !default;\n$b: null;\n$b: 3 !default;");
        assert_eq!(env.get_global("a"), Some(Value::number(1.0)));
        assert_eq!(env.get_global("b"), Some(Value::number(3.0)));
    }

    #[test]
    fn test_functions_and_conditionals() {
        let env = globals(
            "@function double($n) { @return $n * 2; }\n\
             $x: double(4px);\n\
             $mode: dark;\n\
             $bg: null;\n\
             @if $mode == light { $bg: white; } @else if $mode == dark { $bg: black; } @else { $bg: gray; }",
        );
        assert_eq!(env.get_global("x"), Some(Value::number_with_unit(8.0, "px")));
        assert_eq!(env.get_global("bg"), Some(Value::Color(SassColor::rgb(0, 0, 0))));
    }

    #[test]
    fn test_loops() {
        let env = globals(
            "$sizes: (sm: 4px, lg: 8px);\n\
             $total: 0px;\n\
             @each $name, $size in $sizes { $total: $total + $size; }\n\
             $sum: 0;\n\
             @for $i from 1 through 3 { $sum: $sum + $i; }\n\
             $n: 0;\n\
             @while $n < 5 { $n: $n + 2; }",
        );
        assert_eq!(env.get_global("total"), Some(Value::number_with_unit(12.0, "px")));
        assert_eq!(env.get_global("sum"), Some(Value::number(6.0)));
        assert_eq!(env.get_global("n"), Some(Value::number(6.0)));
        assert!(env.get_global("size").is_none());
    }

    #[test]
    fn test_mixin_with_content() {
        let output = css(
            "@mixin pad($size: 4px) { padding: $size; @content; }\n\
             .a { @include pad(8px) { color: red; } }",
        );
        assert_eq!(output, ".a {\n  padding: 8px;\n  color: red;\n}\n");
    }

    #[test]
    fn test_nested_selectors() {
        let output = css(".a { color: blue; &:hover { color: red; } .b { margin: 0; } }");
        assert_eq!(
            output,
            ".a {\n  color: blue;\n}\n\n.a:hover {\n  color: red;\n}\n\n.a .b {\n  margin: 0;\n}\n"
        );
    }

    #[test]
    fn test_slash_separated_property() {
        let output = css(".a { font: 12px/1.5 serif; width: (10px/2); }");
        assert_eq!(output, ".a {\n  font: 12px/1.5 serif;\n  width: 5px;\n}\n");
    }

    #[test]
    fn test_custom_function_arguments() {
        let config = CompilerConfig::default().with_function("scale($value, $factor: 2)", |args| {
            let value = args[0].assert_number("value")?;
            let factor = args[1].assert_number("factor")?;
            Ok(Value::Number(value.times(factor)))
        });
        let (_, env) = run_with("$a: scale(3px);\n$b: scale(3px, $factor: 3);", &config).unwrap();
        assert_eq!(env.get_global("a"), Some(Value::number_with_unit(6.0, "px")));
        assert_eq!(env.get_global("b"), Some(Value::number_with_unit(9.0, "px")));
    }

    #[test]
    fn test_custom_function_errors_are_wrapped() {
        let config = CompilerConfig::default()
            .with_function("fail()", |_| Err(ExtractError::eval("nope")));
        let err = run_with("$a: fail();", &config).unwrap_err();
        assert!(matches!(err, ExtractError::Function { ref name, ref message } if name == "fail" && message == "nope"));
    }

    #[test]
    fn test_undefined_variable_has_location() {
        let err = run_with("$a: 1;\n$b: $missing;", &CompilerConfig::default()).unwrap_err();
        assert!(matches!(err, ExtractError::Compile { line: 2, .. }));
    }

    #[test]
    fn test_import_from_load_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("_colors.scss"),
            "$brand: #ff0000;\n@mixin brand { color: $brand; }",
        )
        .unwrap();

        let config = CompilerConfig::default().with_load_path(dir.path());
        let root = preprocessor::parse("@import 'colors';\n.a { @include brand; }", &PreprocessorConfig::default())
            .unwrap();
        let ctx = Context::new(&config).unwrap();
        let mut evaluator = Evaluator::new(&ctx, root.file.clone(), None, Environment::new());
        evaluator.run_nodes(&root.nodes).unwrap();
        let (nodes, env) = evaluator.finish();

        assert!(env.get_global("brand").is_some());
        assert_eq!(ctx.loaded_urls().len(), 1);
        let output = crate::compiler::backend::codegen::CodeGenerator::new(Default::default()).generate(&nodes);
        assert_eq!(output, ".a {\n  color: #ff0000;\n}\n");
    }

    #[test]
    fn test_use_with_configuration() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("_theme.scss"),
            "$radius: 4px !default;\n@function twice($n) { @return $n * 2; }",
        )
        .unwrap();

        let config = CompilerConfig::default().with_load_path(dir.path());
        let (_, env) = run_with(
            "@use 'theme' with ($radius: 6px);\n$r: theme.twice(theme.$radius);",
            &config,
        )
        .unwrap();
        assert_eq!(env.get_global("r"), Some(Value::number_with_unit(12.0, "px")));
    }

    #[test]
    fn test_missing_import() {
        let err = run_with("@import 'nowhere';", &CompilerConfig::default()).unwrap_err();
        assert!(matches!(err, ExtractError::Import { ref url, .. } if url == "nowhere"));
    }

    #[test]
    fn test_builtin_modules_and_meta() {
        let env = globals(
            "@use 'sass:math';\n\
             $pi: math.$pi;\n\
             $r: math.div(10px, 4);\n\
             $exists: variable-exists(pi);\n\
             $called: call(get-function(\"unitless\"), 1px);\n\
             $lazy: if(true, 1, $undefined);",
        );
        assert_eq!(env.get_global("r"), Some(Value::number_with_unit(2.5, "px")));
        assert_eq!(env.get_global("exists"), Some(Value::Bool(true)));
        assert_eq!(env.get_global("called"), Some(Value::Bool(false)));
        assert_eq!(env.get_global("lazy"), Some(Value::number(1.0)));
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(split_top_level("a, :is(b, c)", ','), vec!["a", " :is(b, c)"]);
        assert_eq!(unquote("'x'"), "x");
        assert!(is_plain_css_import("url(foo.css)", "url(foo.css)"));
    }
}
