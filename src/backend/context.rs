//! Per-compile mutable state threaded through every lowering call.

/// Where a `break` goes in the innermost enclosing loop or switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakTarget {
    /// A label in the C function currently being emitted; `break` is a
    /// plain `goto`.
    Label(String),
    /// The loop or switch lives in an enclosing emitted function (the
    /// current code is a try/catch/finally region); `break` returns
    /// through the region's result protocol and the enclosing function
    /// re-dispatches it.
    Enclosing,
}

/// Compilation context. Created fresh for each top-level compile and
/// discarded after emission; never shared across compiles.
#[derive(Debug, Default)]
pub struct Context {
    /// Monotonic counter behind every generated helper name, label and
    /// temporary.
    counter: u32,
    /// Helper functions accumulated while traversing nested closures and
    /// try regions. Append-only during traversal, read-only at emission.
    helpers: Vec<Helper>,
    /// Jump target for `break` in the innermost enclosing loop or switch.
    break_target: Option<BreakTarget>,
}

#[derive(Debug)]
pub struct Helper {
    pub name: String,
    pub text: String,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    fn next_id(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }

    pub fn fresh_function_name(&mut self) -> String {
        format!("fn_{}", self.next_id())
    }

    pub fn fresh_label(&mut self) -> String {
        format!("label_{}", self.next_id())
    }

    /// A unique suffix for the C temporaries of one lowered construct.
    pub fn fresh_suffix(&mut self) -> u32 {
        self.next_id()
    }

    pub fn add_helper(&mut self, name: String, text: String) {
        self.helpers.push(Helper { name, text });
    }

    pub fn helpers(&self) -> &[Helper] {
        &self.helpers
    }

    pub fn break_target(&self) -> Option<&BreakTarget> {
        self.break_target.as_ref()
    }

    /// Run `f` with `label` as the current break target, restoring the outer
    /// target afterwards.
    pub fn with_break_label<R>(
        &mut self,
        label: String,
        f: impl FnOnce(&mut Context) -> R,
    ) -> R {
        let saved = self.break_target.replace(BreakTarget::Label(label));
        let result = f(self);
        self.break_target = saved;
        result
    }

    /// Run `f` with no active break target. A function body starts outside
    /// any loop or switch even when its literal appears inside one.
    pub fn with_break_label_cleared<R>(&mut self, f: impl FnOnce(&mut Context) -> R) -> R {
        let saved = self.break_target.take();
        let result = f(self);
        self.break_target = saved;
        result
    }

    /// Run `f` inside a try/catch/finally region. A break target from the
    /// enclosing function cannot be jumped to from the region's own C
    /// function, so it degrades to [`BreakTarget::Enclosing`]; no target
    /// stays no target.
    pub fn with_region_break_target<R>(&mut self, f: impl FnOnce(&mut Context) -> R) -> R {
        let saved = self.break_target.take();
        if saved.is_some() {
            self.break_target = Some(BreakTarget::Enclosing);
        }
        let result = f(self);
        self.break_target = saved;
        result
    }
}
