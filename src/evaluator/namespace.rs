use crate::ast::Value;

/// A name and what it is bound to.
///
/// A binding without a value is a placeholder: `define` installs one before
/// evaluating its expression so the expression can refer to the name.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    name: String,
    value: Option<Value>,
}

impl Binding {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

/// One frame of variable bindings plus a borrowed link to the enclosing frame.
///
/// Bindings keep their definition order. Frames are small, so lookups are
/// linear scans.
#[derive(Debug, Default)]
pub struct Namespace<'p> {
    bindings: Vec<Binding>,
    parent: Option<&'p Namespace<'p>>,
}

impl<'p> Namespace<'p> {
    /// A root frame
    pub fn new() -> Self {
        Namespace {
            bindings: Vec::new(),
            parent: None,
        }
    }

    pub fn with_parent(parent: &'p Namespace<'p>) -> Self {
        Namespace {
            bindings: Vec::new(),
            parent: Some(parent),
        }
    }

    /// Bind `name` in this frame, overwriting an existing binding in place
    pub fn define(&mut self, name: &str, value: Option<Value>) {
        match self.bindings.iter_mut().find(|b| b.name == name) {
            Some(binding) => binding.value = value,
            None => self.bindings.push(Binding {
                name: name.to_owned(),
                value,
            }),
        }
    }

    /// Whether this frame itself binds `name`, ignoring enclosing frames
    pub fn binds(&self, name: &str) -> bool {
        self.bindings.iter().any(|b| b.name == name)
    }

    /// Drop the binding for `name` from this frame
    pub(crate) fn remove(&mut self, name: &str) {
        self.bindings.retain(|b| b.name != name);
    }

    /// Find `name` in this frame, then in each enclosing frame
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.bindings
            .iter()
            .find(|b| b.name == name)
            .or_else(|| self.parent.and_then(|parent| parent.lookup(name)))
    }

    /// Bindings of this frame only, in definition order
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn parent(&self) -> Option<&'p Namespace<'p>> {
        self.parent
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::val;

    #[test]
    fn test_define_and_lookup() {
        let mut ns = Namespace::new();
        ns.define("x", Some(val(1)));
        ns.define("y", Some(val(2)));

        assert_eq!(ns.lookup("x").unwrap().value(), Some(&val(1)));
        assert_eq!(ns.lookup("y").unwrap().name(), "y");
        assert!(ns.lookup("z").is_none());
    }

    #[test]
    fn test_redefine_overwrites_in_place() {
        let mut ns = Namespace::new();
        ns.define("a", Some(val(1)));
        ns.define("b", Some(val(2)));
        ns.define("a", Some(val(3)));

        let names: Vec<&str> = ns.bindings().iter().map(Binding::name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(ns.lookup("a").unwrap().value(), Some(&val(3)));
    }

    #[test]
    fn test_placeholder_binding() {
        let mut ns = Namespace::new();
        ns.define("f", None);
        let binding = ns.lookup("f").unwrap();
        assert_eq!(binding.value(), None);

        ns.define("f", Some(val(true)));
        assert_eq!(ns.lookup("f").unwrap().value(), Some(&val(true)));
    }

    #[test]
    fn test_binds_and_remove() {
        let mut root = Namespace::new();
        root.define("x", Some(val(1)));
        let mut child = Namespace::with_parent(&root);
        child.define("y", None);
        child.define("z", Some(val(3)));

        assert!(child.binds("y"));
        assert!(!child.binds("x"));
        assert!(child.lookup("x").is_some());

        child.remove("y");
        assert!(!child.binds("y"));
        let names: Vec<&str> = child.bindings().iter().map(Binding::name).collect();
        assert_eq!(names, vec!["z"]);
    }

    #[test]
    fn test_child_shadows_and_delegates() {
        let mut root = Namespace::new();
        root.define("x", Some(val(1)));
        root.define("y", Some(val(2)));

        let mut child = Namespace::with_parent(&root);
        child.define("x", Some(val(10)));

        assert_eq!(child.lookup("x").unwrap().value(), Some(&val(10)));
        assert_eq!(child.lookup("y").unwrap().value(), Some(&val(2)));
        assert!(child.lookup("nope").is_none());
        assert!(child.parent().is_some());
        assert!(root.parent().is_none());
        assert_eq!(root.lookup("x").unwrap().value(), Some(&val(1)));
    }
}
