//! Namespace Resolution
//!
//! Stack-based prefix resolver used while reading XML text.

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

#[derive(Debug, Clone)]
struct NsBinding {
    prefix: String,
    uri: String,
    depth: u16,
}

/// Prefix -> URI bindings scoped by element depth
///
/// The default namespace is the empty prefix. Binding it to the empty URI
/// (`xmlns=""`) undeclares it.
#[derive(Debug)]
pub struct NamespaceResolver {
    bindings: Vec<NsBinding>,
    depth: u16,
}

impl Default for NamespaceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceResolver {
    /// Create a resolver with `xml` pre-bound
    pub fn new() -> Self {
        let mut bindings = Vec::with_capacity(16);
        bindings.push(NsBinding {
            prefix: "xml".to_string(),
            uri: ns::XML.to_string(),
            depth: 0,
        });
        NamespaceResolver { bindings, depth: 0 }
    }

    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, dropping the bindings it declared
    pub fn pop_scope(&mut self) {
        while self.bindings.last().is_some_and(|b| b.depth >= self.depth && b.depth > 0) {
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare a binding in the current scope; `xml` and `xmlns` cannot be rebound
    pub fn declare(&mut self, prefix: &str, uri: &str) {
        if prefix == "xml" || prefix == "xmlns" {
            return;
        }
        self.bindings.push(NsBinding {
            prefix: prefix.to_string(),
            uri: uri.to_string(),
            depth: self.depth,
        });
    }

    /// Resolve a prefix; the empty prefix resolves to "" when no default is in scope
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        match self.bindings.iter().rev().find(|b| b.prefix == prefix) {
            Some(binding) if prefix.is_empty() || !binding.uri.is_empty() => Some(&binding.uri),
            Some(_) => None,
            None if prefix.is_empty() => Some(""),
            None => None,
        }
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }
}
