//! Build configuration for a DTM

/// Default element nesting limit
pub const DEFAULT_MAX_DEPTH: u16 = 4096;

/// Options controlling how a DTM is built from its source
///
/// ```
/// use rustydtm::DtmConfig;
///
/// let config = DtmConfig::new().strict(true).strip_whitespace(true);
/// assert!(config.is_strict());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtmConfig {
    strict: bool,
    strip_whitespace: bool,
    eager: bool,
    max_depth: u16,
    node_capacity: usize,
}

impl Default for DtmConfig {
    fn default() -> Self {
        DtmConfig {
            strict: false,
            strip_whitespace: false,
            eager: false,
            max_depth: DEFAULT_MAX_DEPTH,
            node_capacity: 256,
        }
    }
}

impl DtmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject malformed XML instead of recovering (text sources only)
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Drop whitespace-only text nodes while building
    pub fn strip_whitespace(mut self, strip: bool) -> Self {
        self.strip_whitespace = strip;
        self
    }

    /// Drain the whole source at construction time instead of on demand
    pub fn eager(mut self, eager: bool) -> Self {
        self.eager = eager;
        self
    }

    pub fn max_depth(mut self, depth: u16) -> Self {
        self.max_depth = depth;
        self
    }

    /// Initial capacity of the node columns
    pub fn node_capacity(mut self, capacity: usize) -> Self {
        self.node_capacity = capacity;
        self
    }

    #[inline]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    #[inline]
    pub fn strips_whitespace(&self) -> bool {
        self.strip_whitespace
    }

    #[inline]
    pub fn is_eager(&self) -> bool {
        self.eager
    }

    #[inline]
    pub fn depth_limit(&self) -> u16 {
        self.max_depth
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.node_capacity
    }
}
