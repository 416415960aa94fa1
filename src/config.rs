use crate::DepthError;

/// Default recursion cap shared by the parser, tree builder, serializer and decompiler.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Knobs for parsing and emitting. There is no file or environment layer;
/// callers construct one of these directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Config {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Config { max_depth }
    }

    pub(crate) fn check_depth(&self, depth: usize, context: &'static str) -> Result<(), DepthError> {
        if depth > self.max_depth {
            return Err(DepthError {
                limit: self.max_depth,
                context,
            });
        }
        Ok(())
    }
}
