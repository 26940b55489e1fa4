use std::collections::HashMap;

use crate::error::RenderError;
use crate::value::Value;

/// Variable frames for one render call.
///
/// Lookups walk the frames innermost first and finally fall back to `$`,
/// which always names the data the render started with.
pub(crate) struct Scope<'a> {
    root: &'a Value,
    frames: Vec<HashMap<String, Value>>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(root: &'a Value) -> Self {
        Self {
            root,
            frames: vec![HashMap::new()],
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Value> {
        for frame in self.frames.iter().rev() {
            if let Some(val) = frame.get(name) {
                return Some(val);
            }
        }
        (name == "$").then_some(self.root)
    }

    pub(crate) fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub(crate) fn pop(&mut self) {
        // The root frame stays for the whole render.
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// `$name := value` in the innermost frame.
    pub(crate) fn declare(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), value);
        }
    }

    /// `$name = value`: overwrite the nearest existing binding.
    pub(crate) fn assign(&mut self, name: &str, value: Value) -> Result<(), RenderError> {
        match self
            .frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.get_mut(name))
        {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RenderError::UndefinedVariable {
                name: name.to_string(),
            }),
        }
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }
}
