use std::collections::HashMap;

use crate::bucket::Granularity;

/// Per-section granularity selection. Sections never touched read the
/// default.
#[derive(Debug, Clone, Default)]
pub struct SectionState {
    default: Granularity,
    selected: HashMap<String, Granularity>,
}

impl SectionState {
    pub fn new(default: Granularity) -> Self {
        Self {
            default,
            selected: HashMap::new(),
        }
    }

    pub fn get(&self, section: &str) -> Granularity {
        self.selected.get(section).copied().unwrap_or(self.default)
    }

    pub fn select(&mut self, section: &str, granularity: Granularity) {
        self.selected.insert(section.to_string(), granularity);
    }

    pub fn reset(&mut self, section: &str) {
        self.selected.remove(section);
    }

    /// Parse `section=granularity` pairs, e.g. from the command line.
    pub fn apply_args<'a, I>(&mut self, args: I) -> Result<(), String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for arg in args {
            let (section, value) = arg
                .split_once('=')
                .ok_or_else(|| format!("expected section=granularity, got `{}`", arg))?;
            self.select(section.trim(), value.parse()?);
        }
        Ok(())
    }
}
