//! The closed set of supported sources.

pub mod jobs104;
pub mod jobs1111;
pub mod yourator;

use crate::strategy::{CaptureMatcher, Captures, TacticChain};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Jobs104,
    Yourator,
    Jobs1111,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Jobs104, Provider::Yourator, Provider::Jobs1111];

    pub fn name(self) -> &'static str {
        match self {
            Provider::Jobs104 => jobs104::NAME,
            Provider::Yourator => yourator::NAME,
            Provider::Jobs1111 => jobs1111::NAME,
        }
    }

    /// Page opened once when the source's run starts.
    pub fn landing_url(self, keyword: &str) -> Option<String> {
        match self {
            Provider::Yourator => Some(yourator::landing_url(keyword)),
            Provider::Jobs104 | Provider::Jobs1111 => None,
        }
    }

    /// Recognizes the source's own listing calls among observed responses.
    pub fn capture_matcher(self) -> Option<CaptureMatcher> {
        match self {
            Provider::Yourator => Some(yourator::captured_page as CaptureMatcher),
            Provider::Jobs104 | Provider::Jobs1111 => None,
        }
    }

    /// Fresh tactic chain for one run, reading from that run's captures.
    pub fn tactics(self, captures: &Captures) -> TacticChain {
        match self {
            Provider::Jobs104 => jobs104::tactics(captures),
            Provider::Yourator => yourator::tactics(captures),
            Provider::Jobs1111 => jobs1111::tactics(captures),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SourceDescriptor {
    pub name: &'static str,
    pub provider: Provider,
}

/// Name to source table, fixed once built.
#[derive(Debug, Clone)]
pub struct Registry {
    sources: Vec<SourceDescriptor>,
}

impl Registry {
    pub fn builtin() -> Self {
        Self::with(&Provider::ALL)
    }

    pub fn with(providers: &[Provider]) -> Self {
        let sources = providers
            .iter()
            .map(|&provider| SourceDescriptor {
                name: provider.name(),
                provider,
            })
            .collect();
        Self { sources }
    }

    pub fn get(&self, name: &str) -> Option<&SourceDescriptor> {
        let name = name.trim();
        self.sources.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name).collect()
    }
}
