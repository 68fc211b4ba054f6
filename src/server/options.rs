//! Translation between the server's vocabulary and the engine's.

use crate::engine::{self, EngineOptions};
use crate::server::Action;

/// Server options.
///
/// The server adds no settings of its own; everything here is handed to the
/// engine as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub engine: EngineOptions,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multicore(mut self, multicore: bool) -> Self {
        self.engine.multicore = multicore;
        self
    }

    pub fn num_event_loop(mut self, n: usize) -> Self {
        self.engine.num_event_loop = n;
        self
    }

    pub fn read_buffer_cap(mut self, cap: usize) -> Self {
        self.engine.read_buffer_cap = cap;
        self
    }

    pub fn tcp_nodelay(mut self, nodelay: bool) -> Self {
        self.engine.tcp_nodelay = nodelay;
        self
    }
}

impl From<Options> for EngineOptions {
    fn from(options: Options) -> Self {
        options.engine
    }
}

impl From<EngineOptions> for Options {
    fn from(engine: EngineOptions) -> Self {
        Self { engine }
    }
}

impl From<Action> for engine::Action {
    fn from(action: Action) -> Self {
        match action {
            Action::None => engine::Action::Continue,
            Action::Close => engine::Action::Close,
            Action::Shutdown => engine::Action::Shutdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_mapping() {
        assert_eq!(engine::Action::from(Action::None), engine::Action::Continue);
        assert_eq!(engine::Action::from(Action::Close), engine::Action::Close);
        assert_eq!(engine::Action::from(Action::Shutdown), engine::Action::Shutdown);
    }

    #[test]
    fn test_options_pass_through_untouched() {
        let options = Options::new()
            .multicore(true)
            .num_event_loop(4)
            .read_buffer_cap(1024)
            .tcp_nodelay(false);

        let engine: EngineOptions = options.clone().into();
        assert_eq!(
            engine,
            EngineOptions {
                multicore: true,
                num_event_loop: 4,
                read_buffer_cap: 1024,
                tcp_nodelay: false,
            }
        );
        assert_eq!(Options::from(engine), options);
    }
}
