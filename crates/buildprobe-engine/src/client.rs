//! Explicitly opened and closed handle over one build engine.
//!
//! Every build goes through [`BuildClient::build`], which always asks the
//! engine to remove intermediate containers. The engine is released by
//! [`BuildClient::close`], by [`BuildClient::scoped`], or on drop.

use buildprobe_common::config::ProbeConfig;
use buildprobe_common::error::Result;
use buildprobe_common::types::{BuildRequest, ImageId};

use crate::backend::{BuildEngine, BuildOptions, EngineKind};

/// Owns a build engine for the duration of a probe run.
pub struct BuildClient {
    engine: Box<dyn BuildEngine>,
    closed: bool,
}

impl std::fmt::Debug for BuildClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildClient")
            .field("engine", &self.engine.name())
            .field("closed", &self.closed)
            .finish()
    }
}

impl BuildClient {
    /// Wraps an already constructed engine.
    #[must_use]
    pub fn new(engine: Box<dyn BuildEngine>) -> Self {
        tracing::debug!(engine = engine.name(), "opening build client");
        Self {
            engine,
            closed: false,
        }
    }

    /// Connects to the engine of the given kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be initialised.
    pub fn connect(kind: EngineKind, config: &ProbeConfig) -> Result<Self> {
        Ok(Self::new(kind.connect(config)?))
    }

    /// Runs `f` with a client over `engine`, closing it on every exit path.
    ///
    /// An error from `f` takes precedence over an error from closing.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or of closing the engine.
    pub fn scoped<T>(
        engine: Box<dyn BuildEngine>,
        f: impl FnOnce(&Self) -> Result<T>,
    ) -> Result<T> {
        let client = Self::new(engine);
        let result = f(&client);
        let closed = client.close();
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Returns the engine name.
    #[must_use]
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Returns whether the engine can accept builds.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.engine.is_available()
    }

    /// Submits a build with forced removal of intermediate containers.
    ///
    /// # Errors
    ///
    /// Propagates the engine's build-failure signal or infrastructure fault.
    pub fn build(&self, request: &BuildRequest) -> Result<ImageId> {
        self.engine.build(request, BuildOptions { force_rm: true })
    }

    /// Removes an image produced by [`BuildClient::build`].
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot remove the image.
    pub fn remove_image(&self, image: &ImageId) -> Result<()> {
        self.engine.remove_image(image)
    }

    /// Closes the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot release its resources.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        tracing::debug!(engine = self.engine.name(), "closing build client");
        self.engine.close()
    }
}

impl Drop for BuildClient {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.engine.close() {
                tracing::warn!(error = %e, "failed to close build engine");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use buildprobe_common::error::ProbeError;

    use super::*;

    /// Engine that counts closes and records the options it was given.
    struct CountingEngine {
        closes: Arc<AtomicUsize>,
        saw_force_rm: Arc<AtomicUsize>,
    }

    impl BuildEngine for CountingEngine {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn build(&self, _request: &BuildRequest, options: BuildOptions) -> Result<ImageId> {
            if options.force_rm {
                let _ = self.saw_force_rm.fetch_add(1, Ordering::SeqCst);
            }
            Ok(ImageId::new("sha256:counting"))
        }

        fn remove_image(&self, _image: &ImageId) -> Result<()> {
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            let _ = self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn counting() -> (Box<dyn BuildEngine>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let closes = Arc::new(AtomicUsize::new(0));
        let force = Arc::new(AtomicUsize::new(0));
        let engine = CountingEngine {
            closes: Arc::clone(&closes),
            saw_force_rm: Arc::clone(&force),
        };
        (Box::new(engine), closes, force)
    }

    #[test]
    fn build_always_forces_intermediate_removal() {
        let (engine, _closes, force) = counting();
        let client = BuildClient::new(engine);
        let _ = client.build(&BuildRequest::new(".")).expect("build");
        assert_eq!(force.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_close_closes_once() {
        let (engine, closes, _force) = counting();
        BuildClient::new(engine).close().expect("close");
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_closes_unclosed_client() {
        let (engine, closes, _force) = counting();
        drop(BuildClient::new(engine));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn scoped_closes_after_error() {
        let (engine, closes, _force) = counting();
        let result: Result<()> = BuildClient::scoped(engine, |_client| {
            Err(ProbeError::Config {
                message: "boom".into(),
            })
        });
        assert!(result.is_err());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn scoped_returns_value() {
        let (engine, closes, _force) = counting();
        let name = BuildClient::scoped(engine, |client| Ok(client.engine_name())).expect("run");
        assert_eq!(name, "counting");
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
