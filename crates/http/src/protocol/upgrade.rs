use std::fmt;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use crate::io::Upgraded;

pub type UpgradeCallback = Box<dyn FnOnce(Upgraded) -> BoxFuture<'static, ()> + Send>;

/// Response extension taking over the connection after `101 Switching Protocols`.
///
/// The server writes the response head, then hands the raw stream to the
/// callback and stops treating the connection as HTTP.
#[derive(Clone)]
pub struct OnUpgrade {
    callback: Arc<Mutex<Option<UpgradeCallback>>>,
}

impl OnUpgrade {
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: FnOnce(Upgraded) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let callback: UpgradeCallback = Box::new(move |upgraded| Box::pin(callback(upgraded)));
        Self { callback: Arc::new(Mutex::new(Some(callback))) }
    }

    /// Takes the callback out, it runs at most once.
    pub fn take(&self) -> Option<UpgradeCallback> {
        self.callback.lock().ok().and_then(|mut guard| guard.take())
    }
}

impl fmt::Debug for OnUpgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnUpgrade").finish_non_exhaustive()
    }
}
