//! Shared view of "who is signed in".
//!
//! The auth provider owns the only [`SessionWriter`]; every other component
//! receives a cloned [`SessionContext`] at construction and can read the
//! current session or wait for it to change.

use tokio::sync::watch;

use crate::supabase::types::{Session, User};

pub fn channel() -> (SessionWriter, SessionContext) {
    let (tx, rx) = watch::channel(None);
    (SessionWriter { tx }, SessionContext { rx })
}

pub struct SessionWriter {
    tx: watch::Sender<Option<Session>>,
}

impl SessionWriter {
    /// Replace the session and notify subscribers, even when unchanged.
    pub fn set(&self, session: Option<Session>) {
        self.tx.send_replace(session);
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn context(&self) -> SessionContext {
        SessionContext {
            rx: self.tx.subscribe(),
        }
    }
}

#[derive(Clone)]
pub struct SessionContext {
    rx: watch::Receiver<Option<Session>>,
}

impl SessionContext {
    pub fn current(&self) -> Option<Session> {
        self.rx.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.rx.borrow().as_ref().map(|s| s.user.clone())
    }

    pub fn is_present(&self) -> bool {
        self.rx.borrow().is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.rx.borrow().as_ref().map(|s| s.access_token.clone())
    }

    /// A fresh receiver that resolves `changed()` on every session update.
    /// Errors once the writer is gone.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        let mut rx = self.rx.clone();
        rx.mark_unchanged();
        rx
    }
}
