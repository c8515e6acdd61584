use async_trait::async_trait;

use crate::{AttachResult, Attacher, ManyAttacher};

/// The three callback points a record layer invokes, in order, per save:
/// `before_save` ahead of its own storage write, `after_save` once that
/// write has durably succeeded, and `after_destroy` when the record is
/// destroyed.
///
/// The record layer owns transaction boundaries; attachers only react to
/// the calls.
#[async_trait]
pub trait Lifecycle: Send {
    /// Promote cached attachments to store storage
    async fn before_save(&mut self) -> AttachResult<()>;

    /// Clean up superseded objects and clear the dirty flag
    async fn after_save(&mut self) -> AttachResult<()>;

    /// Delete attached objects for a destroyed record
    async fn after_destroy(&mut self) -> AttachResult<()>;
}

#[async_trait]
impl Lifecycle for Attacher {
    async fn before_save(&mut self) -> AttachResult<()> {
        self.promote().await
    }

    async fn after_save(&mut self) -> AttachResult<()> {
        self.persist().await
    }

    async fn after_destroy(&mut self) -> AttachResult<()> {
        self.destroy_attached().await
    }
}

#[async_trait]
impl Lifecycle for ManyAttacher {
    async fn before_save(&mut self) -> AttachResult<()> {
        self.promote().await
    }

    async fn after_save(&mut self) -> AttachResult<()> {
        self.persist().await
    }

    async fn after_destroy(&mut self) -> AttachResult<()> {
        self.destroy_attached().await
    }
}

/// One named attachment field on a record type.
///
/// Parameterized by cardinality: wrap an [`Attacher`] for a single
/// attachment or a [`ManyAttacher`] for a collection. A record layer holds
/// one instance per field and drives them all through [`Lifecycle`].
pub struct AttachmentField<A> {
    name: String,
    attacher: A,
}

impl<A> AttachmentField<A> {
    pub fn new<S: Into<String>>(name: S, attacher: A) -> Self {
        Self {
            name: name.into(),
            attacher,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attacher(&self) -> &A {
        &self.attacher
    }

    pub fn attacher_mut(&mut self) -> &mut A {
        &mut self.attacher
    }
}

#[async_trait]
impl<A: Lifecycle> Lifecycle for AttachmentField<A> {
    async fn before_save(&mut self) -> AttachResult<()> {
        self.attacher.before_save().await
    }

    async fn after_save(&mut self) -> AttachResult<()> {
        self.attacher.after_save().await
    }

    async fn after_destroy(&mut self) -> AttachResult<()> {
        self.attacher.after_destroy().await
    }
}
